//! End-to-end tests of the agent against scripted models and the
//! in-memory ledger.

use std::sync::Arc;
use std::time::Duration;

use agromark_core::agent::{Agent, Route, GENERIC_ERROR_PREFIX};
use agromark_core::cache::{EmbeddingCache, SearchOutcome};
use agromark_core::error::SQL_UNAVAILABLE_MESSAGE;
use agromark_core::models::{ConversationTurn, LedgerRow, SqlRow, SqlValue};
use agromark_core::semantic::INSUFFICIENT_DATA;
use agromark_core::store::memory::InMemoryLedgerStore;
use agromark_core::testing::{KeywordEmbedder, ScriptedModel, Stage};

const VOCAB: &[&str] = &["combustível", "diesel", "adubo", "semente", "energia"];

fn ledger_row(id: i64, supplier: &str, description: &str, category: &str, value: &str) -> LedgerRow {
    LedgerRow {
        id,
        invoice_number: format!("{:06}", id),
        supplier_name: supplier.to_string(),
        description: Some(description.to_string()),
        categories: vec![category.to_string()],
        total_value: value.to_string(),
    }
}

fn sample_ledger() -> Vec<LedgerRow> {
    vec![
        ledger_row(1, "Posto Rural", "Combustível diesel para tratores", "MANUTENÇÃO E OPERAÇÃO", "850.00"),
        ledger_row(2, "AgroSementes", "Semente de soja certificada", "INSUMOS AGRÍCOLAS", "12000.00"),
        ledger_row(3, "Posto Central", "Diesel S10 para a colheitadeira", "MANUTENÇÃO E OPERAÇÃO", "2300.00"),
        ledger_row(4, "Fertilizantes Sul", "Adubo NPK", "INSUMOS AGRÍCOLAS", "5400.00"),
        ledger_row(5, "Companhia de Energia", "Conta de energia da sede", "INFRAESTRUTURA E UTILIDADES", "640.00"),
    ]
}

struct Harness {
    model: Arc<ScriptedModel>,
    store: Arc<InMemoryLedgerStore>,
    embedder: Arc<KeywordEmbedder>,
    agent: Agent,
    cache: Arc<EmbeddingCache>,
}

fn harness(model: ScriptedModel, rows: Vec<LedgerRow>) -> Harness {
    harness_with(model, rows, KeywordEmbedder::new(VOCAB))
}

fn harness_with(model: ScriptedModel, rows: Vec<LedgerRow>, embedder: KeywordEmbedder) -> Harness {
    let model = Arc::new(model);
    let store = Arc::new(InMemoryLedgerStore::with_rows(rows));
    let embedder = Arc::new(embedder);
    let (agent, cache) = Agent::builder(model.clone(), store.clone(), embedder.clone()).build();
    Harness {
        model,
        store,
        embedder,
        agent,
        cache,
    }
}

fn count_row(column: &str, n: i64) -> SqlRow {
    let mut row = SqlRow::new();
    row.push(column, SqlValue::Integer(n));
    row
}

// ─── Routing ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_supplier_count_goes_through_sql() {
    let sql = "SELECT COUNT(*) FROM pessoa WHERE tipo = 'FORNECEDOR';";
    let h = harness(
        ScriptedModel::new()
            .on_decision("[SQL]")
            .on_sql(format!("```sql\n{}\n```", sql))
            .on_answer("  Temos **3 fornecedores** cadastrados, como três fileiras bem plantadas!  "),
        sample_ledger(),
    );
    h.store.on_sql(sql, vec![count_row("COUNT(*)", 3)]);

    let answer = h
        .agent
        .try_answer("Quantos fornecedores existem?", &[])
        .await
        .unwrap();

    assert_eq!(answer.route, Route::Sql);
    assert_eq!(
        answer.text,
        "Temos **3 fornecedores** cadastrados, como três fileiras bem plantadas!"
    );
    assert_eq!(h.store.executed(), vec![sql.to_string()]);
    assert_eq!(h.model.stages(), vec![Stage::Decision, Stage::Sql, Stage::Answer]);

    let answer_prompt = &h.model.prompts(Stage::Answer)[0];
    assert!(answer_prompt.contains("\"COUNT(*)\": \"3\""));
    assert_eq!(h.embedder.batch_calls(), 0);
}

#[tokio::test]
async fn test_sql_marker_wins_over_semantic_marker() {
    let sql = "SELECT COUNT(*) FROM movimento_contas;";
    let h = harness(
        ScriptedModel::new()
            .on_decision("[BUSCA_SEMANTICA] ou talvez [SQL]")
            .on_sql(sql)
            .on_answer("São 5 notas."),
        sample_ledger(),
    );
    h.store.on_sql(sql, vec![count_row("total", 5)]);

    let answer = h.agent.answer_query("quantas notas?", &[]).await;

    assert_eq!(answer, "São 5 notas.");
    assert_eq!(h.embedder.batch_calls(), 0);
    assert_eq!(h.embedder.query_calls(), 0);
    assert_eq!(h.store.row_reads(), 0);
}

#[tokio::test]
async fn test_direct_answer_is_returned_as_is() {
    let h = harness(
        ScriptedModel::new().on_decision("  Olá! Eu sou o Mark, pronto para ajudar na lavoura dos números.  "),
        sample_ledger(),
    );

    let answer = h
        .agent
        .try_answer("oi", &[ConversationTurn::user("bom dia")])
        .await
        .unwrap();

    assert_eq!(answer.route, Route::Direct);
    assert_eq!(answer.text, "Olá! Eu sou o Mark, pronto para ajudar na lavoura dos números.");
    assert_eq!(h.model.stages(), vec![Stage::Decision]);
    assert!(h.model.prompts(Stage::Decision)[0].contains("Usuário: bom dia"));
}

#[tokio::test]
async fn test_history_reaches_router_and_synthesizer() {
    let history = vec![
        ConversationTurn::user("Quanto gastamos com adubo?"),
        ConversationTurn::agent("Gastamos **R$ 5.400,00** com adubo."),
    ];
    let h = harness(
        ScriptedModel::new()
            .on_decision("[BUSCA_SEMANTICA]")
            .on_answer("O adubo veio da Fertilizantes Sul."),
        sample_ledger(),
    );

    h.agent.answer_query("e de quem compramos adubo?", &history).await;

    let rendered = "Usuário: Quanto gastamos com adubo?\nAssistente: Gastamos **R$ 5.400,00** com adubo.";
    assert!(h.model.prompts(Stage::Decision)[0].contains(rendered));
    assert!(h.model.prompts(Stage::Answer)[0].contains(rendered));
}

// ─── Semantic path ──────────────────────────────────────────────────

#[tokio::test]
async fn test_fuel_question_uses_top_three_summaries() {
    let h = harness(
        ScriptedModel::new()
            .on_decision("[BUSCA_SEMANTICA]")
            .on_answer("Encontrei notas de combustível."),
        sample_ledger(),
    );

    let answer = h
        .agent
        .try_answer("fale sobre despesas de combustível diesel", &[])
        .await
        .unwrap();

    assert_eq!(answer.route, Route::SemanticSearch);
    assert_eq!(h.embedder.batch_calls(), 1);
    assert_eq!(h.embedder.query_calls(), 1);

    let prompt = &h.model.prompts(Stage::Answer)[0];
    let context_start = prompt.find("**CONTEXTO").unwrap();
    let context = &prompt[context_start..];
    let first = context.find("Posto Rural").unwrap();
    let second = context.find("Posto Central").unwrap();
    assert!(first < second, "best match should come first");
    assert_eq!(context.matches("Nota fiscal número").count(), 3);
}

#[tokio::test]
async fn test_empty_ledger_returns_insufficient_data() {
    let h = harness(
        ScriptedModel::new().on_decision("[BUSCA_SEMANTICA]"),
        Vec::new(),
    );

    let answer = h.agent.answer_query("fale sobre combustível", &[]).await;

    assert_eq!(answer, INSUFFICIENT_DATA);
    assert_eq!(h.model.stages(), vec![Stage::Decision]);
    assert_eq!(h.embedder.batch_calls(), 0);
    assert_eq!(h.embedder.query_calls(), 0);
}

#[tokio::test]
async fn test_forced_rebuild_with_zero_rows_is_insufficient_data() {
    let h = harness(ScriptedModel::new(), sample_ledger());

    let snapshot = h.cache.rebuild(true).await.unwrap();
    assert_eq!(snapshot.len(), 5);

    h.store.set_rows(Vec::new());
    let snapshot = h.cache.rebuild(true).await.unwrap();
    assert!(snapshot.is_empty());

    let outcome = h.cache.search("diesel", 3).await.unwrap();
    assert_eq!(outcome, SearchOutcome::InsufficientData);
}

// ─── Cache lifecycle ────────────────────────────────────────────────

#[tokio::test]
async fn test_rebuild_within_ttl_embeds_once() {
    let h = harness(ScriptedModel::new(), sample_ledger());

    let first = h.cache.rebuild(false).await.unwrap();
    let second = h.cache.rebuild(false).await.unwrap();

    assert_eq!(h.embedder.batch_calls(), 1);
    assert_eq!(h.store.row_reads(), 1);
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_concurrent_cold_searches_embed_once() {
    let h = harness(ScriptedModel::new(), sample_ledger());

    let (a, b) = tokio::join!(h.cache.search("diesel", 3), h.cache.search("adubo", 3));
    assert!(matches!(a.unwrap(), SearchOutcome::Hits(_)));
    assert!(matches!(b.unwrap(), SearchOutcome::Hits(_)));
    assert_eq!(h.embedder.batch_calls(), 1);
}

#[tokio::test]
async fn test_expired_ttl_rebuilds() {
    let store = Arc::new(InMemoryLedgerStore::with_rows(sample_ledger()));
    let embedder = Arc::new(KeywordEmbedder::new(VOCAB));
    let cache = EmbeddingCache::new(store.clone(), embedder.clone(), Duration::ZERO);

    cache.rebuild(false).await.unwrap();
    cache.rebuild(false).await.unwrap();

    assert_eq!(embedder.batch_calls(), 2);
}

#[tokio::test]
async fn test_forced_rebuild_ignores_ttl() {
    let h = harness(ScriptedModel::new(), sample_ledger());

    h.cache.rebuild(false).await.unwrap();
    h.cache.rebuild(true).await.unwrap();

    assert_eq!(h.embedder.batch_calls(), 2);
}

#[tokio::test]
async fn test_failed_rebuild_keeps_previous_snapshot() {
    let store = Arc::new(InMemoryLedgerStore::with_rows(sample_ledger()));
    let good = Arc::new(KeywordEmbedder::new(VOCAB));
    let cache = Arc::new(EmbeddingCache::new(store.clone(), good, Duration::from_secs(300)));
    let before = cache.rebuild(true).await.unwrap();

    let failing = Arc::new(KeywordEmbedder::failing());
    let broken = EmbeddingCache::new(store, failing, Duration::from_secs(300));
    assert!(broken.rebuild(true).await.is_err());
    assert!(broken.snapshot().is_none());

    let after = cache.snapshot().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
}

#[tokio::test]
async fn test_tied_scores_keep_ledger_order() {
    let rows = vec![
        ledger_row(1, "A", "energia", "X", "1.00"),
        ledger_row(2, "B", "adubo", "X", "1.00"),
        ledger_row(3, "C", "energia", "X", "1.00"),
        ledger_row(4, "D", "energia", "X", "1.00"),
        ledger_row(5, "E", "energia", "X", "1.00"),
    ];
    let h = harness(ScriptedModel::new(), rows);

    match h.cache.search("energia", 3).await.unwrap() {
        SearchOutcome::Hits(hits) => {
            let ids: Vec<i64> = hits.iter().map(|hit| hit.source_row_id).collect();
            assert_eq!(ids, vec![1, 3, 4]);
        }
        other => panic!("expected hits, got {:?}", other),
    }
}

// ─── Failures never escape ──────────────────────────────────────────

#[tokio::test]
async fn test_sql_refusal_is_surfaced_verbatim() {
    let h = harness(
        ScriptedModel::new()
            .on_decision("[SQL]")
            .on_sql("NÃO CONSIGO RESPONDER"),
        sample_ledger(),
    );

    let answer = h.agent.answer_query("qual a cor do trator?", &[]).await;

    assert_eq!(answer, SQL_UNAVAILABLE_MESSAGE);
    assert!(h.store.executed().is_empty());
}

#[tokio::test]
async fn test_execution_error_is_wrapped() {
    let h = harness(
        ScriptedModel::new()
            .on_decision("[SQL]")
            .on_sql("SELECT COUNT(*) FROM pessoa WHERE tipo = 'X';"),
        sample_ledger(),
    );

    let answer = h.agent.answer_query("quantos?", &[]).await;

    assert!(answer.starts_with(GENERIC_ERROR_PREFIX), "{}", answer);
    assert!(answer.contains("A consulta SQL falhou"));
    assert!(answer.contains("no such statement"));
}

#[tokio::test]
async fn test_write_statement_never_reaches_store() {
    let h = harness(
        ScriptedModel::new()
            .on_decision("[SQL]")
            .on_sql("DELETE FROM movimento_contas;"),
        sample_ledger(),
    );

    let answer = h.agent.answer_query("apague tudo", &[]).await;

    assert!(answer.starts_with(GENERIC_ERROR_PREFIX));
    assert!(answer.contains("recusada"));
    assert!(h.store.executed().is_empty());
}

#[tokio::test]
async fn test_quoted_or_listed_system_table_never_reaches_store() {
    for sql in [
        "SELECT * FROM `sqlite_master`;",
        "SELECT * FROM [sqlite_master];",
        "SELECT * FROM pessoa, sqlite_master;",
    ] {
        let h = harness(
            ScriptedModel::new().on_decision("[SQL]").on_sql(sql),
            sample_ledger(),
        );

        let answer = h.agent.answer_query("liste as tabelas", &[]).await;

        assert!(answer.starts_with(GENERIC_ERROR_PREFIX), "{}", answer);
        assert!(answer.contains("sqlite_master"), "{}", answer);
        assert!(h.store.executed().is_empty(), "{} reached the store", sql);
    }
}

#[tokio::test]
async fn test_disabled_guard_executes_verbatim() {
    let model = Arc::new(
        ScriptedModel::new()
            .on_decision("[SQL]")
            .on_sql("SELECT 1 FROM sqlite_master")
            .on_answer("ok"),
    );
    let store = Arc::new(InMemoryLedgerStore::new());
    store.on_sql("SELECT 1 FROM sqlite_master;", vec![count_row("1", 1)]);
    let (agent, _) = Agent::builder(model, store.clone(), Arc::new(KeywordEmbedder::new(VOCAB)))
        .sql_guard(None)
        .build();

    assert_eq!(agent.answer_query("q", &[]).await, "ok");
    assert_eq!(store.executed(), vec!["SELECT 1 FROM sqlite_master;".to_string()]);
}

#[tokio::test]
async fn test_router_failure_becomes_answer() {
    let h = harness(
        ScriptedModel::new().fail_on(Stage::Decision, "quota exceeded"),
        sample_ledger(),
    );

    let answer = h.agent.answer_query("oi", &[]).await;

    assert!(answer.starts_with(GENERIC_ERROR_PREFIX));
    assert!(answer.contains("quota exceeded"));
}

#[tokio::test]
async fn test_synthesizer_failure_becomes_answer() {
    let h = harness(
        ScriptedModel::new()
            .on_decision("[BUSCA_SEMANTICA]")
            .fail_on(Stage::Answer, "connection reset"),
        sample_ledger(),
    );

    let answer = h.agent.answer_query("fale sobre adubo", &[]).await;

    assert!(answer.starts_with(GENERIC_ERROR_PREFIX));
    assert!(answer.contains("connection reset"));
}

#[tokio::test]
async fn test_embedding_failure_becomes_answer() {
    let h = harness_with(
        ScriptedModel::new().on_decision("[BUSCA_SEMANTICA]"),
        sample_ledger(),
        KeywordEmbedder::failing(),
    );

    let answer = h.agent.answer_query("fale sobre adubo", &[]).await;

    assert!(answer.starts_with(GENERIC_ERROR_PREFIX));
    assert!(answer.contains("embedding service unavailable"));
}

#[tokio::test]
async fn test_strict_decisions_keep_embedded_marker_as_answer() {
    let text = "Se quiser números exatos, eu uso a ferramenta [SQL] para você!";
    let model = Arc::new(ScriptedModel::new().on_decision(text));
    let store = Arc::new(InMemoryLedgerStore::with_rows(sample_ledger()));
    let (agent, _) = Agent::builder(model.clone(), store, Arc::new(KeywordEmbedder::new(VOCAB)))
        .strict_decisions(true)
        .build();

    let answer = agent.try_answer("o que você faz?", &[]).await.unwrap();

    assert_eq!(answer.route, Route::Direct);
    assert_eq!(answer.text, text);
    assert_eq!(model.stages(), vec![Stage::Decision]);
}
