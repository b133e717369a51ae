//! Ledger schema.
//!
//! Table names are snake_case; column names keep the camelCase spelling
//! (quoted) that the SQL-generation prompt teaches the model to use.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS pessoa (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tipo TEXT NOT NULL CHECK (tipo IN ('FORNECEDOR', 'FATURADO', 'CLIENTE')),
        "razaoSocial" TEXT NOT NULL,
        fantasia TEXT,
        documento TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'ATIVO' CHECK (status IN ('ATIVO', 'INATIVO')),
        "criadoEm" TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        "atualizadoEm" TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        UNIQUE (documento, tipo)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS classificacao (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tipo TEXT NOT NULL CHECK (tipo IN ('DESPESA', 'RECEITA')),
        descricao TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'ATIVO' CHECK (status IN ('ATIVO', 'INATIVO')),
        UNIQUE (descricao, tipo)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS movimento_contas (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tipo TEXT NOT NULL DEFAULT 'APAGAR' CHECK (tipo IN ('APAGAR', 'ARECEBER')),
        "numeroNotaFiscal" TEXT NOT NULL,
        "dataEmissao" TEXT NOT NULL,
        descricao TEXT,
        "valorTotal" NUMERIC NOT NULL,
        "fornecedorId" INTEGER NOT NULL REFERENCES pessoa(id),
        "faturadoId" INTEGER NOT NULL REFERENCES pessoa(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS parcela_contas (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        identificacao TEXT NOT NULL,
        "dataVencimento" TEXT NOT NULL,
        "valorParcela" NUMERIC NOT NULL,
        "valorSaldo" NUMERIC NOT NULL,
        "statusParcela" TEXT NOT NULL DEFAULT 'ABERTA'
            CHECK ("statusParcela" IN ('ABERTA', 'PAGA', 'CANCELADA')),
        "movimentoId" INTEGER NOT NULL REFERENCES movimento_contas(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS movimento_classificacao (
        "movimentoId" INTEGER NOT NULL REFERENCES movimento_contas(id),
        "classificacaoId" INTEGER NOT NULL REFERENCES classificacao(id),
        PRIMARY KEY ("movimentoId", "classificacaoId")
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_movimento_fornecedor ON movimento_contas("fornecedorId")"#,
    r#"CREATE INDEX IF NOT EXISTS idx_movimento_emissao ON movimento_contas("dataEmissao")"#,
    r#"CREATE INDEX IF NOT EXISTS idx_parcela_movimento ON parcela_contas("movimentoId")"#,
    r#"CREATE INDEX IF NOT EXISTS idx_parcela_vencimento ON parcela_contas("dataVencimento")"#,
];

/// Create every ledger table and index that does not exist yet.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    tracing::info!(path = %config.db.path.display(), "schema up to date");
    pool.close().await;
    Ok(())
}
