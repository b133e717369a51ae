//! Prompt templates for the three model calls of a question.
//!
//! All prompts speak as "Mark", the AgroMark mascot, and target Brazilian
//! Portuguese. The model is never asked for structured output; the
//! router in [`crate::router`] validates what comes back.

use crate::models::ConversationTurn;

/// Marker the router prompt asks for when the question needs exact data.
pub const SQL_MARKER: &str = "[SQL]";
/// Marker for descriptive / open-ended questions.
pub const SEMANTIC_MARKER: &str = "[BUSCA_SEMANTICA]";
/// Marker that may prefix a direct answer.
pub const DIRECT_MARKER: &str = "[RESPOSTA_DIRETA]";

/// Phrase the SQL prompt tells the model to return when it cannot help.
pub const SQL_INABILITY_PHRASE: &str = "NÃO CONSIGO RESPONDER";

const PERSONA: &str = "Você é o Mark, o mascote inteligente do sistema AgroMark. \
Sua personalidade é curiosa, paciente e um pouco nerd, e você adora analogias agrícolas.";

/// Logical model of the ledger schema, shown to the SQL generator.
pub const SCHEMA_DESCRIPTION: &str = r#"
model Pessoa {
  id           Int            @id @default(autoincrement())
  tipo         PessoaTipo
  razaoSocial  String
  fantasia     String?
  documento    String
  status       StatusRegistro @default(ATIVO)
  criadoEm     DateTime       @default(now())
  atualizadoEm DateTime       @updatedAt
  fornecedorMovimentos MovimentoContas[] @relation("FornecedorMovimentos")
  faturadoMovimentos   MovimentoContas[] @relation("FaturadoMovimentos")
}

model Classificacao {
  id           Int                @id @default(autoincrement())
  tipo         ClassificacaoTipo
  descricao    String
  status       StatusRegistro     @default(ATIVO)
  movimentos   MovimentoClassificacao[]
}

model MovimentoContas {
  id               Int           @id @default(autoincrement())
  tipo             MovimentoTipo @default(APAGAR)
  numeroNotaFiscal String
  dataEmissao      DateTime
  descricao        String?
  valorTotal       Decimal
  fornecedorId     Int
  faturadoId       Int
  fornecedor       Pessoa        @relation("FornecedorMovimentos", fields: [fornecedorId], references: [id])
  faturado         Pessoa        @relation("FaturadoMovimentos", fields: [faturadoId], references: [id])
  parcelas         ParcelaContas[]
  classificacoes   MovimentoClassificacao[]
}

model ParcelaContas {
  id             Int           @id @default(autoincrement())
  identificacao  String
  dataVencimento DateTime
  valorParcela   Decimal
  valorSaldo     Decimal
  statusParcela  StatusParcela @default(ABERTA)
  movimentoId    Int
  movimento      MovimentoContas @relation(fields: [movimentoId], references: [id])
}

model MovimentoClassificacao {
  movimentoId     Int
  classificacaoId Int
  movimento       MovimentoContas @relation(fields: [movimentoId], references: [id])
  classificacao   Classificacao   @relation(fields: [classificacaoId], references: [id])
  @@id([movimentoId, classificacaoId])
}

enum PessoaTipo { FORNECEDOR, FATURADO, CLIENTE }
enum StatusRegistro { ATIVO, INATIVO }
enum ClassificacaoTipo { DESPESA, RECEITA }
enum MovimentoTipo { APAGAR, ARECEBER }
enum StatusParcela { ABERTA, PAGA, CANCELADA }
"#;

/// Logical model name → physical table name.
pub const TABLE_MAPPING: &[(&str, &str)] = &[
    ("MovimentoContas", "movimento_contas"),
    ("ParcelaContas", "parcela_contas"),
    ("Pessoa", "pessoa"),
    ("Classificacao", "classificacao"),
    ("MovimentoClassificacao", "movimento_classificacao"),
];

/// Render history as `"<Sender>: <text>"` lines.
pub fn render_history(history: &[ConversationTurn]) -> String {
    history
        .iter()
        .map(|turn| format!("{}: {}", turn.sender.label(), turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt that asks the model to pick SQL, semantic search, or to answer.
pub fn decision_prompt(query: &str, history: &[ConversationTurn]) -> String {
    format!(
        r#"{PERSONA}
Seu tom de voz é didático e amistoso.

Você tem três ferramentas:
1. **{SQL_MARKER}**: Para perguntas que exigem CÁLCULOS ou DADOS EXATOS do banco (soma, contagem, média, etc.).
2. **{SEMANTIC_MARKER}**: Para perguntas ABERTAS ou DESCRITIVAS (Ex: "fale sobre...", "encontre notas relacionadas a...").
3. **{DIRECT_MARKER}**: Para saudações, conversas ou perguntas de ACOMPANHAMENTO que podem ser respondidas com o histórico.

**HISTÓRICO DA CONVERSA:**
{history}

**PERGUNTA ATUAL DO USUÁRIO:**
"{query}"

**INSTRUÇÕES:**
1. Analise a pergunta atual no contexto do histórico.
2. **DECIDA A AÇÃO:**
   * Se for um cálculo ou busca por dados exatos -> Responda APENAS com a tag: {SQL_MARKER}
   * Se for uma busca por descrição ou conceito -> Responda APENAS com a tag: {SEMANTIC_MARKER}
   * Se for uma saudação ou um cálculo simples baseado no histórico (Ex: "divida esse valor por 12") -> Comece com a tag {DIRECT_MARKER} e responda DIRETAMENTE, no tom do Mark.

**SUA RESPOSTA:**
"#,
        history = render_history(history),
    )
}

/// Prompt that turns a question into one SQLite statement.
pub fn sql_prompt(query: &str) -> String {
    let mapping = TABLE_MAPPING
        .iter()
        .map(|(model, table)| format!("- {model} -> `{table}`"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Sua única tarefa é gerar uma consulta SQLite válida e somente de leitura (SELECT) para responder à pergunta do usuário, usando o schema fornecido.

**Schema lógico (use para nomes de colunas):**
{SCHEMA_DESCRIPTION}

**REGRA MAIS IMPORTANTE:** Use SEMPRE os nomes de tabela em snake_case do mapeamento (ex: `movimento_contas`). NUNCA use os nomes de modelo em PascalCase do schema (ex: `MovimentoContas`).

**Mapeamento OBRIGATÓRIO (Modelo -> Tabela SQL):**
{mapping}

**Outras Regras:**
1. Gere APENAS a consulta SQL, sem explicações ou markdown.
2. Coloque nomes de colunas camelCase entre aspas duplas (ex: "valorTotal", "movimentoId").
3. Para status, use os valores do Enum. Para 'parcelas em aberto', a condição é `WHERE "statusParcela" = 'ABERTA'`.
4. Termine a consulta com ponto e vírgula.
5. Se não puder responder, retorne "{SQL_INABILITY_PHRASE}".

**EXEMPLO 1 (Simples):**
- **Pergunta:** "Quantos fornecedores existem?"
- **SQL Gerado:** SELECT COUNT(*) FROM pessoa WHERE tipo = 'FORNECEDOR';

**EXEMPLO 2 (Complexo com JOIN e Soma):**
- **Pergunta:** "Quanto já gastamos com insumos agrícolas?"
- **SQL Gerado:** SELECT SUM(mc."valorTotal") FROM movimento_contas AS mc JOIN movimento_classificacao AS mcl ON mc.id = mcl."movimentoId" JOIN classificacao AS c ON mcl."classificacaoId" = c.id WHERE c.descricao = 'INSUMOS AGRÍCOLAS';

**Pergunta do Usuário:**
"{query}"

**SQL Gerado:**
"#
    )
}

/// Prompt that writes the final answer from retrieved context.
///
/// `context_json` is already normalized and pretty-printed.
pub fn answer_prompt(query: &str, context_json: &str, history: &[ConversationTurn]) -> String {
    format!(
        r#"{PERSONA}
Seu tom de voz é didático, amistoso e direto.

Sua tarefa é fornecer uma resposta clara e concisa em português para a pergunta original do usuário, com base no histórico da conversa e nos dados que foram consultados no banco de dados.

**HISTÓRICO DA CONVERSA:**
{history}

**PERGUNTA ORIGINAL DO USUÁRIO:**
"{query}"

**CONTEXTO (dados da sua "colheita" no banco):**
{context_json}

**Instruções para a Resposta:**
1. **Baseie sua resposta ESTRITAMENTE no CONTEXTO fornecido.** Não invente informações.
2. Incorpore a personalidade do Mark, com no máximo uma analogia agrícola.
3. Formule uma resposta direta e clara. Não mencione SQL ou JSON. Aja como se você mesmo tivesse encontrado a informação.
4. Seja conciso e útil. Use negrito com asteriscos duplos (`**texto**`) para destacar informações importantes.
5. Responda sempre em português (Brasil).

**Resposta do Mark:**
"#,
        history = render_history(history),
    )
}
