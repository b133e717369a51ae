//! Error taxonomy for the query-answering pipeline.

use thiserror::Error;

/// Message surfaced when the model declines to produce SQL.
pub const SQL_UNAVAILABLE_MESSAGE: &str =
    "Não foi possível gerar uma consulta SQL para esta pergunta.";

/// Failures a single question can hit on its way to an answer.
///
/// Every variant is terminal for that question. [`crate::agent::Agent`]
/// turns them into chat-style answers; nothing is retried.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model signalled it cannot express the question as SQL.
    #[error("{}", SQL_UNAVAILABLE_MESSAGE)]
    SqlUnavailable,

    /// The generated statement failed the read-only guard.
    #[error("A consulta SQL gerada foi recusada: {0}")]
    SqlRejected(String),

    /// The store refused or failed to run the generated statement.
    #[error("A consulta SQL falhou: \"{0}\"")]
    SqlExecution(String),

    /// Completion request failed (transport, quota, malformed response).
    #[error("falha no modelo de linguagem: {0}")]
    Model(#[source] anyhow::Error),

    /// Embedding request failed or returned the wrong number of vectors.
    #[error("falha ao gerar embeddings: {0}")]
    Embedding(#[source] anyhow::Error),

    /// Reading source rows from the store failed.
    #[error("falha ao consultar o banco de dados: {0}")]
    Store(#[source] anyhow::Error),
}

impl AgentError {
    /// Whether the error message should reach the user verbatim, without
    /// the generic "error while processing" prefix.
    pub fn is_verbatim(&self) -> bool {
        matches!(self, AgentError::SqlUnavailable)
    }
}
