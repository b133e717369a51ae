//! Retrieval strategy seam.
//!
//! The orchestrator holds one strategy per retrieval route and never
//! knows whether it is talking to SQLite, a hosted model or a test fake.

use async_trait::async_trait;

use crate::error::AgentError;
use crate::normalize::ContextData;

/// Result of running a strategy for one question.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// Data to ground the final answer in.
    Context(ContextData),
    /// A ready answer; the synthesizer is skipped.
    Final(String),
}

/// A way of fetching context for a question.
#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    /// Short identifier used in logs (`"sql"`, `"semantic"`).
    fn name(&self) -> &'static str;

    async fn retrieve(&self, query: &str) -> Result<Retrieval, AgentError>;
}
