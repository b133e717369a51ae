//! Semantic retrieval strategy over the embedding cache.

use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::{EmbeddingCache, SearchOutcome};
use crate::error::AgentError;
use crate::normalize::ContextData;
use crate::strategy::{Retrieval, RetrievalStrategy};

/// Answer returned when the ledger is empty.
pub const INSUFFICIENT_DATA: &str = "Ainda não há dados suficientes para realizar uma busca. \
Por favor, adicione alguns lançamentos primeiro.";

/// Default number of summaries forwarded to the synthesizer.
pub const DEFAULT_TOP_K: usize = 3;

pub struct SemanticStrategy {
    cache: Arc<EmbeddingCache>,
    top_k: usize,
}

impl SemanticStrategy {
    pub fn new(cache: Arc<EmbeddingCache>) -> Self {
        Self {
            cache,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// The `k` closest ledger summaries, or `None` when the ledger is empty.
    pub async fn search(&self, query: &str) -> Result<Option<Vec<String>>, AgentError> {
        match self.cache.search(query, self.top_k).await? {
            SearchOutcome::InsufficientData => Ok(None),
            SearchOutcome::Hits(hits) => {
                for hit in &hits {
                    tracing::debug!(row = hit.source_row_id, score = hit.score, "semantic hit");
                }
                Ok(Some(hits.into_iter().map(|h| h.text).collect()))
            }
        }
    }
}

#[async_trait]
impl RetrievalStrategy for SemanticStrategy {
    fn name(&self) -> &'static str {
        "semantic"
    }

    async fn retrieve(&self, query: &str) -> Result<Retrieval, AgentError> {
        Ok(match self.search(query).await? {
            None => Retrieval::Final(INSUFFICIENT_DATA.to_string()),
            Some(docs) => Retrieval::Context(ContextData::Documents(docs)),
        })
    }
}
