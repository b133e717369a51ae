//! The query-answering agent.
//!
//! A single pass per question, no retries and no backtracking:
//!
//! ```text
//!                ┌──────────────┐
//!  question ───▶ │ DecisionRouter│
//!                └──────┬───────┘
//!        UseSql ┌───────┼──────────┐ UseSemanticSearch
//!               ▼       │          ▼
//!        ┌───────────┐  │   ┌────────────────┐
//!        │SqlStrategy│  │   │SemanticStrategy│
//!        └─────┬─────┘  │   └───────┬────────┘
//!              └────────┼───────────┘
//!                       ▼ DirectAnswer
//!              AnswerSynthesizer ──▶ answer
//! ```
//!
//! [`Agent::answer_query`] is the error boundary: it always returns a
//! string. [`Agent::try_answer`] exposes the typed result for callers that
//! want to tell failures apart.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::EmbeddingCache;
use crate::completion::CompletionModel;
use crate::embedding::Embedder;
use crate::error::AgentError;
use crate::guard::SqlGuard;
use crate::models::ConversationTurn;
use crate::router::{Decision, DecisionRouter};
use crate::semantic::{SemanticStrategy, DEFAULT_TOP_K};
use crate::sql::SqlStrategy;
use crate::store::LedgerStore;
use crate::strategy::{Retrieval, RetrievalStrategy};
use crate::synthesizer::AnswerSynthesizer;

/// Prefix of every answer produced from an unexpected failure.
pub const GENERIC_ERROR_PREFIX: &str = "Ocorreu um erro ao processar sua pergunta: ";

/// Which branch produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Sql,
    SemanticSearch,
    Direct,
}

/// A successful answer and the branch that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub route: Route,
}

/// Routes each question to a strategy and synthesizes the reply.
pub struct Agent {
    router: DecisionRouter,
    sql: Arc<dyn RetrievalStrategy>,
    semantic: Arc<dyn RetrievalStrategy>,
    synthesizer: AnswerSynthesizer,
}

impl Agent {
    /// Assemble an agent from already-built parts.
    pub fn new(
        router: DecisionRouter,
        sql: Arc<dyn RetrievalStrategy>,
        semantic: Arc<dyn RetrievalStrategy>,
        synthesizer: AnswerSynthesizer,
    ) -> Self {
        Self {
            router,
            sql,
            semantic,
            synthesizer,
        }
    }

    /// Start building the standard SQL + semantic agent.
    pub fn builder(
        model: Arc<dyn CompletionModel>,
        store: Arc<dyn LedgerStore>,
        embedder: Arc<dyn Embedder>,
    ) -> AgentBuilder {
        AgentBuilder {
            model,
            store,
            embedder,
            cache_ttl: Duration::from_secs(300),
            top_k: DEFAULT_TOP_K,
            strict_decisions: false,
            guard: Some(SqlGuard::default()),
            cache: None,
        }
    }

    /// Answer a question. Never fails: errors become chat-style messages.
    pub async fn answer_query(&self, query: &str, history: &[ConversationTurn]) -> String {
        match self.try_answer(query, history).await {
            Ok(answer) => answer.text,
            Err(err) => {
                tracing::error!(error = %err, "failed to answer query");
                if err.is_verbatim() {
                    err.to_string()
                } else {
                    format!("{}{}", GENERIC_ERROR_PREFIX, err)
                }
            }
        }
    }

    /// Answer a question, surfacing the first failure.
    pub async fn try_answer(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<Answer, AgentError> {
        let (strategy, route) = match self.router.decide(query, history).await? {
            Decision::UseSql => (&self.sql, Route::Sql),
            Decision::UseSemanticSearch => (&self.semantic, Route::SemanticSearch),
            Decision::DirectAnswer(text) => {
                return Ok(Answer {
                    text,
                    route: Route::Direct,
                })
            }
        };

        tracing::debug!(strategy = strategy.name(), "retrieving context");
        let text = match strategy.retrieve(query).await? {
            Retrieval::Final(text) => text,
            Retrieval::Context(context) => {
                self.synthesizer
                    .synthesize(query, &context, history)
                    .await?
            }
        };

        Ok(Answer { text, route })
    }
}

/// Builder for the standard agent wiring.
pub struct AgentBuilder {
    model: Arc<dyn CompletionModel>,
    store: Arc<dyn LedgerStore>,
    embedder: Arc<dyn Embedder>,
    cache_ttl: Duration,
    top_k: usize,
    strict_decisions: bool,
    guard: Option<SqlGuard>,
    cache: Option<Arc<EmbeddingCache>>,
}

impl AgentBuilder {
    /// How long a cache snapshot stays fresh (default 5 minutes).
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Number of summaries forwarded from semantic search (default 3).
    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Only honour router markers at the start of the response.
    pub fn strict_decisions(mut self, strict: bool) -> Self {
        self.strict_decisions = strict;
        self
    }

    /// Replace the SQL guard; `None` disables the read-only check.
    pub fn sql_guard(mut self, guard: Option<SqlGuard>) -> Self {
        self.guard = guard;
        self
    }

    /// Share an existing cache instead of creating one.
    pub fn cache(mut self, cache: Arc<EmbeddingCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the agent together with the cache it searches.
    pub fn build(self) -> (Agent, Arc<EmbeddingCache>) {
        let cache = self.cache.unwrap_or_else(|| {
            Arc::new(EmbeddingCache::new(
                self.store.clone(),
                self.embedder.clone(),
                self.cache_ttl,
            ))
        });

        let router = DecisionRouter::new(self.model.clone()).strict(self.strict_decisions);
        let sql = SqlStrategy::new(self.model.clone(), self.store).with_guard(self.guard);
        let semantic = SemanticStrategy::new(cache.clone()).with_top_k(self.top_k);
        let synthesizer = AnswerSynthesizer::new(self.model);

        let agent = Agent::new(router, Arc::new(sql), Arc::new(semantic), synthesizer);
        (agent, cache)
    }
}
