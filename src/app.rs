//! Wires configuration, the SQLite store and the model clients into an
//! [`Agent`].

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use agromark_core::cache::EmbeddingCache;
use agromark_core::completion::CompletionModel;
use agromark_core::embedding::Embedder;
use agromark_core::guard::SqlGuard;
use agromark_core::Agent;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::llm::create_model;
use crate::store::SqliteLedgerStore;

/// Everything a command or the server needs to answer questions.
#[derive(Clone)]
pub struct App {
    pub config: Arc<Config>,
    pub store: Arc<SqliteLedgerStore>,
    pub agent: Arc<Agent>,
    pub cache: Arc<EmbeddingCache>,
}

impl App {
    /// Connect to the database and build the configured model clients.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        let model = create_model(&config.llm)?;
        let embedder = create_embedder(&config.embedding)?;
        tracing::debug!(
            llm = model.model_name(),
            embedding = embedder.model_name(),
            "model clients ready"
        );
        Ok(Self::with_parts(config, pool, model, embedder))
    }

    /// Build from an open pool and explicit model clients.
    pub fn with_parts(
        config: &Config,
        pool: SqlitePool,
        model: Arc<dyn CompletionModel>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let store = Arc::new(SqliteLedgerStore::new(pool));
        let guard = config.agent.read_only_sql.then(SqlGuard::default);

        let (agent, cache) = Agent::builder(model, store.clone(), embedder)
            .cache_ttl(Duration::from_secs(config.agent.cache_ttl_secs))
            .top_k(config.agent.top_k)
            .strict_decisions(config.agent.strict_decisions)
            .sql_guard(guard)
            .build();

        Self {
            config: Arc::new(config.clone()),
            store,
            agent: Arc::new(agent),
            cache,
        }
    }
}
