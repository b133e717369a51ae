//! SQL synthesis and execution strategy.
//!
//! ```text
//! question ──▶ sql_prompt ──▶ model ──▶ clean_generated_sql ──▶ guard ──▶ store
//! ```
//!
//! Generated statements are never cached: the same question may produce
//! different SQL on the next call.

use std::sync::Arc;

use async_trait::async_trait;

use crate::completion::CompletionModel;
use crate::error::AgentError;
use crate::guard::SqlGuard;
use crate::models::SqlResult;
use crate::normalize::ContextData;
use crate::prompts::{sql_prompt, SQL_INABILITY_PHRASE};
use crate::store::LedgerStore;
use crate::strategy::{Retrieval, RetrievalStrategy};

/// Strip code fences, detect refusal, and terminate the statement.
pub fn clean_generated_sql(raw: &str) -> Result<String, AgentError> {
    let sql = raw
        .trim()
        .replace("```sql", "")
        .replace("```SQL", "")
        .replace("```", "");
    let mut sql = sql.trim().to_string();

    if sql.is_empty() || sql.to_uppercase().contains(SQL_INABILITY_PHRASE) {
        return Err(AgentError::SqlUnavailable);
    }

    if !sql.ends_with(';') {
        sql.push(';');
    }
    Ok(sql)
}

/// Text-to-SQL retrieval over the ledger store.
pub struct SqlStrategy {
    model: Arc<dyn CompletionModel>,
    store: Arc<dyn LedgerStore>,
    guard: Option<SqlGuard>,
}

impl SqlStrategy {
    /// Strategy with the default read-only guard enabled.
    pub fn new(model: Arc<dyn CompletionModel>, store: Arc<dyn LedgerStore>) -> Self {
        Self {
            model,
            store,
            guard: Some(SqlGuard::default()),
        }
    }

    /// Replace the guard; `None` executes statements unchecked.
    pub fn with_guard(mut self, guard: Option<SqlGuard>) -> Self {
        self.guard = guard;
        self
    }

    /// Ask the model for one statement answering `query`.
    pub async fn generate_sql(&self, query: &str) -> Result<String, AgentError> {
        let raw = self
            .model
            .complete(&sql_prompt(query))
            .await
            .map_err(AgentError::Model)?;
        let sql = clean_generated_sql(&raw)?;
        tracing::info!(sql = %sql, "generated sql");
        Ok(sql)
    }

    /// Run `sql` against the store, after the guard if one is set.
    pub async fn execute_sql(&self, sql: &str) -> Result<SqlResult, AgentError> {
        if let Some(guard) = &self.guard {
            guard.check(sql).map_err(|reason| {
                tracing::warn!(sql = %sql, reason = %reason, "sql rejected by guard");
                AgentError::SqlRejected(reason)
            })?;
        }

        self.store.execute_raw(sql).await.map_err(|e| {
            tracing::warn!(sql = %sql, error = %e, "sql execution failed");
            AgentError::SqlExecution(e.to_string())
        })
    }
}

#[async_trait]
impl RetrievalStrategy for SqlStrategy {
    fn name(&self) -> &'static str {
        "sql"
    }

    async fn retrieve(&self, query: &str) -> Result<Retrieval, AgentError> {
        let sql = self.generate_sql(query).await?;
        let rows = self.execute_sql(&sql).await?;
        tracing::debug!(rows = rows.len(), "sql rows fetched");
        Ok(Retrieval::Context(ContextData::Rows(rows)))
    }
}
