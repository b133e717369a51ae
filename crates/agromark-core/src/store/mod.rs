//! Storage abstraction for the ledger.
//!
//! The [`LedgerStore`] trait defines the two things the agent needs from
//! the relational store: the joined ledger rows that feed the embedding
//! cache, and ad hoc execution of generated SQL text.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{LedgerRow, SqlResult};

/// Abstract relational store backing the agent.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`ledger_rows`](LedgerStore::ledger_rows) | Movements joined with supplier and categories |
/// | [`execute_raw`](LedgerStore::execute_raw) | Run a statement verbatim, return rows |
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Every ledger movement with its supplier name and category labels,
    /// ordered by movement id.
    async fn ledger_rows(&self) -> Result<Vec<LedgerRow>>;

    /// Execute `sql` exactly as given, with no parameter binding.
    ///
    /// The error message of a failed statement is what the end user
    /// eventually sees, so implementations should keep the backend's text.
    async fn execute_raw(&self, sql: &str) -> Result<SqlResult>;
}
