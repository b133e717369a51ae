//! In-memory [`LedgerStore`] implementation for tests and demos.
//!
//! Ledger rows live in a `Vec` behind `std::sync::RwLock`. There is no SQL
//! engine: statements are matched against canned results registered with
//! [`InMemoryLedgerStore::on_sql`], and every executed statement is
//! recorded so callers can assert on what reached the store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{LedgerRow, SqlResult};

use super::LedgerStore;

/// In-memory ledger for testing.
pub struct InMemoryLedgerStore {
    rows: RwLock<Vec<LedgerRow>>,
    canned: RwLock<Vec<(String, SqlResult)>>,
    executed: RwLock<Vec<String>>,
    row_reads: AtomicUsize,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            canned: RwLock::new(Vec::new()),
            executed: RwLock::new(Vec::new()),
            row_reads: AtomicUsize::new(0),
        }
    }

    pub fn with_rows(rows: Vec<LedgerRow>) -> Self {
        let store = Self::new();
        store.set_rows(rows);
        store
    }

    /// Replace the ledger contents.
    pub fn set_rows(&self, rows: Vec<LedgerRow>) {
        *self.rows.write().unwrap_or_else(PoisonError::into_inner) = rows;
    }

    /// Register the result for a statement. Matching ignores surrounding
    /// whitespace and ASCII case.
    pub fn on_sql(&self, sql: &str, result: SqlResult) {
        self.canned
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((normalize_sql(sql), result));
    }

    /// Statements passed to [`LedgerStore::execute_raw`], in call order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of [`LedgerStore::ledger_rows`] calls so far.
    pub fn row_reads(&self) -> usize {
        self.row_reads.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_sql(sql: &str) -> String {
    sql.trim().to_ascii_lowercase()
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn ledger_rows(&self) -> Result<Vec<LedgerRow>> {
        self.row_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn execute_raw(&self, sql: &str) -> Result<SqlResult> {
        self.executed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sql.to_string());
        let key = normalize_sql(sql);
        let canned = self.canned.read().unwrap_or_else(PoisonError::into_inner);
        match canned.iter().find(|(stmt, _)| *stmt == key) {
            Some((_, result)) => Ok(result.clone()),
            None => bail!("no such statement registered: {}", sql.trim()),
        }
    }
}
