//! Embedding cache over ledger summaries.
//!
//! The cache is an explicit object owned by whoever builds the agent; there
//! is no process-global state. Readers always see a complete, immutable
//! [`CacheSnapshot`]:
//!
//! - A rebuild reads every ledger row, renders one summary sentence per
//!   row, embeds all summaries in one batch, and only then swaps the new
//!   snapshot in. A failed rebuild leaves the previous snapshot in place.
//! - Rebuilds are serialized by an async mutex. A non-forced caller that
//!   waited on the mutex re-checks freshness first, so concurrent cold
//!   requests trigger one embedding batch, not one each.
//! - A snapshot is fresh while `built_at.elapsed() < ttl`. There is no
//!   eviction beyond whole-snapshot replacement.
//!
//! # Ranking
//!
//! Search is a brute-force scan, `O(N·d)` for `N` entries of dimension `d`:
//! every vector is scored by cosine similarity against the query vector,
//! then stable-sorted by descending score, so equal scores keep cache
//! order.

use std::cmp::Ordering;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::lock::Mutex;

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::AgentError;
use crate::models::LedgerRow;
use crate::store::LedgerStore;

/// One embedded ledger summary.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub source_row_id: i64,
    pub document_text: String,
    pub vector: Vec<f32>,
}

/// An immutable, fully built generation of the cache.
#[derive(Debug)]
pub struct CacheSnapshot {
    entries: Vec<CacheEntry>,
    built_at: Instant,
    built_at_utc: DateTime<Utc>,
}

impl CacheSnapshot {
    fn new(entries: Vec<CacheEntry>) -> Self {
        Self {
            entries,
            built_at: Instant::now(),
            built_at_utc: Utc::now(),
        }
    }

    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wall-clock build time, for reporting.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at_utc
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.built_at.elapsed() < ttl
    }
}

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub source_row_id: i64,
    pub text: String,
    pub score: f32,
}

/// Outcome of [`EmbeddingCache::search`].
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The ledger had no rows when the cache was built.
    InsufficientData,
    /// Top hits, best first.
    Hits(Vec<ScoredDocument>),
}

/// Lazily built, TTL-bounded cache of ledger summary embeddings.
pub struct EmbeddingCache {
    store: Arc<dyn LedgerStore>,
    embedder: Arc<dyn Embedder>,
    ttl: Duration,
    current: RwLock<Option<Arc<CacheSnapshot>>>,
    rebuild_lock: Mutex<()>,
}

impl EmbeddingCache {
    pub fn new(store: Arc<dyn LedgerStore>, embedder: Arc<dyn Embedder>, ttl: Duration) -> Self {
        Self {
            store,
            embedder,
            ttl,
            current: RwLock::new(None),
            rebuild_lock: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The current snapshot, fresh or not.
    pub fn snapshot(&self) -> Option<Arc<CacheSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn fresh_snapshot(&self) -> Option<Arc<CacheSnapshot>> {
        self.snapshot().filter(|s| s.is_fresh(self.ttl))
    }

    /// Ensure a usable snapshot exists.
    ///
    /// With `force = false` this is a no-op while the current snapshot is
    /// younger than the TTL. With `force = true` the ledger is always
    /// re-read and re-embedded.
    pub async fn rebuild(&self, force: bool) -> Result<Arc<CacheSnapshot>, AgentError> {
        if !force {
            if let Some(snapshot) = self.fresh_snapshot() {
                tracing::debug!(documents = snapshot.len(), "reusing embedding cache");
                return Ok(snapshot);
            }
        }

        let _guard = self.rebuild_lock.lock().await;
        if !force {
            if let Some(snapshot) = self.fresh_snapshot() {
                return Ok(snapshot);
            }
        }

        tracing::info!(force, "rebuilding embedding cache");
        let rows = self.store.ledger_rows().await.map_err(AgentError::Store)?;
        let entries = if rows.is_empty() {
            tracing::info!("no ledger rows to embed");
            Vec::new()
        } else {
            self.embed_rows(&rows).await?
        };

        let snapshot = Arc::new(CacheSnapshot::new(entries));
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        tracing::info!(documents = snapshot.len(), "embedding cache updated");
        Ok(snapshot)
    }

    async fn embed_rows(&self, rows: &[LedgerRow]) -> Result<Vec<CacheEntry>, AgentError> {
        let texts: Vec<String> = rows.iter().map(LedgerRow::summary).collect();
        let vectors = self
            .embedder
            .embed_documents(&texts)
            .await
            .map_err(AgentError::Embedding)?;

        if vectors.len() != texts.len() {
            return Err(AgentError::Embedding(anyhow::anyhow!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        Ok(rows
            .iter()
            .zip(texts)
            .zip(vectors)
            .map(|((row, document_text), vector)| CacheEntry {
                source_row_id: row.id,
                document_text,
                vector,
            })
            .collect())
    }

    /// Warm the cache if needed, then return the `k` closest summaries.
    pub async fn search(&self, query: &str, k: usize) -> Result<SearchOutcome, AgentError> {
        let snapshot = self.rebuild(false).await?;
        if snapshot.is_empty() {
            return Ok(SearchOutcome::InsufficientData);
        }

        let query_vec = self
            .embedder
            .embed_query(query)
            .await
            .map_err(AgentError::Embedding)?;

        Ok(SearchOutcome::Hits(rank(snapshot.entries(), &query_vec, k)))
    }
}

/// Score every entry against `query_vec` and keep the best `k`.
///
/// Stable: entries with equal scores keep their cache order.
pub fn rank(entries: &[CacheEntry], query_vec: &[f32], k: usize) -> Vec<ScoredDocument> {
    let mut scored: Vec<(&CacheEntry, f32)> = entries
        .iter()
        .map(|e| (e, cosine_similarity(query_vec, &e.vector)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(k);

    scored
        .into_iter()
        .map(|(e, score)| ScoredDocument {
            source_row_id: e.source_row_id,
            text: e.document_text.clone(),
            score,
        })
        .collect()
}
