//! # AgroMark Core
//!
//! Runtime-free logic for the AgroMark ledger assistant: data models,
//! collaborator traits, prompt construction, the decision router, the
//! SQL and semantic retrieval strategies, the embedding cache, and the
//! [`agent::Agent`] that ties them together.
//!
//! This crate contains no tokio, sqlx or HTTP client. The `agromark` app
//! crate supplies concrete [`store::LedgerStore`],
//! [`completion::CompletionModel`] and [`embedding::Embedder`]
//! implementations; [`testing`] supplies deterministic fakes.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Conversation turns, ledger rows, SQL values |
//! | [`store`] | `LedgerStore` trait + in-memory implementation |
//! | [`completion`] | `CompletionModel` trait |
//! | [`embedding`] | `Embedder` trait, cosine similarity |
//! | [`prompts`] | Router, SQL and answer prompt templates |
//! | [`router`] | Decision parsing and routing |
//! | [`sql`] | SQL generation cleanup and execution |
//! | [`guard`] | Read-only allow-list check for generated SQL |
//! | [`cache`] | Snapshot-swapping embedding cache and ranking |
//! | [`semantic`] | Semantic retrieval strategy |
//! | [`normalize`] | JSON normalization of retrieved context |
//! | [`synthesizer`] | Final answer prompt |
//! | [`agent`] | The orchestrator |

pub mod agent;
pub mod cache;
pub mod completion;
pub mod embedding;
pub mod error;
pub mod guard;
pub mod models;
pub mod normalize;
pub mod prompts;
pub mod router;
pub mod semantic;
pub mod sql;
pub mod store;
pub mod strategy;
pub mod synthesizer;
pub mod testing;

pub use agent::{Agent, AgentBuilder, Answer, Route};
pub use error::AgentError;
pub use models::{ConversationTurn, LedgerRow, Sender, SqlResult, SqlRow, SqlValue};
