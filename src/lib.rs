//! # AgroMark
//!
//! A chat agent that answers natural-language questions about an
//! agribusiness accounts ledger (invoices, suppliers, installments,
//! expense categories).
//!
//! Each question is routed by a hosted language model to one of three
//! paths: generate and run SQL for exact figures, rank embedded ledger
//! summaries for descriptive questions, or answer directly.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────────┐   ┌───────────┐
//! │  CLI / HTTP  │──▶│  agromark-core Agent │──▶│  SQLite   │
//! │ (ask, serve) │   │ router · SQL · cache │   │  ledger   │
//! └──────────────┘   └──────────┬───────────┘   └───────────┘
//!                               │
//!                               ▼
//!                     ┌──────────────────┐
//!                     │  Gemini / OpenAI │
//!                     │  / Ollama (HTTP) │
//!                     └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`seed`] | Default categories and demo ledger |
//! | [`store`] | SQLite `LedgerStore` |
//! | [`http`] | Shared JSON-over-HTTP retry loop |
//! | [`llm`] | Completion model clients |
//! | [`embedding`] | Embedding provider clients |
//! | [`app`] | Builds the agent from config |
//! | [`ask`] | One-shot CLI question |
//! | [`cache_cmd`] | Cache rebuild command |
//! | [`server`] | HTTP API |
//! | [`logging`] | tracing subscriber setup |

pub mod app;
pub mod ask;
pub mod cache_cmd;
pub mod config;
pub mod db;
pub mod embedding;
pub mod http;
pub mod llm;
pub mod logging;
pub mod migrate;
pub mod seed;
pub mod server;
pub mod store;
