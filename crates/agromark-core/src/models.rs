//! Core data models used throughout AgroMark.
//!
//! These types represent the conversation turns, ledger rows, and raw SQL
//! results that flow through the query-answering pipeline. None of them
//! are persisted by the agent itself.

use serde::{Deserialize, Serialize};

/// Who authored a [`ConversationTurn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    /// Any sender other than `"user"` is rendered as the assistant.
    #[serde(other)]
    Agent,
}

impl Sender {
    /// Label used when rendering history into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "Usuário",
            Sender::Agent => "Assistente",
        }
    }
}

/// One message of a chat session, supplied by the caller on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub sender: Sender,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Agent,
            text: text.into(),
        }
    }
}

/// A ledger movement joined with its supplier and category labels.
///
/// This is the source material for the embedding cache: each row is
/// rendered into a single summary sentence by [`LedgerRow::summary`].
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub id: i64,
    pub invoice_number: String,
    pub supplier_name: String,
    pub description: Option<String>,
    /// Category descriptions attached to the movement, in store order.
    pub categories: Vec<String>,
    /// Decimal total as stored (e.g. `"1520.50"`), kept textual to avoid
    /// float formatting drift.
    pub total_value: String,
}

impl LedgerRow {
    /// Human-readable summary sentence used as the embedded document text.
    pub fn summary(&self) -> String {
        let description = self
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("não especificada");
        format!(
            "Nota fiscal número {} do fornecedor {} com descrição \"{}\" classificada como \"{}\" no valor de R${}.",
            self.invoice_number,
            self.supplier_name,
            description,
            self.categories.join(", "),
            self.total_value
        )
    }
}

/// A single scalar cell returned by an ad hoc SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// One result row: column name → value, in select-list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRow {
    pub columns: Vec<(String, SqlValue)>,
}

impl SqlRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: SqlValue) {
        self.columns.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }
}

/// Rows returned verbatim by the relational store.
pub type SqlResult = Vec<SqlRow>;
