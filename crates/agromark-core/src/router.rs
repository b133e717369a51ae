//! Decision router: picks how a question is answered.
//!
//! One completion call per question. The free-text response is parsed
//! into a closed [`Decision`] instead of being re-inspected by callers.
//!
//! # Parsing modes
//!
//! - **Lenient** (default): the response is searched for [`SQL_MARKER`]
//!   first, then [`SEMANTIC_MARKER`]; anything else is a direct answer.
//! - **Strict**: a marker only counts when the response *starts* with it,
//!   so a direct answer that merely mentions `[SQL]` is not misrouted.
//!
//! In both modes an unrecognized response falls back to
//! [`Decision::DirectAnswer`] carrying the whole text, with a leading
//! [`DIRECT_MARKER`] removed if the model included one.

use std::sync::Arc;

use crate::completion::CompletionModel;
use crate::error::AgentError;
use crate::models::ConversationTurn;
use crate::prompts::{decision_prompt, DIRECT_MARKER, SEMANTIC_MARKER, SQL_MARKER};

/// What to do with a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Generate and run SQL, then synthesize an answer from the rows.
    UseSql,
    /// Rank cached ledger summaries, then synthesize from the top hits.
    UseSemanticSearch,
    /// The model's response is already the final answer.
    DirectAnswer(String),
}

impl Decision {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::UseSql => "sql",
            Decision::UseSemanticSearch => "semantic",
            Decision::DirectAnswer(_) => "direct",
        }
    }
}

/// Parse a raw router response into a [`Decision`].
pub fn parse_decision(raw: &str, strict: bool) -> Decision {
    let text = raw.trim();

    let has = |marker: &str| {
        if strict {
            text.starts_with(marker)
        } else {
            text.contains(marker)
        }
    };

    if has(SQL_MARKER) {
        return Decision::UseSql;
    }
    if has(SEMANTIC_MARKER) {
        return Decision::UseSemanticSearch;
    }

    let answer = text
        .strip_prefix(DIRECT_MARKER)
        .map(str::trim_start)
        .unwrap_or(text);
    Decision::DirectAnswer(answer.to_string())
}

/// Classifies one question (with history) through the completion model.
pub struct DecisionRouter {
    model: Arc<dyn CompletionModel>,
    strict: bool,
}

impl DecisionRouter {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self {
            model,
            strict: false,
        }
    }

    /// Only honour markers at the start of the response.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Ask the model to classify `query` and parse its reply.
    pub async fn decide(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<Decision, AgentError> {
        let prompt = decision_prompt(query, history);
        let raw = self
            .model
            .complete(&prompt)
            .await
            .map_err(AgentError::Model)?;
        tracing::debug!(response = %raw.trim(), "router response");

        let decision = parse_decision(&raw, self.strict);
        tracing::info!(action = decision.label(), "router decision");
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_marker() {
        assert_eq!(parse_decision("  [SQL]\n", false), Decision::UseSql);
    }

    #[test]
    fn test_semantic_marker() {
        assert_eq!(
            parse_decision("[BUSCA_SEMANTICA]", false),
            Decision::UseSemanticSearch
        );
    }

    #[test]
    fn test_sql_checked_before_semantic() {
        assert_eq!(
            parse_decision("[BUSCA_SEMANTICA] [SQL]", false),
            Decision::UseSql
        );
    }

    #[test]
    fn test_unmarked_text_is_direct_answer() {
        assert_eq!(
            parse_decision("  Olá! Eu sou o Mark.  ", false),
            Decision::DirectAnswer("Olá! Eu sou o Mark.".to_string())
        );
    }

    #[test]
    fn test_direct_marker_is_stripped() {
        assert_eq!(
            parse_decision("[RESPOSTA_DIRETA] Isso dá **R$ 100,00** por mês.", false),
            Decision::DirectAnswer("Isso dá **R$ 100,00** por mês.".to_string())
        );
    }

    #[test]
    fn test_lenient_mode_misroutes_embedded_marker() {
        let text = "Posso usar a ferramenta [SQL] se quiser números exatos.";
        assert_eq!(parse_decision(text, false), Decision::UseSql);
    }

    #[test]
    fn test_strict_mode_ignores_embedded_marker() {
        let text = "Posso usar a ferramenta [SQL] se quiser números exatos.";
        assert_eq!(
            parse_decision(text, true),
            Decision::DirectAnswer(text.to_string())
        );
        assert_eq!(parse_decision("[SQL]", true), Decision::UseSql);
        assert_eq!(
            parse_decision(" [BUSCA_SEMANTICA]", true),
            Decision::UseSemanticSearch
        );
    }
}
