//! Final answer synthesis.
//!
//! One completion call that turns retrieved context plus history into
//! Mark's reply. Grounding is a prompt-level instruction only; the reply
//! is returned as the model wrote it, trimmed.

use std::sync::Arc;

use crate::completion::CompletionModel;
use crate::error::AgentError;
use crate::models::ConversationTurn;
use crate::normalize::{context_to_prompt_json, ContextData};
use crate::prompts::answer_prompt;

pub struct AnswerSynthesizer {
    model: Arc<dyn CompletionModel>,
}

impl AnswerSynthesizer {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    pub async fn synthesize(
        &self,
        original_query: &str,
        context: &ContextData,
        history: &[ConversationTurn],
    ) -> Result<String, AgentError> {
        let context_json = context_to_prompt_json(context);
        let prompt = answer_prompt(original_query, &context_json, history);
        let reply = self
            .model
            .complete(&prompt)
            .await
            .map_err(AgentError::Model)?;
        Ok(reply.trim().to_string())
    }
}
