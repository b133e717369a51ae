//! Text-completion model abstraction.
//!
//! Concrete clients (Gemini, OpenAI-compatible, Ollama) live in the
//! `agromark` app crate. The core only needs "prompt in, text out".

use anyhow::Result;
use async_trait::async_trait;

/// A hosted language model that turns one prompt into free text.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.5-flash"`).
    fn model_name(&self) -> &str;

    /// Submit a single prompt and return the raw response text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
