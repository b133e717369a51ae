//! Completion model clients.
//!
//! | Provider | Endpoint |
//! |----------|----------|
//! | `gemini` | `POST {base}/models/{model}:generateContent` |
//! | `openai` | `POST {base}/chat/completions` (any OpenAI-compatible server) |
//! | `ollama` | `POST {base}/api/generate` with `stream: false` |
//! | `disabled` | always errors |
//!
//! Sampling parameters come from `[llm]`. Gemini requests set every safety
//! category to `BLOCK_NONE`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use agromark_core::completion::CompletionModel;

use crate::config::LlmConfig;
use crate::embedding::{GEMINI_BASE_URL, OLLAMA_BASE_URL, OPENAI_BASE_URL};
use crate::http;

const GEMINI_SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Instantiate the completion model named by `config.provider`.
pub fn create_model(config: &LlmConfig) -> Result<Arc<dyn CompletionModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledModel)),
        "gemini" => Ok(Arc::new(GeminiModel::new(config)?)),
        "openai" => Ok(Arc::new(OpenAiModel::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaModel::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

/// Whether `config` names a provider whose credentials are present.
///
/// Local check only; no request is made.
pub fn credentials_present(config: &LlmConfig) -> bool {
    match config.provider.as_str() {
        "gemini" => std::env::var("GEMINI_API_KEY").is_ok(),
        "openai" => std::env::var("OPENAI_API_KEY").is_ok(),
        "ollama" => true,
        _ => false,
    }
}

fn required_model(config: &LlmConfig) -> Result<String> {
    config
        .model
        .clone()
        .ok_or_else(|| anyhow::anyhow!("llm.model required for {} provider", config.provider))
}

// ============ Disabled ============

pub struct DisabledModel;

#[async_trait]
impl CompletionModel for DisabledModel {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        bail!("LLM provider is disabled")
    }
}

// ============ Gemini ============

/// Gemini `generateContent` client. Requires `GEMINI_API_KEY`.
pub struct GeminiModel {
    model: String,
    url: String,
    api_key: String,
    generation_config: serde_json::Value,
    max_retries: u32,
    client: reqwest::Client,
}

impl GeminiModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = required_model(config)?;
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))?;
        let base = config.base_url.as_deref().unwrap_or(GEMINI_BASE_URL);

        Ok(Self {
            url: format!(
                "{}/models/{}:generateContent",
                base.trim_end_matches('/'),
                model
            ),
            model,
            api_key,
            generation_config: serde_json::json!({
                "temperature": config.temperature,
                "topK": config.top_k,
                "topP": config.top_p,
                "maxOutputTokens": config.max_output_tokens,
            }),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiPromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

/// Concatenate the text parts of the first candidate.
fn parse_gemini_response(json: serde_json::Value) -> Result<String> {
    let response: GeminiResponse =
        serde_json::from_value(json).context("failed to decode Gemini response")?;

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        bail!("Gemini blocked the prompt: {}", reason);
    }

    let candidate = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or_else(|| anyhow::anyhow!("missing candidates in Gemini response"))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        bail!(
            "missing text in Gemini response (finishReason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        );
    }
    Ok(text)
}

#[async_trait]
impl CompletionModel for GeminiModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let safety: Vec<serde_json::Value> = GEMINI_SAFETY_CATEGORIES
            .iter()
            .map(|category| serde_json::json!({ "category": category, "threshold": "BLOCK_NONE" }))
            .collect();
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": self.generation_config,
            "safetySettings": safety,
        });

        let json = http::send_json("Gemini", self.max_retries, || {
            self.client
                .post(&self.url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        })
        .await?;

        parse_gemini_response(json)
    }
}

// ============ OpenAI-compatible ============

/// Chat-completions client for OpenAI and compatible servers.
/// Requires `OPENAI_API_KEY`.
pub struct OpenAiModel {
    model: String,
    url: String,
    api_key: String,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAiModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = required_model(config)?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let base = config.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);

        Ok(Self {
            model,
            url: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key,
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_output_tokens,
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

fn parse_chat_response(json: serde_json::Value) -> Result<String> {
    let response: ChatResponse =
        serde_json::from_value(json).context("failed to decode OpenAI response")?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow::anyhow!("missing content in OpenAI response"))
}

#[async_trait]
impl CompletionModel for OpenAiModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "top_p": self.top_p,
            "max_tokens": self.max_tokens,
        });

        let json = http::send_json("OpenAI", self.max_retries, || {
            self.client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;

        parse_chat_response(json)
    }
}

// ============ Ollama ============

/// Local Ollama `/api/generate` client.
pub struct OllamaModel {
    model: String,
    url: String,
    options: serde_json::Value,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = required_model(config)?;
        let base = config.base_url.as_deref().unwrap_or(OLLAMA_BASE_URL);

        Ok(Self {
            model,
            url: format!("{}/api/generate", base.trim_end_matches('/')),
            options: serde_json::json!({
                "temperature": config.temperature,
                "top_p": config.top_p,
                "top_k": config.top_k,
                "num_predict": config.max_output_tokens,
            }),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[async_trait]
impl CompletionModel for OllamaModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": self.options,
        });

        let json = http::send_json("Ollama", self.max_retries, || {
            self.client.post(&self.url).json(&body)
        })
        .await?;

        let response: OllamaGenerateResponse =
            serde_json::from_value(json).context("failed to decode Ollama response")?;
        Ok(response.response)
    }
}
