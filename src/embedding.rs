//! Embedding provider implementations.
//!
//! - **[`DisabledEmbedder`]**: returns errors; used when embeddings are not configured.
//! - **[`GeminiEmbedder`]**: `batchEmbedContents` for documents
//!   (`RETRIEVAL_DOCUMENT`) and `embedContent` for queries (`RETRIEVAL_QUERY`).
//! - **[`OpenAiEmbedder`]**: `POST /v1/embeddings`.
//! - **[`OllamaEmbedder`]**: a local Ollama instance's `/api/embed` endpoint.
//!
//! Use [`create_embedder`] to pick one from the `[embedding]` config section.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use agromark_core::embedding::Embedder;

use crate::config::EmbeddingConfig;
use crate::http::{self, json_to_vector};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Instantiate the embedder named by `config.provider`.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "gemini" => Ok(Arc::new(GeminiEmbedder::new(config)?)),
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

fn required_model_and_dims(config: &EmbeddingConfig, provider: &str) -> Result<(String, usize)> {
    let model = config
        .model
        .clone()
        .ok_or_else(|| anyhow::anyhow!("embedding.model required for {} provider", provider))?;
    let dims = config
        .dims
        .ok_or_else(|| anyhow::anyhow!("embedding.dims required for {} provider", provider))?;
    Ok((model, dims))
}

// ============ Disabled ============

pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("Embedding provider is disabled")
    }
    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        bail!("Embedding provider is disabled")
    }
}

// ============ Gemini ============

/// Embedder backed by the Gemini embedding API.
///
/// Requires the `GEMINI_API_KEY` environment variable. Documents are sent
/// in chunks of `batch_size` (the API accepts at most 100 per call).
pub struct GeminiEmbedder {
    model: String,
    dims: usize,
    base_url: String,
    api_key: String,
    batch_size: usize,
    max_retries: u32,
    client: reqwest::Client,
}

impl GeminiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = required_model_and_dims(config, "Gemini")?;
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))?;

        Ok(Self {
            model,
            dims,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            api_key,
            batch_size: config.batch_size.min(100),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }

    fn model_path(&self) -> String {
        format!("models/{}", self.model)
    }

    fn url(&self, method: &str) -> String {
        format!(
            "{}/{}:{}",
            self.base_url.trim_end_matches('/'),
            self.model_path(),
            method
        )
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self.url("batchEmbedContents");
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let requests: Vec<serde_json::Value> = batch
                .iter()
                .map(|text| {
                    serde_json::json!({
                        "model": self.model_path(),
                        "content": { "parts": [{ "text": text }] },
                        "taskType": "RETRIEVAL_DOCUMENT",
                    })
                })
                .collect();
            let body = serde_json::json!({ "requests": requests });

            let json = http::send_json("Gemini", self.max_retries, || {
                self.client
                    .post(&url)
                    .header("x-goog-api-key", &self.api_key)
                    .json(&body)
            })
            .await?;

            let batch_vectors = parse_gemini_batch_response(&json)?;
            if batch_vectors.len() != batch.len() {
                bail!(
                    "Gemini returned {} embeddings for {} texts",
                    batch_vectors.len(),
                    batch.len()
                );
            }
            vectors.extend(batch_vectors);
        }

        tracing::debug!(documents = vectors.len(), model = %self.model, "embedded documents");
        Ok(vectors)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let url = self.url("embedContent");
        let body = serde_json::json!({
            "content": { "parts": [{ "text": text }] },
            "taskType": "RETRIEVAL_QUERY",
        });

        let json = http::send_json("Gemini", self.max_retries, || {
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        })
        .await?;

        parse_gemini_single_response(&json)
    }
}

fn parse_gemini_batch_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing embeddings array"))?;

    embeddings
        .iter()
        .map(|e| {
            e.get("values")
                .and_then(json_to_vector)
                .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing values"))
        })
        .collect()
}

fn parse_gemini_single_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    json.get("embedding")
        .and_then(|e| e.get("values"))
        .and_then(json_to_vector)
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing embedding.values"))
}

// ============ OpenAI ============

/// Embedder using the OpenAI (or compatible) embeddings API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiEmbedder {
    model: String,
    dims: usize,
    base_url: String,
    api_key: String,
    batch_size: usize,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = required_model_and_dims(config, "OpenAI")?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            model,
            dims,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            api_key,
            batch_size: config.batch_size,
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });

            let json = http::send_json("OpenAI", self.max_retries, || {
                self.client
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .json(&body)
            })
            .await?;

            vectors.extend(parse_openai_response(&json)?);
        }

        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: no embedding returned"))
    }
}

/// Extract `data[].embedding`, ordered by `index` when present.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let vector = item
            .get("embedding")
            .and_then(json_to_vector)
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing embedding"))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        indexed.push((index, vector));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama ============

/// Embedder using a local Ollama instance (`POST /api/embed`).
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = required_model_and_dims(config, "Ollama")?;
        Ok(Self {
            model,
            dims,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let json = http::send_json("Ollama", self.max_retries, || {
            self.client.post(&url).json(&body)
        })
        .await
        .map_err(|e| {
            anyhow::anyhow!("{} (is Ollama running at {}?)", e, self.base_url)
        })?;

        parse_ollama_response(&json)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: no embedding returned"))
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embeddings array"))?;

    embeddings
        .iter()
        .map(|e| {
            json_to_vector(e)
                .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: embedding is not an array"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_gemini_batch() {
        let body = json!({
            "embeddings": [
                { "values": [0.1, 0.2] },
                { "values": [0.3, 0.4] }
            ]
        });
        let vectors = parse_gemini_batch_response(&body).unwrap();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn test_parse_gemini_single() {
        let body = json!({ "embedding": { "values": [1.0, 0.0, -1.0] } });
        assert_eq!(parse_gemini_single_response(&body).unwrap(), vec![1.0, 0.0, -1.0]);
        assert!(parse_gemini_single_response(&json!({ "error": {} })).is_err());
    }

    #[test]
    fn test_parse_openai_respects_index() {
        let body = json!({
            "data": [
                { "index": 1, "embedding": [2.0] },
                { "index": 0, "embedding": [1.0] }
            ]
        });
        assert_eq!(parse_openai_response(&body).unwrap(), vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn test_parse_ollama() {
        let body = json!({ "embeddings": [[0.5, 0.5]] });
        assert_eq!(parse_ollama_response(&body).unwrap(), vec![vec![0.5, 0.5]]);
        assert!(parse_ollama_response(&json!({ "embeddings": ["x"] })).is_err());
    }

    #[tokio::test]
    async fn test_disabled_embedder_errors() {
        let embedder = create_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.model_name(), "disabled");
        let err = embedder.embed_query("diesel").await.unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }
}
