//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/agromark.sqlite"
//!
//! [llm]
//! provider = "gemini"
//! model = "gemini-2.5-flash"
//!
//! [embedding]
//! provider = "gemini"
//! model = "text-embedding-004"
//! dims = 768
//!
//! [agent]
//! cache_ttl_secs = 300
//! top_k = 3
//!
//! [server]
//! bind = "127.0.0.1:5000"
//! ```
//!
//! API keys never live in the file: Gemini reads `GEMINI_API_KEY`, the
//! OpenAI-compatible clients read `OPENAI_API_KEY`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const PROVIDERS: &[&str] = &["gemini", "openai", "ollama", "disabled"];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_llm_timeout_secs(),
            max_retries: 0,
        }
    }
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_top_p() -> f32 {
    0.8
}
fn default_top_k() -> u32 {
    1
}
fn default_max_output_tokens() -> u32 {
    8192
}
fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            base_url: None,
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout_secs(),
            max_retries: 0,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_batch_size() -> usize {
    100
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_agent_top_k")]
    pub top_k: usize,
    #[serde(default = "default_true")]
    pub read_only_sql: bool,
    #[serde(default)]
    pub strict_decisions: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            top_k: default_agent_top_k(),
            read_only_sql: true,
            strict_decisions: false,
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_agent_top_k() -> usize {
    3
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

impl Config {
    /// Disabled providers, default agent settings, database under `./data`.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/agromark.sqlite"),
            },
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            agent: AgentConfig::default(),
            server: ServerConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (section, provider) in [
            ("llm", self.llm.provider.as_str()),
            ("embedding", self.embedding.provider.as_str()),
        ] {
            if !PROVIDERS.contains(&provider) {
                anyhow::bail!(
                    "Unknown {} provider: '{}'. Must be one of: {}.",
                    section,
                    provider,
                    PROVIDERS.join(", ")
                );
            }
        }

        if self.llm.is_enabled() && self.llm.model.is_none() {
            anyhow::bail!(
                "llm.model must be specified when provider is '{}'",
                self.llm.provider
            );
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
        }
        if self.llm.max_output_tokens == 0 {
            anyhow::bail!("llm.max_output_tokens must be > 0");
        }

        if self.embedding.is_enabled() {
            if self.embedding.dims.is_none() || self.embedding.dims == Some(0) {
                anyhow::bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    self.embedding.provider
                );
            }
            if self.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    self.embedding.provider
                );
            }
        }
        if self.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be > 0");
        }

        if self.agent.top_k < 1 {
            anyhow::bail!("agent.top_k must be >= 1");
        }
        if self.agent.cache_ttl_secs == 0 {
            anyhow::bail!("agent.cache_ttl_secs must be > 0");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
