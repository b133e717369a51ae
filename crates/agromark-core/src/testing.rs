//! Deterministic stand-ins for the hosted model, for tests and demos.
//!
//! - [`ScriptedModel`] answers each of the three prompt kinds with a fixed
//!   reply (or error) and records every call.
//! - [`KeywordEmbedder`] embeds text as keyword counts over a small
//!   vocabulary, so similarity is predictable without a network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::completion::CompletionModel;
use crate::embedding::Embedder;

/// Which of the agent's prompts a completion call carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decision,
    Sql,
    Answer,
    Other,
}

/// Classify a prompt by the section headers the prompt builders emit.
pub fn stage_of(prompt: &str) -> Stage {
    if prompt.contains("**SQL Gerado:**") {
        Stage::Sql
    } else if prompt.contains("**Resposta do Mark:**") {
        Stage::Answer
    } else if prompt.contains("**PERGUNTA ATUAL DO USUÁRIO:**") {
        Stage::Decision
    } else {
        Stage::Other
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

/// A completion model with one canned reply per [`Stage`].
#[derive(Debug)]
pub struct ScriptedModel {
    replies: Vec<(Stage, Reply)>,
    calls: Mutex<Vec<(Stage, String)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            replies: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn set(mut self, stage: Stage, reply: Reply) -> Self {
        self.replies.retain(|(s, _)| *s != stage);
        self.replies.push((stage, reply));
        self
    }

    pub fn on_decision(self, text: impl Into<String>) -> Self {
        self.set(Stage::Decision, Reply::Text(text.into()))
    }

    pub fn on_sql(self, text: impl Into<String>) -> Self {
        self.set(Stage::Sql, Reply::Text(text.into()))
    }

    pub fn on_answer(self, text: impl Into<String>) -> Self {
        self.set(Stage::Answer, Reply::Text(text.into()))
    }

    /// Make calls at `stage` fail with `message`.
    pub fn fail_on(self, stage: Stage, message: impl Into<String>) -> Self {
        self.set(stage, Reply::Fail(message.into()))
    }

    /// Stages called so far, in order.
    pub fn stages(&self) -> Vec<Stage> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(s, _)| *s)
            .collect()
    }

    /// Prompts sent at `stage`, in order.
    pub fn prompts(&self, stage: Stage) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(s, _)| *s == stage)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let stage = stage_of(prompt);
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((stage, prompt.to_string()));

        match self.replies.iter().find(|(s, _)| *s == stage) {
            Some((_, Reply::Text(text))) => Ok(text.clone()),
            Some((_, Reply::Fail(message))) => bail!("{}", message),
            None => bail!("no scripted reply for {:?} prompt", stage),
        }
    }
}

/// Embeds text as per-keyword occurrence counts (case-insensitive).
#[derive(Debug)]
pub struct KeywordEmbedder {
    vocabulary: Vec<String>,
    batch_calls: AtomicUsize,
    query_calls: AtomicUsize,
    fail: bool,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&str]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|w| w.to_lowercase()).collect(),
            batch_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    /// An embedder whose every call errors.
    pub fn failing() -> Self {
        let mut embedder = Self::new(&[]);
        embedder.fail = true;
        embedder
    }

    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        self.vocabulary
            .iter()
            .map(|word| text.matches(word.as_str()).count() as f32)
            .collect()
    }

    /// Number of `embed_documents` calls.
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    /// Number of `embed_query` calls.
    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword"
    }

    fn dims(&self) -> usize {
        self.vocabulary.len()
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("embedding service unavailable");
        }
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("embedding service unavailable");
        }
        Ok(self.vectorize(text))
    }
}
