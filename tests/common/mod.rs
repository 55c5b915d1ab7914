//! Deterministic in-process providers shared by integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use doclens::{DoclensError, DoclensResult, EmbeddingProvider, LanguageModel};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Letter-frequency embedding over a-z, with an optional delay and a
/// poison marker that makes embedding fail.
#[derive(Default)]
pub struct LetterEmbedder {
    pub calls: AtomicUsize,
    pub delay: Option<Duration>,
    pub poison: Option<&'static str>,
}

impl LetterEmbedder {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn poisoned(marker: &'static str) -> Self {
        Self {
            poison: Some(marker),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn letter_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; 26];
    for c in text.to_ascii_lowercase().chars() {
        if c.is_ascii_lowercase() {
            v[(c as u8 - b'a') as usize] += 1.0;
        }
    }
    // Keep every vector non-zero
    v[25] += 0.001;
    v
}

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    fn name(&self) -> &'static str {
        "letters"
    }

    async fn embed(&self, text: &str) -> DoclensResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(marker) = self.poison {
            if text.contains(marker) {
                return Err(DoclensError::Provider {
                    provider: "letters",
                    message: "model refused input".to_string(),
                });
            }
        }
        Ok(letter_vector(text))
    }
}

/// Returns a fixed vector per known text.
pub struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
}

impl TableEmbedder {
    pub fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(text, v)| (text.to_string(), v.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for TableEmbedder {
    fn name(&self) -> &'static str {
        "table"
    }

    async fn embed(&self, text: &str) -> DoclensResult<Vec<f32>> {
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| DoclensError::Embedding(format!("no vector for {text:?}")))
    }
}

/// Records prompts and answers with a fixed string.
#[derive(Default)]
pub struct ScriptedModel {
    pub prompts: Mutex<Vec<String>>,
    pub delay: Option<Duration>,
    pub answer: String,
}

impl ScriptedModel {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            answer: "late".to_string(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> DoclensResult<String> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.answer.clone())
    }
}
