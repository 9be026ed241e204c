//! Deterministic mock provider — no network, used in tests and local dev.

use crate::client::{ClassifierClient, ClassifierOutcome, CompletionParams, GenerativeClient, GenerativeOutcome};
use anyhow::Result;
use async_trait::async_trait;

const LABELS: [&str; 4] = ["happy", "calm", "neutral", "excited"];

#[derive(Debug, Clone, Default)]
pub struct MockClassifier;

#[async_trait]
impl ClassifierClient for MockClassifier {
    async fn classify(&self, prompt: &str, _params: CompletionParams) -> Result<ClassifierOutcome> {
        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
        let idx = prompt.bytes().map(|b| b as usize).sum::<usize>() % LABELS.len();
        Ok(ClassifierOutcome {
            label: LABELS[idx].to_string(),
            confidence: 0.75,
            tokens_in: (prompt.len() / 4).max(1) as u64,
            tokens_out: 4,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockGenerative;

#[async_trait]
impl GenerativeClient for MockGenerative {
    async fn generate(&self, _system: &str, prompt: &str, _params: CompletionParams) -> Result<GenerativeOutcome> {
        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
        Ok(GenerativeOutcome {
            text: format!("(mock) {}", prompt.chars().take(80).collect::<String>()),
            tokens_in: (prompt.len() / 4).max(1) as u64,
            tokens_out: 16,
        })
    }
}
