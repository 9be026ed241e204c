//! Provider-agnostic request/response shapes for the classifier and
//! generative backends.

use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 256,
            temperature: 0.7,
        }
    }
}

/// Raw label plus token usage. Mapping the label into the closed emotion
/// set and clamping confidence for out-of-set values happens in the caller.
#[derive(Debug, Clone)]
pub struct ClassifierOutcome {
    pub label: String,
    pub confidence: f32,
    pub tokens_in: u64,
    pub tokens_out: u64,
}

#[derive(Debug, Clone)]
pub struct GenerativeOutcome {
    pub text: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
}

#[async_trait]
pub trait ClassifierClient: Send + Sync {
    async fn classify(&self, prompt: &str, params: CompletionParams) -> Result<ClassifierOutcome>;
}

#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str, params: CompletionParams) -> Result<GenerativeOutcome>;
}
