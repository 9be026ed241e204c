pub mod client;
pub mod pricing;
pub mod providers;
pub mod retry;

pub use client::{ClassifierClient, ClassifierOutcome, CompletionParams, GenerativeClient, GenerativeOutcome};

use companion_core::config::LlmConfig;
use providers::{anthropic::AnthropicClient, mock::MockClassifier, mock::MockGenerative, openai::OpenAiClient};
use std::sync::Arc;

/// Build the classifier backend named by `config.provider`, falling back to
/// the mock provider (and a warning) if the real provider can't be
/// constructed — typically a missing API key in a dev environment.
pub fn build_classifier(config: &LlmConfig) -> Arc<dyn ClassifierClient> {
    match config.provider.as_str() {
        "anthropic" => match AnthropicClient::new(&config.model, config.base_url.as_deref()) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                tracing::warn!("anthropic classifier unavailable, falling back to mock: {}", e);
                Arc::new(MockClassifier)
            }
        },
        "openai" => match OpenAiClient::new(&config.model, config.base_url.as_deref()) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                tracing::warn!("openai classifier unavailable, falling back to mock: {}", e);
                Arc::new(MockClassifier)
            }
        },
        _ => Arc::new(MockClassifier),
    }
}

pub fn build_generative(config: &LlmConfig) -> Arc<dyn GenerativeClient> {
    match config.provider.as_str() {
        "anthropic" => match AnthropicClient::new(&config.model, config.base_url.as_deref()) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                tracing::warn!("anthropic generative client unavailable, falling back to mock: {}", e);
                Arc::new(MockGenerative)
            }
        },
        "openai" => match OpenAiClient::new(&config.model, config.base_url.as_deref()) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                tracing::warn!("openai generative client unavailable, falling back to mock: {}", e);
                Arc::new(MockGenerative)
            }
        },
        _ => Arc::new(MockGenerative),
    }
}
