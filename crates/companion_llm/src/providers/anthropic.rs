//! Anthropic Messages API client.

use crate::client::{ClassifierClient, ClassifierOutcome, CompletionParams, GenerativeClient, GenerativeOutcome};
use crate::retry::{with_retry, RetryConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<RequestMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(model: &str, base_url: Option<&str>) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").context("ANTHROPIC_API_KEY not set")?;
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            api_key,
            base_url: base_url.unwrap_or("https://api.anthropic.com").trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    async fn complete(&self, system: &str, user: &str, params: CompletionParams) -> Result<(String, u64, u64)> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: &self.model,
            system,
            messages: vec![RequestMessage { role: "user", content: user }],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        let retry_config = RetryConfig::default();
        let response = with_retry(&retry_config, "anthropic", || async {
            self.client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&body)
                .send()
                .await
                .map_err(anyhow::Error::from)
        })
        .await?;

        let parsed: MessagesResponse = response.json().await.context("failed to parse anthropic response")?;
        let text = parsed.content.into_iter().map(|b| b.text).collect::<Vec<_>>().join("");
        let (tokens_in, tokens_out) = parsed
            .usage
            .map(|u| (u.input_tokens, u.output_tokens))
            .unwrap_or((0, 0));
        Ok((text, tokens_in, tokens_out))
    }
}

#[async_trait]
impl ClassifierClient for AnthropicClient {
    async fn classify(&self, prompt: &str, params: CompletionParams) -> Result<ClassifierOutcome> {
        let system = "Respond with exactly one lowercase word naming the player's emotion. Nothing else.";
        let (text, tokens_in, tokens_out) = self.complete(system, prompt, params).await?;
        Ok(ClassifierOutcome {
            label: text.trim().to_lowercase(),
            confidence: 0.8,
            tokens_in,
            tokens_out,
        })
    }
}

#[async_trait]
impl GenerativeClient for AnthropicClient {
    async fn generate(&self, system: &str, prompt: &str, params: CompletionParams) -> Result<GenerativeOutcome> {
        let (text, tokens_in, tokens_out) = self.complete(system, prompt, params).await?;
        Ok(GenerativeOutcome { text, tokens_in, tokens_out })
    }
}
