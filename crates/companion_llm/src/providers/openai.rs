//! OpenAI-shaped Chat Completions client.

use crate::client::{ClassifierClient, ClassifierOutcome, CompletionParams, GenerativeClient, GenerativeOutcome};
use crate::retry::{with_retry, RetryConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(model: &str, base_url: Option<&str>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?;
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            api_key,
            base_url: base_url.unwrap_or("https://api.openai.com/v1").trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    async fn complete(&self, system: &str, user: &str, params: CompletionParams) -> Result<(String, u64, u64)> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        let retry_config = RetryConfig::default();
        let response = with_retry(&retry_config, "openai", || async {
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(anyhow::Error::from)
        })
        .await?;

        let parsed: ChatResponse = response.json().await.context("failed to parse openai response")?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        let (tokens_in, tokens_out) = parsed
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));
        Ok((text, tokens_in, tokens_out))
    }
}

#[async_trait]
impl ClassifierClient for OpenAiClient {
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
impl GenerativeClient for OpenAiClient {
    async fn generate(&self, system: &str, prompt: &str, params: CompletionParams) -> Result<GenerativeOutcome> {
        let (text, tokens_in, tokens_out) = self.complete(system, prompt, params).await?;
        Ok(GenerativeOutcome { text, tokens_in, tokens_out })
    }
}
