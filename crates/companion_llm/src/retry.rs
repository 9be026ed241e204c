//! Retry logic with exponential backoff for HTTP calls to classifier/generative backends.
//!
//! Retries transient failures (429, 5xx, timeouts). Never retries other 4xx
//! responses, to avoid double-billing a paid call that was rejected outright.

use anyhow::Result;
use reqwest::{Response, StatusCode};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

/// Call `operation` until it succeeds, hits a non-retryable status, or
/// `max_attempts` is exhausted.
pub async fn with_retry<F, Fut>(config: &RetryConfig, provider_name: &str, operation: F) -> Result<Response>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Response>>,
{
    let mut delay = config.initial_delay;
    let mut last_error = None;

    for attempt in 1..=config.max_attempts {
        match operation().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                if !is_retryable_status(status) {
                    let body = response.text().await.unwrap_or_default();
                    anyhow::bail!("{} error ({}): {}", provider_name, status, body);
                }
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(
                    "{} returned {} on attempt {}/{}: {}",
                    provider_name,
                    status,
                    attempt,
                    config.max_attempts,
                    body.chars().take(200).collect::<String>()
                );
                last_error = Some(format!("{} ({}): {}", provider_name, status, body));
            }
            Err(e) => {
                tracing::warn!("{} network error on attempt {}/{}: {}", provider_name, attempt, config.max_attempts, e);
                last_error = Some(format!("{}: {}", provider_name, e));
            }
        }

        if attempt < config.max_attempts {
            tokio::time::sleep(delay).await;
            delay = Duration::from_secs_f64((delay.as_secs_f64() * config.backoff_factor).min(config.max_delay.as_secs_f64()));
        }
    }

    anyhow::bail!(
        "{} retries exhausted: {}",
        provider_name,
        last_error.unwrap_or_else(|| "unknown".to_string())
    )
}
