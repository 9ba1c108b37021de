//! HTTP advisor — calls an OpenAI-compatible chat completion endpoint.
//!
//! Works against Ollama's `/v1` surface out of the box; any backend that
//! speaks the same schema will do.

use crate::retry::{with_retry, RetryConfig};
use crate::advisory_prompt;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use vigil_core::{AdvisoryContext, AdvisoryGenerator};

#[derive(Debug, Clone)]
pub struct HttpAdvisor {
    client: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    retry: RetryConfig,
}

impl HttpAdvisor {
    pub fn new(base_url: Option<&str>, model: &str, max_tokens: u32) -> Result<Self> {
        let base_url = base_url
            .map(str::to_string)
            .or_else(|| std::env::var("VIGIL_ADVISORY_BASE_URL").ok())
            .unwrap_or_else(|| "http://localhost:11434/v1".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .context("Failed to build HTTP client")?,
            base_url,
            model: model.to_string(),
            max_tokens,
            retry: RetryConfig::default(),
        })
    }
}

#[async_trait]
impl AdvisoryGenerator for HttpAdvisor {
    async fn generate(&self, ctx: &AdvisoryContext) -> Result<String> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": advisory_prompt(ctx)}
            ],
            "max_tokens": self.max_tokens,
            "temperature": 0.4,
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = with_retry(&self.retry, || async {
            self.client
                .post(&url)
                .json(&payload)
                .send()
                .await
                .context("advisory request failed")
        })
        .await?;

        let body: Value = response
            .json()
            .await
            .context("Failed to parse advisory response")?;
        let text = body["choices"][0]["message"]["content"]
            .as_str()
            .context("advisory response had no content")?
            .trim()
            .to_string();

        if text.is_empty() {
            anyhow::bail!("advisory backend returned empty text");
        }
        tracing::debug!(subject_id = %ctx.subject_id, "advisory generated");
        Ok(text)
    }
}
