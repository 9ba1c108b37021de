//! Notification dispatchers.
//!
//! The engine detaches dispatch and records failures; these implementations
//! only have to deliver (or honestly fail). SMS/voice/push fan-out lives
//! behind the webhook.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use vigil_core::{EmergencyAlert, NotificationDispatcher};

/// Logs the alert and succeeds. For dev deployments without a provider.
#[derive(Debug, Clone, Default)]
pub struct LogDispatcher;

impl LogDispatcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send(&self, alert: &EmergencyAlert) -> Result<()> {
        tracing::info!(
            alert_id = %alert.alert_id,
            subject_id = %alert.subject_id,
            contact = %alert.contact_address,
            summary = %alert.vitals_summary,
            "EMERGENCY ALERT (log dispatcher, not delivered anywhere)"
        );
        Ok(())
    }
}

/// POSTs the alert to a configured webhook. Non-2xx responses and missing
/// contact addresses are errors; the engine records them on the episode.
#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    client: Client,
    url: String,
}

impl WebhookDispatcher {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .context("Failed to build HTTP client")?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    async fn send(&self, alert: &EmergencyAlert) -> Result<()> {
        if alert.contact_address.is_empty() {
            anyhow::bail!("no emergency contact address on file");
        }

        let payload = json!({
            "alert_id": alert.alert_id,
            "subject_id": alert.subject_id,
            "contact_address": alert.contact_address,
            "vitals_summary": alert.vitals_summary,
            "location": alert.location,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .context("notification webhook unreachable")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("notification webhook returned {}: {}", status, body);
        }
        Ok(())
    }
}
