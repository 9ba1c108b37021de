use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    pub triage: TriageConfig,
    pub advisory: AdvisoryConfig,
    pub notify: NotifyConfig,
    pub store: StoreConfig,
    pub gateway: GatewayConfig,
}

impl VigilConfig {
    /// Load config from a TOML file, falling back to defaults for missing
    /// fields. After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: VigilConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if the file doesn't exist, return defaults
    /// with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("VIGIL_DB_PATH") {
            self.store.db_path = Some(v);
        }
        if let Ok(v) = std::env::var("VIGIL_WEBHOOK_URL") {
            self.notify.webhook_url = Some(v);
        }
        if let Ok(v) = std::env::var("VIGIL_ADVISORY_PROVIDER") {
            self.advisory.provider = v;
        }
        if let Ok(v) = std::env::var("VIGIL_ADVISORY_BASE_URL") {
            self.advisory.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("VIGIL_GATEWAY_PORT") {
            if let Ok(n) = v.parse() {
                self.gateway.port = n;
            }
        }
        if let Ok(v) = std::env::var("VIGIL_PROFILE_POLICY") {
            match v.to_ascii_lowercase().as_str() {
                "reject" => self.triage.missing_profile_policy = MissingProfilePolicy::Reject,
                "stub" => self.triage.missing_profile_policy = MissingProfilePolicy::Stub,
                other => tracing::warn!("Unknown VIGIL_PROFILE_POLICY '{}', keeping config value", other),
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

/// What to do when a subject has no profile at sync time. Both behaviors are
/// in active use across deployments, so this is a deployment choice, not a
/// hard-coded one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingProfilePolicy {
    /// Fail the sync (profile-first deployments).
    #[default]
    Reject,
    /// Proceed with a conservative stub profile (kiosk-style deployments).
    Stub,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Consecutive GREEN syncs required before an episode is cleared.
    pub green_clear_threshold: u32,
    /// Minimum seconds between advisory regenerations while YELLOW.
    pub advisory_cooldown_secs: u64,
    /// Minimum sample batch length accepted at the ingress.
    pub min_batch_len: usize,
    /// Trailing moving-average window for rate smoothing.
    pub smoothing_window: usize,
    pub missing_profile_policy: MissingProfilePolicy,
    /// Upper bound on an awaited advisory generation call.
    pub advisory_timeout_secs: u64,
    /// Upper bound on a detached notification dispatch.
    pub notify_timeout_secs: u64,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            green_clear_threshold: 3,
            advisory_cooldown_secs: 300,
            min_batch_len: 30,
            smoothing_window: 5,
            missing_profile_policy: MissingProfilePolicy::Reject,
            advisory_timeout_secs: 10,
            notify_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    /// "mock" or "http".
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "llama3.1".to_string(),
            base_url: None,
            max_tokens: 256,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// When set, alerts are POSTed here; otherwise they are logged only.
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path. None means in-memory stores (dev/test).
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
