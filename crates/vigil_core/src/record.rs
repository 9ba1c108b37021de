//! Persisted episode state and status reporting types.

use serde::{Deserialize, Serialize};

/// Discrete risk level, ordered by severity (GREEN < YELLOW < RED).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    #[default]
    Green,
    Yellow,
    Red,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Green => "GREEN",
            RiskLevel::Yellow => "YELLOW",
            RiskLevel::Red => "RED",
        };
        f.write_str(s)
    }
}

/// The persisted per-subject unit of state, one per subject id.
///
/// Created lazily on first sync (default GREEN, counters zero), updated
/// atomically on every subsequent sync, never deleted by this subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeRecord {
    /// Current classified level.
    pub status: RiskLevel,
    /// Last server-derived variability metric (authoritative).
    pub variability_ms: f64,
    /// Caller-supplied cross-check value. Diagnostics only, except as the
    /// fallback when the authoritative computation fails.
    pub variability_client_ms: f64,
    /// True once a RED-triggered notification has been dispatched for the
    /// current episode. Latches duplicate dispatch off.
    pub notified: bool,
    /// Most recently generated advisory; empty when no episode is active.
    pub advisory_text: String,
    /// Monotonic clock seconds of the last advisory generation. Zero means
    /// never generated (or cleared by an episode reset).
    pub advisory_generated_at: u64,
    /// Consecutive GREEN classifications; drives episode-clearing hysteresis.
    pub consecutive_green: u32,
    /// Last notification dispatch failure. Retained only while RED.
    pub notification_failure: Option<String>,
    /// Latest observed activity flag (exercise etc.), not versioned.
    pub is_active_context: bool,
    /// Wall-clock stamp of the last sync, for diagnostics only. All timing
    /// decisions use the monotonic clock fields above.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Default for EpisodeRecord {
    fn default() -> Self {
        Self {
            status: RiskLevel::Green,
            variability_ms: 0.0,
            variability_client_ms: 0.0,
            notified: false,
            advisory_text: String::new(),
            advisory_generated_at: 0,
            consecutive_green: 0,
            notification_failure: None,
            is_active_context: false,
            updated_at: chrono::DateTime::<chrono::Utc>::MIN_UTC,
        }
    }
}

/// UI hint derived purely from current status and context flag.
/// An active context takes precedence over status-driven hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UiAction {
    ExerciseMode,
    PassiveMonitoring,
    PromptRest,
    CallEmergency,
}

impl UiAction {
    pub fn derive(status: RiskLevel, is_active_context: bool) -> Self {
        if is_active_context {
            return UiAction::ExerciseMode;
        }
        match status {
            RiskLevel::Green => UiAction::PassiveMonitoring,
            RiskLevel::Yellow => UiAction::PromptRest,
            RiskLevel::Red => UiAction::CallEmergency,
        }
    }
}

/// Snapshot returned by the status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: RiskLevel,
    pub advisory: String,
    pub ui_action: UiAction,
    pub notification_failure: Option<String>,
    pub variability_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_severity_order() {
        assert!(RiskLevel::Green < RiskLevel::Yellow);
        assert!(RiskLevel::Yellow < RiskLevel::Red);
    }

    #[test]
    fn risk_level_wire_form() {
        assert_eq!(serde_json::to_string(&RiskLevel::Red).unwrap(), "\"RED\"");
        let parsed: RiskLevel = serde_json::from_str("\"YELLOW\"").unwrap();
        assert_eq!(parsed, RiskLevel::Yellow);
    }

    #[test]
    fn fresh_record_is_green_and_quiet() {
        let rec = EpisodeRecord::default();
        assert_eq!(rec.status, RiskLevel::Green);
        assert!(!rec.notified);
        assert!(rec.advisory_text.is_empty());
        assert_eq!(rec.consecutive_green, 0);
        assert!(rec.notification_failure.is_none());
    }

    #[test]
    fn record_roundtrips_through_json() {
        let rec = EpisodeRecord {
            status: RiskLevel::Red,
            variability_ms: 12.5,
            notified: true,
            advisory_text: "seek help".into(),
            advisory_generated_at: 42,
            notification_failure: Some("timeout".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&rec).unwrap();
        let back: EpisodeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn ui_action_active_context_wins() {
        assert_eq!(
            UiAction::derive(RiskLevel::Red, true),
            UiAction::ExerciseMode
        );
        assert_eq!(
            UiAction::derive(RiskLevel::Green, false),
            UiAction::PassiveMonitoring
        );
        assert_eq!(
            UiAction::derive(RiskLevel::Yellow, false),
            UiAction::PromptRest
        );
        assert_eq!(
            UiAction::derive(RiskLevel::Red, false),
            UiAction::CallEmergency
        );
    }
}
