use serde::{Deserialize, Serialize};
use vigil_core::{RiskLevel, StatusReport, UiAction};
use vigil_triage::{SyncOutcome, SyncRequest};

/// Inbound sync payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncBody {
    pub subject_id: String,
    /// Raw rate samples, bpm.
    pub samples: Vec<f64>,
    /// Caller-computed variability cross-check, ms.
    #[serde(default)]
    pub client_variability_ms: f64,
    #[serde(default)]
    pub lifestyle_score: Option<u8>,
    #[serde(default)]
    pub is_active_context: bool,
    pub systolic: u16,
    pub diastolic: u16,
    #[serde(default)]
    pub location: Option<String>,
}

impl SyncBody {
    pub fn into_request(self) -> SyncRequest {
        SyncRequest {
            subject_id: self.subject_id,
            samples: self.samples,
            client_variability_ms: self.client_variability_ms,
            lifestyle_score: self.lifestyle_score,
            is_active_context: self.is_active_context,
            systolic: self.systolic,
            diastolic: self.diastolic,
            location: self.location,
        }
    }
}

/// Synchronous sync response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub status: RiskLevel,
    pub advisory: String,
    pub variability_ms: f64,
    pub degraded: bool,
}

impl From<SyncOutcome> for SyncResponse {
    fn from(outcome: SyncOutcome) -> Self {
        Self {
            status: outcome.status,
            advisory: outcome.advisory,
            variability_ms: outcome.variability_ms,
            degraded: outcome.degraded,
        }
    }
}

/// Status query response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: RiskLevel,
    pub advisory: String,
    pub ui_action: UiAction,
    pub notification_failure: Option<String>,
    pub variability_ms: f64,
}

impl From<StatusReport> for StatusResponse {
    fn from(report: StatusReport) -> Self {
        Self {
            status: report.status,
            advisory: report.advisory,
            ui_action: report.ui_action,
            notification_failure: report.notification_failure,
            variability_ms: report.variability_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_body_defaults_optional_fields() {
        let json = r#"{
            "subject_id": "s1",
            "samples": [60.0, 61.0],
            "systolic": 120,
            "diastolic": 80
        }"#;
        let body: SyncBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.client_variability_ms, 0.0);
        assert!(body.lifestyle_score.is_none());
        assert!(!body.is_active_context);
        assert!(body.location.is_none());
    }

    #[test]
    fn status_response_wire_form() {
        let resp = StatusResponse {
            status: RiskLevel::Yellow,
            advisory: "rest".into(),
            ui_action: UiAction::PromptRest,
            notification_failure: None,
            variability_ms: 30.0,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "YELLOW");
        assert_eq!(json["ui_action"], "PROMPT_REST");
    }
}
