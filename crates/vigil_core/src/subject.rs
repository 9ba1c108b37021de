//! Subject profile and the payloads handed to external collaborators.

use crate::record::RiskLevel;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Read-only companion profile owned by the external profile store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectProfile {
    pub name: String,
    /// Emergency contact address (phone number, push token, etc.).
    pub contact_address: String,
    /// Baseline AHA-style lifestyle score, 0-100.
    pub lifestyle_score: u8,
    #[serde(default)]
    pub medical_history: Vec<String>,
}

impl SubjectProfile {
    /// Stand-in used when the deployment policy proceeds without a profile.
    ///
    /// Conservative: the sub-50 lifestyle score biases classification toward
    /// escalation, and the empty contact address makes any RED dispatch
    /// surface as a recorded failure rather than a silent success.
    pub fn conservative_stub() -> Self {
        Self {
            name: "unknown subject".to_string(),
            contact_address: String::new(),
            lifestyle_score: 40,
            medical_history: Vec::new(),
        }
    }
}

/// Context handed to the advisory generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryContext {
    pub subject_id: String,
    pub name: String,
    pub status: RiskLevel,
    pub variability_ms: f64,
    pub systolic: u16,
    pub diastolic: u16,
    pub lifestyle_score: u8,
    #[serde(default)]
    pub medical_history: Vec<String>,
}

/// Payload handed to the notification dispatcher on a RED transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub alert_id: Uuid,
    pub subject_id: String,
    pub contact_address: String,
    /// Human-readable vitals summary for the outbound message.
    pub vitals_summary: String,
    pub location: Option<String>,
}

impl EmergencyAlert {
    pub fn new(
        subject_id: &str,
        contact_address: &str,
        vitals_summary: String,
        location: Option<String>,
    ) -> Self {
        Self {
            alert_id: Uuid::new_v4(),
            subject_id: subject_id.to_string(),
            contact_address: contact_address.to_string(),
            vitals_summary,
            location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_profile_is_conservative() {
        let stub = SubjectProfile::conservative_stub();
        assert!(stub.lifestyle_score < 50);
        assert!(stub.contact_address.is_empty());
    }

    #[test]
    fn alerts_get_unique_ids() {
        let a = EmergencyAlert::new("s1", "+15550100", "hrv 12ms".into(), None);
        let b = EmergencyAlert::new("s1", "+15550100", "hrv 12ms".into(), None);
        assert_ne!(a.alert_id, b.alert_id);
    }
}
