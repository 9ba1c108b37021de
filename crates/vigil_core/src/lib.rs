pub mod clock;
pub mod config;
pub mod record;
pub mod subject;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{MissingProfilePolicy, TriageConfig, VigilConfig};
pub use record::{EpisodeRecord, RiskLevel, StatusReport, UiAction};
pub use subject::{AdvisoryContext, EmergencyAlert, SubjectProfile};

use async_trait::async_trait;

/// Keyed store for per-subject episode records.
///
/// Implementations must guarantee per-key atomicity of `put`: a write either
/// lands in full or not at all. Serialization of read-modify-write sequences
/// is the caller's job (the triage engine holds a per-subject lock).
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, subject_id: &str) -> anyhow::Result<Option<EpisodeRecord>>;
    async fn put(&self, subject_id: &str, record: &EpisodeRecord) -> anyhow::Result<()>;
}

/// Read-only access to subject profiles (name, contact, baseline score).
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, subject_id: &str) -> anyhow::Result<Option<SubjectProfile>>;
}

/// Produces advisory text for an elevated-risk subject.
///
/// May fail; the engine treats failure as a logged degradation, never as a
/// sync failure.
#[async_trait]
pub trait AdvisoryGenerator: Send + Sync {
    async fn generate(&self, ctx: &AdvisoryContext) -> anyhow::Result<String>;
}

/// Delivers an emergency alert to the subject's contact (SMS/voice/push
/// fan-out lives behind this trait). Failure is recorded, not raised.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, alert: &EmergencyAlert) -> anyhow::Result<()>;
}
