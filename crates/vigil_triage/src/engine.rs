//! The per-subject episode state machine.
//!
//! Each sync runs a read-decide-write sequence against the subject's
//! persisted `EpisodeRecord`, serialized by a per-subject lock so that two
//! concurrent syncs for the same subject can never interleave and lose an
//! update. Cross-subject syncs proceed in parallel.
//!
//! Side-effect scheduling rules:
//! - advisory generation (YELLOW) is awaited with a bounded timeout — its
//!   text is part of the sync response;
//! - notification dispatch (RED) is detached via `tokio::spawn` after the
//!   record is durably persisted; the caller never blocks on it, and a
//!   dispatch failure is written back into the record under the same
//!   subject lock.

use crate::classify::classify;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use vigil_core::{
    AdvisoryContext, AdvisoryGenerator, Clock, EmergencyAlert, EpisodeRecord, MissingProfilePolicy,
    NotificationDispatcher, ProfileStore, RecordStore, RiskLevel, StatusReport, SubjectProfile,
    TriageConfig, UiAction,
};

/// Fixed advisory installed on a RED classification. Severity outranks
/// personalization, so no generation call is made.
pub const CRITICAL_ADVISORY: &str =
    "Critical risk detected. Stop what you are doing, sit down, and call emergency services now.";

/// Installed on YELLOW only when generation failed and no advisory exists
/// yet. The cooldown stamp is not advanced for it, so the next sync retries.
pub const FALLBACK_ADVISORY: &str =
    "Your readings are elevated. Rest, hydrate, and re-check within the next few minutes.";

/// One vitals sync submission, already schema-validated by the ingress.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub subject_id: String,
    /// Raw rate samples, bpm. Ingress guarantees the configured minimum
    /// length; the signal processor defends its own preconditions anyway.
    pub samples: Vec<f64>,
    /// Caller-computed variability cross-check, ms.
    pub client_variability_ms: f64,
    /// Reading-scoped lifestyle score; falls back to the profile baseline.
    pub lifestyle_score: Option<u8>,
    pub is_active_context: bool,
    pub systolic: u16,
    pub diastolic: u16,
    pub location: Option<String>,
}

/// What the caller gets back synchronously.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub status: RiskLevel,
    pub advisory: String,
    pub variability_ms: f64,
    /// True when the authoritative variability computation failed and the
    /// client cross-check value was used instead.
    pub degraded: bool,
}

#[derive(Debug, Error)]
pub enum TriageError {
    /// Profile-first policy: the subject has no profile, the sync is refused.
    #[error("no profile for subject {subject_id}")]
    ProfileMissing { subject_id: String },
    /// Record or profile store unavailable. Fatal to the sync, retryable.
    #[error("store unavailable: {0}")]
    Persistence(anyhow::Error),
}

/// Per-subject mutual exclusion around the read-decide-write sequence.
///
/// Owned guards so the detached notification task can re-acquire the same
/// lock when it writes a dispatch failure back.
#[derive(Clone, Default)]
struct SubjectLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SubjectLocks {
    async fn acquire(&self, subject_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(subject_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub struct TriageEngine {
    records: Arc<dyn RecordStore>,
    profiles: Arc<dyn ProfileStore>,
    advisor: Arc<dyn AdvisoryGenerator>,
    notifier: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    config: TriageConfig,
    locks: SubjectLocks,
}

impl TriageEngine {
    pub fn new(
        records: Arc<dyn RecordStore>,
        profiles: Arc<dyn ProfileStore>,
        advisor: Arc<dyn AdvisoryGenerator>,
        notifier: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        config: TriageConfig,
    ) -> Self {
        Self {
            records,
            profiles,
            advisor,
            notifier,
            clock,
            config,
            locks: SubjectLocks::default(),
        }
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    /// Apply one vitals sync for a subject.
    ///
    /// The full read-decide-write sequence runs under the subject's lock.
    /// The record is persisted unconditionally before any notification is
    /// scheduled, so a persistence failure leaves no half-applied episode
    /// state and no stray side effects.
    pub async fn sync(&self, req: SyncRequest) -> Result<SyncOutcome, TriageError> {
        let _guard = self.locks.acquire(&req.subject_id).await;

        let profile = self.resolve_profile(&req.subject_id).await?;
        let mut record = self
            .records
            .get(&req.subject_id)
            .await
            .map_err(TriageError::Persistence)?
            .unwrap_or_default();

        // Authoritative variability, falling back to the caller's
        // cross-check value. Signal failure alone never aborts a sync.
        let (variability, degraded) =
            match vigil_signal::variability_ms(&req.samples, self.config.smoothing_window) {
                Ok(v) => (v, false),
                Err(e) => {
                    warn!(
                        subject_id = %req.subject_id,
                        error = %e,
                        fallback_ms = req.client_variability_ms,
                        "variability computation degraded, using client cross-check"
                    );
                    (req.client_variability_ms, true)
                }
            };

        let lifestyle = req.lifestyle_score.unwrap_or(profile.lifestyle_score);
        let status = classify(
            lifestyle,
            req.systolic,
            req.diastolic,
            variability,
            req.is_active_context,
        );
        let now = self.clock.now_secs();

        record.variability_ms = variability;
        record.variability_client_ms = req.client_variability_ms;
        record.is_active_context = req.is_active_context;

        let mut dispatch_alert = None;
        match status {
            RiskLevel::Yellow => {
                record.consecutive_green = 0;
                self.refresh_advisory(&mut record, &req, &profile, lifestyle, variability, now)
                    .await;
            }
            RiskLevel::Red => {
                record.consecutive_green = 0;
                record.advisory_text = CRITICAL_ADVISORY.to_string();
                if !record.notified {
                    record.notified = true;
                    dispatch_alert = Some(EmergencyAlert::new(
                        &req.subject_id,
                        &profile.contact_address,
                        vitals_summary(variability, req.systolic, req.diastolic),
                        req.location.clone(),
                    ));
                } else {
                    debug!(subject_id = %req.subject_id, "already notified for this episode");
                }
            }
            RiskLevel::Green => {
                record.consecutive_green += 1;
                if record.consecutive_green >= self.config.green_clear_threshold {
                    if record.notified || !record.advisory_text.is_empty() {
                        info!(
                            subject_id = %req.subject_id,
                            streak = record.consecutive_green,
                            "green streak reached threshold, episode cleared"
                        );
                    }
                    record.notified = false;
                    record.advisory_text.clear();
                    record.advisory_generated_at = 0;
                }
            }
        }

        // Dispatch failures are only meaningful while the episode is RED.
        if status != RiskLevel::Red {
            record.notification_failure = None;
        }

        record.status = status;
        record.updated_at = chrono::Utc::now();

        self.records
            .put(&req.subject_id, &record)
            .await
            .map_err(TriageError::Persistence)?;

        // Only after the durable write: fire-and-forget notification.
        if let Some(alert) = dispatch_alert {
            info!(
                subject_id = %req.subject_id,
                alert_id = %alert.alert_id,
                "scheduling emergency notification"
            );
            self.spawn_notification(alert);
        }

        Ok(SyncOutcome {
            status,
            advisory: record.advisory_text.clone(),
            variability_ms: variability,
            degraded,
        })
    }

    /// Current status snapshot. An absent record reads as a fresh GREEN one.
    pub async fn status(&self, subject_id: &str) -> Result<StatusReport, TriageError> {
        let record = self
            .records
            .get(subject_id)
            .await
            .map_err(TriageError::Persistence)?
            .unwrap_or_default();
        Ok(StatusReport {
            status: record.status,
            advisory: record.advisory_text.clone(),
            ui_action: UiAction::derive(record.status, record.is_active_context),
            notification_failure: record.notification_failure.clone(),
            variability_ms: record.variability_ms,
        })
    }

    async fn resolve_profile(&self, subject_id: &str) -> Result<SubjectProfile, TriageError> {
        match self
            .profiles
            .get(subject_id)
            .await
            .map_err(TriageError::Persistence)?
        {
            Some(profile) => Ok(profile),
            None => match self.config.missing_profile_policy {
                MissingProfilePolicy::Reject => Err(TriageError::ProfileMissing {
                    subject_id: subject_id.to_string(),
                }),
                MissingProfilePolicy::Stub => {
                    warn!(subject_id, "no profile on file, proceeding with conservative stub");
                    Ok(SubjectProfile::conservative_stub())
                }
            },
        }
    }

    /// Regenerate the advisory if the cooldown has elapsed (or none exists),
    /// otherwise leave text and stamp untouched. Generation failure is a
    /// logged degradation, never a sync failure; the stamp is not advanced
    /// for a failed attempt so the next sync retries immediately.
    async fn refresh_advisory(
        &self,
        record: &mut EpisodeRecord,
        req: &SyncRequest,
        profile: &SubjectProfile,
        lifestyle: u8,
        variability: f64,
        now: u64,
    ) {
        let elapsed = now.saturating_sub(record.advisory_generated_at);
        let due = record.advisory_text.is_empty()
            || record.advisory_generated_at == 0
            || elapsed > self.config.advisory_cooldown_secs;
        if !due {
            debug!(
                subject_id = %req.subject_id,
                elapsed,
                cooldown = self.config.advisory_cooldown_secs,
                "advisory still within cooldown, keeping existing text"
            );
            return;
        }

        let ctx = AdvisoryContext {
            subject_id: req.subject_id.clone(),
            name: profile.name.clone(),
            status: RiskLevel::Yellow,
            variability_ms: variability,
            systolic: req.systolic,
            diastolic: req.diastolic,
            lifestyle_score: lifestyle,
            medical_history: profile.medical_history.clone(),
        };
        let timeout = Duration::from_secs(self.config.advisory_timeout_secs);
        match tokio::time::timeout(timeout, self.advisor.generate(&ctx)).await {
            Ok(Ok(text)) => {
                record.advisory_text = text;
                record.advisory_generated_at = now;
            }
            Ok(Err(e)) => {
                warn!(subject_id = %req.subject_id, error = %e, "advisory generation failed");
                if record.advisory_text.is_empty() {
                    record.advisory_text = FALLBACK_ADVISORY.to_string();
                }
            }
            Err(_) => {
                warn!(
                    subject_id = %req.subject_id,
                    timeout_secs = self.config.advisory_timeout_secs,
                    "advisory generation timed out"
                );
                if record.advisory_text.is_empty() {
                    record.advisory_text = FALLBACK_ADVISORY.to_string();
                }
            }
        }
    }

    /// Detached dispatch. On failure or timeout the reason is written back
    /// into the subject's record under the subject lock, provided the
    /// episode is still RED by the time the write happens.
    fn spawn_notification(&self, alert: EmergencyAlert) {
        let notifier = Arc::clone(&self.notifier);
        let records = Arc::clone(&self.records);
        let locks = self.locks.clone();
        let timeout = Duration::from_secs(self.config.notify_timeout_secs);

        tokio::spawn(async move {
            let failure = match tokio::time::timeout(timeout, notifier.send(&alert)).await {
                Ok(Ok(())) => {
                    info!(
                        subject_id = %alert.subject_id,
                        alert_id = %alert.alert_id,
                        "emergency notification delivered"
                    );
                    None
                }
                Ok(Err(e)) => Some(e.to_string()),
                Err(_) => Some(format!(
                    "notification dispatch timed out after {}s",
                    timeout.as_secs()
                )),
            };

            let Some(reason) = failure else { return };
            warn!(
                subject_id = %alert.subject_id,
                alert_id = %alert.alert_id,
                reason = %reason,
                "notification dispatch failed"
            );

            let _guard = locks.acquire(&alert.subject_id).await;
            match records.get(&alert.subject_id).await {
                Ok(Some(mut record)) if record.status == RiskLevel::Red => {
                    record.notification_failure = Some(reason);
                    if let Err(e) = records.put(&alert.subject_id, &record).await {
                        warn!(
                            subject_id = %alert.subject_id,
                            error = %e,
                            "failed to record notification failure"
                        );
                    }
                }
                Ok(_) => {
                    // Episode already moved off RED; the failure is stale.
                }
                Err(e) => {
                    warn!(subject_id = %alert.subject_id, error = %e, "failure read-back failed");
                }
            }
        });
    }
}

fn vitals_summary(variability_ms: f64, systolic: u16, diastolic: u16) -> String {
    format!(
        "HRV {:.1} ms, blood pressure {}/{}",
        variability_ms, systolic, diastolic
    )
}
