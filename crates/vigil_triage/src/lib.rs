//! # Vigil Triage
//!
//! The stateful heart of Vigil: converts noisy repeated vitals readings
//! into a discrete risk level and tracks an "episode" of elevated risk over
//! time, guaranteeing at-most-once emergency notification and rate-limited
//! advisory regeneration across a stream of sync calls that may arrive
//! concurrently.
//!
//! Two layers:
//! - [`classify`] — the pure multi-factor decision table;
//! - [`TriageEngine`] — the persisted per-subject state machine with
//!   hysteresis-gated episode reset and side-effect scheduling.

mod classify;
mod engine;

pub use classify::classify;
pub use engine::{
    SyncOutcome, SyncRequest, TriageEngine, TriageError, CRITICAL_ADVISORY, FALLBACK_ADVISORY,
};
