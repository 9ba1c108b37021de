//! Multi-factor risk classification.
//!
//! Pure and deterministic: no side effects, no persistence access. The
//! episode state machine is the only caller; keeping this free of I/O is
//! what makes the decision table testable in isolation.

use vigil_core::RiskLevel;

/// Hypertensive crisis gate (AHA crisis thresholds).
const CRISIS_SYSTOLIC: u16 = 180;
const CRISIS_DIASTOLIC: u16 = 120;

/// Resting-state variability bands, in milliseconds.
const BAND_RED_MS: f64 = 20.0;
const BAND_YELLOW_MS: f64 = 40.0;

/// Classify one sync reading into a risk level.
///
/// Decision order, first match wins:
/// 1. Crisis gate: systolic >= 180 or diastolic >= 120 is RED even during
///    an active-context reading — the gate precedes context suppression.
/// 2. Active context (exercise etc.) suppresses everything below crisis to
///    GREEN; a variability dip during exertion is expected.
/// 3. Variability banding (<20 RED, <40 YELLOW), then blood pressure and
///    lifestyle escalate the band by one step.
pub fn classify(
    lifestyle_score: u8,
    systolic: u16,
    diastolic: u16,
    variability_ms: f64,
    is_active_context: bool,
) -> RiskLevel {
    if systolic >= CRISIS_SYSTOLIC || diastolic >= CRISIS_DIASTOLIC {
        return RiskLevel::Red;
    }
    if is_active_context {
        return RiskLevel::Green;
    }

    // A non-positive reading is the "no dispersion measured" sentinel
    // (fresh subjects and perfectly constant batches), not a pathological
    // near-zero HRV; it skips the banding and leaves BP/lifestyle to speak.
    let band = if variability_ms <= 0.0 {
        RiskLevel::Green
    } else if variability_ms < BAND_RED_MS {
        RiskLevel::Red
    } else if variability_ms < BAND_YELLOW_MS {
        RiskLevel::Yellow
    } else {
        RiskLevel::Green
    };

    match band {
        RiskLevel::Red => RiskLevel::Red,
        RiskLevel::Yellow => {
            if systolic >= 140 || diastolic >= 90 || lifestyle_score < 50 {
                RiskLevel::Red
            } else {
                RiskLevel::Yellow
            }
        }
        RiskLevel::Green => {
            if systolic >= 130 || diastolic > 80 || lifestyle_score < 50 {
                RiskLevel::Yellow
            } else {
                RiskLevel::Green
            }
        }
    }
}
