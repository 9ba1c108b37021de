//! Property-based tests for the signal processor.
//!
//! Verifies that smoothing and variability estimation never panic, stay
//! within physically meaningful bounds, and preserve basic structure for
//! arbitrary in-range sample batches.

use proptest::prelude::*;
use vigil_signal::{smooth, variability_ms, MAX_RATE_BPM, MIN_RATE_BPM};

fn arb_rate() -> impl Strategy<Value = f64> {
    MIN_RATE_BPM..=MAX_RATE_BPM
}

fn arb_batch() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_rate(), 2..120)
}

proptest! {
    #[test]
    fn smoothing_preserves_length(batch in arb_batch(), window in 0usize..10) {
        let smoothed = smooth(&batch, window);
        prop_assert_eq!(smoothed.len(), batch.len());
    }

    /// A trailing average of in-range samples stays in range.
    #[test]
    fn smoothing_stays_in_range(batch in arb_batch(), window in 1usize..10) {
        for v in smooth(&batch, window) {
            prop_assert!(v >= MIN_RATE_BPM - 1e-9 && v <= MAX_RATE_BPM + 1e-9,
                "smoothed value out of range: {}", v);
        }
    }

    /// Variability is always finite and non-negative for valid batches.
    #[test]
    fn variability_is_finite_and_non_negative(batch in arb_batch(), window in 1usize..10) {
        let v = variability_ms(&batch, window).unwrap();
        prop_assert!(v.is_finite());
        prop_assert!(v >= 0.0);
    }

    /// Constant batches have zero dispersion regardless of rate or window.
    #[test]
    fn constant_batch_zero_variability(
        rate in arb_rate(),
        len in 2usize..100,
        window in 1usize..10,
    ) {
        let batch = vec![rate; len];
        let v = variability_ms(&batch, window).unwrap();
        prop_assert!(v.abs() < 1e-6, "constant batch dispersion was {}", v);
    }

    /// Order of magnitude sanity: intervals live in [240, 3000] ms for
    /// in-range rates, so their standard deviation cannot exceed that span.
    #[test]
    fn variability_bounded_by_interval_span(batch in arb_batch()) {
        let v = variability_ms(&batch, 5).unwrap();
        prop_assert!(v <= 60_000.0 / MIN_RATE_BPM - 60_000.0 / MAX_RATE_BPM);
    }
}
