//! Variability estimation from instantaneous rate samples.
//!
//! Converts a sequence of beats-per-minute readings into an SDNN-equivalent
//! metric: the sample standard deviation of inter-beat interval lengths, in
//! milliseconds. Raw rate samples are smoothed with a trailing moving
//! average first — single-beat swings of tens of bpm otherwise translate
//! into large millisecond swings and inflate the metric beyond anything
//! clinically plausible.

use thiserror::Error;

/// Physiological bounds for a rate sample, in bpm. The ingress layer
/// enforces these before the core is reached, but the processor defends
/// independently.
pub const MIN_RATE_BPM: f64 = 20.0;
pub const MAX_RATE_BPM: f64 = 250.0;

#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("need at least {required} valid intervals, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },
    #[error("sample {value} is not a plausible rate ({MIN_RATE_BPM}-{MAX_RATE_BPM} bpm)")]
    InvalidSample { value: f64 },
}

/// Trailing moving average with window `window`: index i averages samples
/// `[max(0, i-window+1) ..= i]`. A window of 0 or 1 is the identity.
pub fn smooth(samples: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 {
        return samples.to_vec();
    }
    let mut out = Vec::with_capacity(samples.len());
    let mut running = 0.0;
    for i in 0..samples.len() {
        running += samples[i];
        if i >= window {
            running -= samples[i - window];
        }
        let span = (i + 1).min(window);
        out.push(running / span as f64);
    }
    out
}

/// Compute the variability estimate in milliseconds.
///
/// Smooths the raw sequence, converts each rate r to an inter-beat interval
/// of `60000 / r` ms, and returns the Bessel-corrected sample standard
/// deviation of the interval sequence. A constant-rate sequence yields 0.
pub fn variability_ms(samples: &[f64], window: usize) -> Result<f64, SignalError> {
    for &s in samples {
        if !s.is_finite() || !(MIN_RATE_BPM..=MAX_RATE_BPM).contains(&s) {
            return Err(SignalError::InvalidSample { value: s });
        }
    }

    let smoothed = smooth(samples, window);
    let intervals: Vec<f64> = smoothed
        .iter()
        .filter(|&&r| r > 0.0)
        .map(|&r| 60_000.0 / r)
        .filter(|ms| ms.is_finite())
        .collect();

    if intervals.len() < 2 {
        return Err(SignalError::InsufficientSamples {
            required: 2,
            actual: intervals.len(),
        });
    }

    Ok(sample_std_dev(&intervals))
}

/// Bessel-corrected (N-1) sample standard deviation.
fn sample_std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (sum_sq / (n - 1.0)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_rate_has_zero_variability() {
        let samples = vec![60.0; 30];
        let v = variability_ms(&samples, 5).unwrap();
        assert!(v.abs() < 1e-9, "constant sequence must have 0 dispersion: {v}");
    }

    #[test]
    fn empty_batch_is_insufficient() {
        assert_eq!(
            variability_ms(&[], 5),
            Err(SignalError::InsufficientSamples {
                required: 2,
                actual: 0
            })
        );
    }

    #[test]
    fn single_sample_is_insufficient() {
        let err = variability_ms(&[72.0], 5).unwrap_err();
        assert!(matches!(err, SignalError::InsufficientSamples { actual: 1, .. }));
    }

    #[test]
    fn non_finite_sample_rejected() {
        let err = variability_ms(&[60.0, f64::NAN, 60.0], 5).unwrap_err();
        assert!(matches!(err, SignalError::InvalidSample { .. }));
        let err = variability_ms(&[60.0, f64::INFINITY], 1).unwrap_err();
        assert!(matches!(err, SignalError::InvalidSample { .. }));
    }

    #[test]
    fn out_of_range_sample_rejected() {
        assert!(variability_ms(&[60.0, 300.0], 5).is_err());
        assert!(variability_ms(&[60.0, 5.0], 5).is_err());
        assert!(variability_ms(&[60.0, -10.0], 5).is_err());
    }

    #[test]
    fn smoothing_is_trailing_average() {
        let smoothed = smooth(&[60.0, 66.0, 72.0, 60.0], 2);
        assert_eq!(smoothed, vec![60.0, 63.0, 69.0, 66.0]);
    }

    #[test]
    fn window_of_one_is_identity() {
        let samples = vec![55.0, 80.0, 61.0];
        assert_eq!(smooth(&samples, 1), samples);
        assert_eq!(smooth(&samples, 0), samples);
    }

    #[test]
    fn smoothing_suppresses_single_beat_noise() {
        // A single 90 bpm spike in an otherwise steady 60 bpm run.
        let mut noisy = vec![60.0; 30];
        noisy[15] = 90.0;
        let raw = variability_ms(&noisy, 1).unwrap();
        let smoothed = variability_ms(&noisy, 5).unwrap();
        assert!(
            smoothed < raw,
            "smoothing must shrink the outlier's contribution: {smoothed} vs {raw}"
        );
    }

    #[test]
    fn known_two_sample_variability() {
        // 60 bpm -> 1000 ms, 100 bpm -> 600 ms; stddev of [1000, 600] with
        // N-1 correction is |1000-600|/sqrt(2) ~= 282.84 ms.
        let v = variability_ms(&[60.0, 100.0], 1).unwrap();
        assert!((v - 282.842712).abs() < 1e-3, "got {v}");
    }
}
