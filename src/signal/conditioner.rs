use std::f64::consts::PI;

use num_complex::Complex64;

use crate::config::SignalConfig;
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Offset removal
// ---------------------------------------------------------------------------

/// Remove the sensor bias measured over the first `samples` samples.
///
/// The bias is the mean of the settled pre-cut interval; a positive bias is
/// subtracted, a negative one added, so the interval ends up centred on 0.
pub fn offset(data: &[f64], samples: usize) -> Result<Vec<f64>> {
    if data.is_empty() || samples == 0 {
        return Err(AnalysisError::config(
            "offset needs a non-empty channel and at least one sample",
        ));
    }
    let n = samples.min(data.len());
    let bias = data[..n].iter().sum::<f64>() / n as f64;
    Ok(data.iter().map(|v| v - bias).collect())
}

// ---------------------------------------------------------------------------
// Butterworth low-pass as a cascade of second-order sections
// ---------------------------------------------------------------------------

/// One second-order section, `H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
}

impl Biquad {
    /// Bilinear transform of the analog first-order section `-p / (s - p)`.
    fn from_real_pole(p: f64, k: f64) -> Self {
        let alpha = k - p;
        let beta = k + p;
        Biquad {
            b: [-p / alpha, -p / alpha, 0.0],
            a: [-beta / alpha, 0.0],
        }
    }

    /// Bilinear transform of `|p|^2 / (s^2 - 2 Re(p) s + |p|^2)`.
    fn from_pole_pair(p: Complex64, k: f64) -> Self {
        let mag_sq = p.norm_sqr();
        let k2 = k * k;
        let d = k2 - 2.0 * k * p.re + mag_sq;
        Biquad {
            b: [mag_sq / d, 2.0 * mag_sq / d, mag_sq / d],
            a: [2.0 * (mag_sq - k2) / d, (k2 + 2.0 * k * p.re + mag_sq) / d],
        }
    }
}

/// Causal Butterworth low-pass filter.
///
/// Each call to [`LowpassFilter::apply`] starts from a zero state, so
/// filtering the same input twice gives the same output.
#[derive(Debug, Clone)]
pub struct LowpassFilter {
    sections: Vec<Biquad>,
}

impl LowpassFilter {
    /// Design a Butterworth low-pass; the cutoff must lie below Nyquist.
    pub fn butterworth(order: usize, cutoff_hz: f64, sample_rate: f64) -> Result<Self> {
        let nyquist = 0.5 * sample_rate;
        if order == 0 {
            return Err(AnalysisError::config("filter order must be positive"));
        }
        if !(cutoff_hz > 0.0 && cutoff_hz < nyquist) {
            return Err(AnalysisError::config(format!(
                "normalized cutoff {} must lie in (0, 1)",
                cutoff_hz / nyquist
            )));
        }

        // Pre-warped analog cutoff for the bilinear transform.
        let wc = 2.0 * sample_rate * (PI * cutoff_hz / sample_rate).tan();
        let k = 2.0 * sample_rate;

        let mut sections = Vec::with_capacity(order.div_ceil(2));
        for i in 0..order / 2 {
            let theta = PI * (2 * i + order + 1) as f64 / (2 * order) as f64;
            let pole = Complex64::new(theta.cos(), theta.sin()) * wc;
            sections.push(Biquad::from_pole_pair(pole, k));
        }
        if order % 2 == 1 {
            sections.push(Biquad::from_real_pole(-wc, k));
        }
        Ok(LowpassFilter { sections })
    }

    /// Filter a whole channel (Direct Form II transposed, zero initial state).
    pub fn apply(&self, data: &[f64]) -> Vec<f64> {
        let mut out = data.to_vec();
        for section in &self.sections {
            let mut s = [0.0_f64; 2];
            for v in out.iter_mut() {
                let x = *v;
                let y = section.b[0] * x + s[0];
                s[0] = section.b[1] * x - section.a[0] * y + s[1];
                s[1] = section.b[2] * x - section.a[1] * y;
                *v = y;
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Conditioner – offset then low-pass
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Conditioner {
    filter: LowpassFilter,
    offset_samples: usize,
}

impl Conditioner {
    pub fn new(signal: &SignalConfig) -> Result<Self> {
        Ok(Conditioner {
            filter: LowpassFilter::butterworth(
                signal.filter_order,
                signal.cutoff_frequency,
                signal.sampling_frequency,
            )?,
            offset_samples: signal.offset_samples,
        })
    }

    pub fn offset(&self, data: &[f64]) -> Result<Vec<f64>> {
        offset(data, self.offset_samples)
    }

    pub fn lowpass(&self, data: &[f64]) -> Vec<f64> {
        self.filter.apply(data)
    }

    /// Offset removal followed by low-pass filtering.
    pub fn condition(&self, data: &[f64]) -> Result<Vec<f64>> {
        Ok(self.lowpass(&self.offset(data)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean(v: &[f64]) -> f64 {
        v.iter().sum::<f64>() / v.len() as f64
    }

    #[test]
    fn offset_centres_the_leading_samples() {
        let data: Vec<f64> = (0..500).map(|i| 3.5 + (i as f64 * 0.37).sin()).collect();
        for k in [1, 10, 100, 499] {
            let out = offset(&data, k).unwrap();
            assert!(mean(&out[..k]).abs() < 1e-9, "k = {k}");
        }

        let negative: Vec<f64> = data.iter().map(|v| -v).collect();
        let out = offset(&negative, 50).unwrap();
        assert!(mean(&out[..50]).abs() < 1e-9);
    }

    #[test]
    fn offset_count_larger_than_channel() {
        let out = offset(&[2.0, 4.0], 100).unwrap();
        assert_eq!(out, vec![-1.0, 1.0]);
    }

    #[test]
    fn offset_rejects_empty_channel() {
        assert!(offset(&[], 10).is_err());
    }

    #[test]
    fn lowpass_has_unity_dc_gain() {
        for order in 1..=5 {
            let filter = LowpassFilter::butterworth(order, 500.0, 10_000.0).unwrap();
            let out = filter.apply(&vec![1.0; 2_000]);
            assert!((out[1_999] - 1.0).abs() < 1e-6, "order {order}");
        }
    }

    #[test]
    fn lowpass_attenuates_high_frequencies() {
        let fs = 10_000.0;
        let filter = LowpassFilter::butterworth(4, 200.0, fs).unwrap();
        let tone: Vec<f64> = (0..4_000)
            .map(|i| (2.0 * PI * 2_000.0 * i as f64 / fs).sin())
            .collect();
        let out = filter.apply(&tone);
        let peak = out[2_000..].iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        assert!(peak < 0.01, "residual amplitude {peak}");
    }

    #[test]
    fn lowpass_is_repeatable() {
        let filter = LowpassFilter::butterworth(3, 300.0, 10_000.0).unwrap();
        let data: Vec<f64> = (0..300).map(|i| (i % 7) as f64).collect();
        assert_eq!(filter.apply(&data), filter.apply(&data));
    }

    #[test]
    fn cutoff_at_nyquist_is_rejected() {
        let err = LowpassFilter::butterworth(2, 5_000.0, 10_000.0).unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration(_)));
    }
}
