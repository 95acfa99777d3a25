use crate::config::{ScannerVariant, SignalConfig};
use crate::data::model::Window;
use crate::error::{AnalysisError, Result};

/// Finds the cutting pass inside a channel: the stretch of highest
/// sustained mean absolute amplitude, trimmed for sensor latency.
#[derive(Debug, Clone)]
pub struct WindowLocator {
    sampling_frequency: f64,
    workpiece_length: f64,
    offset_left: f64,
    offset_right: f64,
}

impl WindowLocator {
    pub fn new(signal: &SignalConfig) -> Self {
        WindowLocator {
            sampling_frequency: signal.sampling_frequency,
            workpiece_length: signal.workpiece_length,
            offset_left: signal.horizontal_offset_left,
            offset_right: signal.horizontal_offset_right,
        }
    }

    /// Number of samples the workpiece (or half of it) takes to pass the
    /// tool at `cutting_speed` m/s.
    pub fn analysis_length(&self, cutting_speed: f64, variant: ScannerVariant) -> Result<usize> {
        if !(cutting_speed > 0.0) {
            return Err(AnalysisError::config(format!(
                "cutting speed {cutting_speed} m/s must be positive"
            )));
        }
        let length = match variant {
            ScannerVariant::Standard => self.workpiece_length,
            ScannerVariant::Fast => self.workpiece_length / 2.0,
        };
        let samples = (length * self.sampling_frequency / cutting_speed) as usize;
        if samples == 0 {
            return Err(AnalysisError::config(
                "analysis window is shorter than one sample",
            ));
        }
        Ok(samples)
    }

    /// Locate the engagement window of `data` (local index space).
    pub fn locate(
        &self,
        data: &[f64],
        cutting_speed: f64,
        variant: ScannerVariant,
    ) -> Result<Window> {
        let d = self.analysis_length(cutting_speed, variant)?;
        let anchor = max_energy_start(data, d)?;

        let (start, stop) = match variant {
            ScannerVariant::Standard => {
                let start = anchor + d / 4;
                (start, start + d / 2)
            }
            ScannerVariant::Fast => (anchor, anchor + d),
        };
        self.compensate_latency(start, stop)
    }

    /// Trim both edges by fixed fractions of the width; the right edge is
    /// trimmed relative to the width left after the left trim.
    fn compensate_latency(&self, start: usize, stop: usize) -> Result<Window> {
        let start = start + (stop.saturating_sub(start) as f64 * self.offset_left) as usize;
        let stop = stop - (stop.saturating_sub(start) as f64 * self.offset_right) as usize;
        Window::new(start, stop)
    }
}

/// Start index of the length-`d` window with the largest mean absolute
/// value. Only starts whose window fits entirely are visited; the first
/// maximum wins.
///
/// Every window is summed on its own, in sample order, so windows holding
/// the same samples compare equal.
pub fn max_energy_start(data: &[f64], d: usize) -> Result<usize> {
    if d == 0 || d > data.len() {
        return Err(AnalysisError::config(format!(
            "analysis window of {d} samples does not fit a channel of {} samples",
            data.len()
        )));
    }

    let mut best = 0;
    let mut best_sum = f64::NEG_INFINITY;
    for (i, window) in data.windows(d).enumerate() {
        let sum: f64 = window.iter().map(|v| v.abs()).sum();
        if sum > best_sum {
            best_sum = sum;
            best = i;
        }
    }
    Ok(best)
}
