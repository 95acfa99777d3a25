//! Real uncut chip thickness (RUCT) estimation.
//!
//! The distance sensor sees the workpiece surface once per tool rotation.
//! Peaks before the cutting start measure the uncut surface, peaks after it
//! the cut one; the gap between both medians is the real chip thickness.
//!
//! ```text
//!  feed-force channel ──► prepare ──► cutting_start
//!                                          │
//!  |distance| ──► blank [start, start+R) ──┴─► peaks (spacing R)
//!                                                 │
//!                     per-peak window ◄───────────┘
//!                           │
//!              before-cut pool │ after-cut pool ──► medians ──► RuctResult
//! ```

use log::{debug, warn};
use serde::Serialize;

use crate::config::{Config, Decimals, ScannerVariant, SignalConfig};
use crate::data::model::{
    CutPhase, Parameters, PeriodicEvent, Recording, RuctResult, Window,
};
use crate::error::{AnalysisError, Result};
use crate::signal::locator::WindowLocator;
use crate::signal::peaks::find_peaks;
use crate::signal::prepare::ChannelPreparer;
use crate::signal::stats::{median, round_to};

// ---------------------------------------------------------------------------
// Durations derived from the cutting speed
// ---------------------------------------------------------------------------

/// Samples of one full tool revolution at `cutting_speed` m/s.
pub fn rotation_duration(signal: &SignalConfig, cutting_speed: f64) -> Result<usize> {
    let samples = ((1.0 / signal.max_revolutions_per_second)
        * (100.0 / cutting_speed)
        * signal.sampling_frequency)
        .round();
    positive_samples(samples, "rotation duration")
}

/// Samples spanned by the local analysis half-window around a peak.
pub fn cutting_duration(signal: &SignalConfig, cutting_speed: f64) -> Result<usize> {
    let samples = (0.2 * signal.sampling_frequency / cutting_speed).round();
    positive_samples(samples, "cutting duration")
}

fn positive_samples(samples: f64, name: &str) -> Result<usize> {
    if samples.is_finite() && samples >= 1.0 {
        Ok(samples as usize)
    } else {
        Err(AnalysisError::config(format!(
            "{name} of {samples} samples; check the sampling frequency and cutting speed"
        )))
    }
}

// ---------------------------------------------------------------------------
// Cutting start & noise blanking
// ---------------------------------------------------------------------------

/// Sample index at which the tool engages, taken from the most sensitive
/// force channel.
pub fn detect_cutting_start(
    preparer: &ChannelPreparer,
    reference: &Recording,
    config: &Config,
    cutting_speed: f64,
) -> Result<usize> {
    let axis = config.signal.reference_axis;
    let prepared = preparer.prepare(axis, reference.axis(axis), cutting_speed)?;
    Ok(prepared.window.start)
}

/// Zero one rotation after the cutting start, where chips cross the
/// laser beam. This is the only stage that mutates a channel in place.
pub fn blank_noise(distance: &mut [f64], cutting_start: usize, rotation: usize) {
    let from = cutting_start.min(distance.len());
    let to = cutting_start.saturating_add(rotation).min(distance.len());
    distance[from..to].fill(0.0);
}

// ---------------------------------------------------------------------------
// Peak-based range extraction
// ---------------------------------------------------------------------------

/// Samples of all per-peak windows, split at the first after-cut sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub events: Vec<PeriodicEvent>,
    pub range_before: Vec<f64>,
    pub range_after: Vec<f64>,
}

/// Extracts the refined window around every peak of the distance channel.
#[derive(Debug, Clone, Copy)]
pub struct RangeExtractor<'a> {
    pub locator: &'a WindowLocator,
    /// Half-width of the local sub-window around each peak.
    pub cutting_duration: usize,
    pub cutting_speed: f64,
}

impl RangeExtractor<'_> {
    pub fn extract(
        &self,
        data: &[f64],
        peaks: &[usize],
        cutting_start: usize,
    ) -> Result<Extraction> {
        if peaks.is_empty() {
            return Err(AnalysisError::localization(
                "no peaks were detected in the distance channel",
            ));
        }

        let min_len = self
            .locator
            .analysis_length(self.cutting_speed, ScannerVariant::Standard)?;

        let mut events = Vec::with_capacity(peaks.len());
        let mut pool: Vec<f64> = Vec::new();
        let mut split: Option<usize> = None;

        for &peak in peaks {
            let lo = peak.saturating_sub(self.cutting_duration);
            let hi = peak.saturating_add(self.cutting_duration).min(data.len());
            if hi <= lo || hi - lo < min_len {
                warn!(
                    "skipping peak at {peak}: local window [{lo}, {hi}) is shorter than {min_len} samples"
                );
                continue;
            }

            let local = &data[lo..hi];
            let window = self
                .locator
                .locate(local, self.cutting_speed, ScannerVariant::Standard)?;

            let phase = if peak > cutting_start {
                CutPhase::After
            } else {
                CutPhase::Before
            };
            if phase == CutPhase::After && split.is_none() {
                split = Some(pool.len());
            }
            pool.extend_from_slice(window.slice(local));

            events.push(PeriodicEvent {
                peak,
                local: Window::new(lo, hi)?,
                window,
                phase,
            });
        }

        if events.is_empty() {
            return Err(AnalysisError::localization(format!(
                "none of the {} peaks left room for an analysis window",
                peaks.len()
            )));
        }
        let split = split.ok_or_else(|| {
            AnalysisError::localization(format!(
                "no peak lies after the cutting start (sample {cutting_start})"
            ))
        })?;
        if split == 0 {
            return Err(AnalysisError::localization(format!(
                "no peak lies before the cutting start (sample {cutting_start})"
            )));
        }

        let range_after = pool.split_off(split);
        Ok(Extraction {
            events,
            range_before: pool,
            range_after,
        })
    }
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// Reduce both ranges to the RUCT and its deviation from `nominal_uct`.
///
/// Both ranges are reduced by their median. The ratio is computed from the
/// unrounded thickness.
pub fn estimate(
    range_before: &[f64],
    range_after: &[f64],
    nominal_uct: f64,
    decimals: &Decimals,
) -> Result<RuctResult> {
    if !(nominal_uct > 0.0) {
        return Err(AnalysisError::config(format!(
            "nominal uncut chip thickness must be positive, got {nominal_uct}"
        )));
    }
    let median_before = median(range_before)
        .ok_or_else(|| AnalysisError::localization("before-cut range is empty"))?;
    let median_after = median(range_after)
        .ok_or_else(|| AnalysisError::localization("after-cut range is empty"))?;

    let ruct = (median_before - median_after).abs();
    let ratio = (ruct / nominal_uct - 1.0) * 100.0;

    Ok(RuctResult {
        ruct: round_to(ruct, decimals.ruct),
        ratio_pct: round_to(ratio, decimals.ratio),
        median_before,
        median_after,
    })
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Data kept for diagnostic plots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub peaks: Vec<usize>,
    pub extraction: Extraction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuctOutcome {
    pub result: RuctResult,
    pub cutting_start: usize,
    pub diagnostics: Option<Diagnostics>,
}

/// Runs every RUCT stage for one recording, failing on the first error.
pub struct RuctPipeline<'a> {
    config: &'a Config,
    preparer: &'a ChannelPreparer,
}

impl<'a> RuctPipeline<'a> {
    pub fn new(config: &'a Config, preparer: &'a ChannelPreparer) -> Self {
        RuctPipeline { config, preparer }
    }

    pub fn run(&self, params: &Parameters, recording: &Recording) -> Result<RuctOutcome> {
        let speed = f64::from(params.cutting_speed);
        let nominal = params.uncut_chip_thickness.ok_or_else(|| {
            AnalysisError::config("nominal uncut chip thickness is required for the RUCT")
        })?;

        let signal = &self.config.signal;
        let rotation = rotation_duration(signal, speed)?;
        let cutting = cutting_duration(signal, speed)?;

        let cutting_start = detect_cutting_start(self.preparer, recording, self.config, speed)?;

        let mut distance: Vec<f64> = recording.distance.iter().map(|v| v.abs()).collect();
        blank_noise(&mut distance, cutting_start, rotation);

        let peaks = find_peaks(&distance, rotation);
        debug!(
            "cutting start {cutting_start}, rotation {rotation} samples, {} peaks",
            peaks.len()
        );

        let extraction = RangeExtractor {
            locator: self.preparer.locator(),
            cutting_duration: cutting,
            cutting_speed: speed,
        }
        .extract(&distance, &peaks, cutting_start)?;

        let result = estimate(
            &extraction.range_before,
            &extraction.range_after,
            nominal,
            &self.config.decimals,
        )?;

        let diagnostics = self
            .config
            .batch
            .diagnostics_dir
            .is_some()
            .then(|| Diagnostics { peaks, extraction });

        Ok(RuctOutcome {
            result,
            cutting_start,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fs 1 kHz, speed 10 m/s: D = 10, C = 20, R = 1000 samples.
    fn test_config() -> Config {
        let mut config = Config::default();
        config.signal.sampling_frequency = 1_000.0;
        config.signal.cutoff_frequency = 50.0;
        config.signal.max_revolutions_per_second = 10.0;
        config.signal.offset_samples = 50;
        config
    }

    fn pulse(data: &mut [f64], from: usize, to: usize, value: f64) {
        data[from..to].fill(value);
    }

    fn synthetic_recording(v1: f64, v2: f64) -> Recording {
        let n = 4_000;
        let mut y = vec![0.0; n];
        pulse(&mut y, 1_500, 1_600, 30.0);
        let mut distance = vec![0.0; n];
        pulse(&mut distance, 500, 530, v1);
        pulse(&mut distance, 3_000, 3_030, v2);
        Recording {
            x: vec![0.0; n],
            y,
            z: vec![0.0; n],
            distance,
        }
    }

    fn params(nominal: Option<f64>) -> Parameters {
        Parameters {
            cutting_speed: 10,
            uncut_chip_thickness: nominal,
            ..Parameters::default()
        }
    }

    #[test]
    fn durations_follow_speed() {
        let signal = test_config().signal;
        assert_eq!(rotation_duration(&signal, 10.0).unwrap(), 1_000);
        assert_eq!(cutting_duration(&signal, 10.0).unwrap(), 20);
        assert_eq!(cutting_duration(&signal, 30.0).unwrap(), 7);
        assert!(cutting_duration(&signal, 1_000.0).is_err());
    }

    #[test]
    fn estimator_reference_values() {
        let decimals = Decimals {
            ruct: 2,
            ratio: 2,
            ..Decimals::default()
        };
        let r = estimate(&[0.10; 8], &[0.14; 5], 0.30, &decimals).unwrap();
        assert_eq!(r.ruct, 0.04);
        assert_eq!(r.ratio_pct, -86.67);
        assert_eq!(r.median_before, 0.10);
        assert_eq!(r.median_after, 0.14);
    }

    #[test]
    fn ratio_uses_unrounded_thickness() {
        let decimals = Decimals {
            ruct: 2,
            ratio: 2,
            ..Decimals::default()
        };
        // 0.3004 reports as 0.30, yet the ratio keeps the extra 0.0004.
        let r = estimate(&[1.0], &[0.6996], 0.30, &decimals).unwrap();
        assert_eq!(r.ruct, 0.3);
        assert_eq!(r.ratio_pct, 0.13);
    }

    #[test]
    fn estimator_requires_positive_nominal() {
        let decimals = Decimals::default();
        for nominal in [0.0, -0.2, f64::NAN] {
            let err = estimate(&[1.0], &[2.0], nominal, &decimals).unwrap_err();
            assert!(matches!(err, AnalysisError::Configuration(_)));
        }
    }

    #[test]
    fn blanking_is_clipped_to_channel() {
        let mut data = vec![1.0; 10];
        blank_noise(&mut data, 7, 5);
        assert_eq!(data, vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        blank_noise(&mut data, 20, 5);
        assert_eq!(data.len(), 10);
    }

    fn extractor(locator: &WindowLocator) -> RangeExtractor<'_> {
        RangeExtractor {
            locator,
            cutting_duration: 20,
            cutting_speed: 10.0,
        }
    }

    #[test]
    fn no_peaks_is_localization_error() {
        let locator = WindowLocator::new(&test_config().signal);
        let err = extractor(&locator).extract(&[0.0; 100], &[], 50).unwrap_err();
        assert!(matches!(err, AnalysisError::SignalLocalization(_)));
    }

    #[test]
    fn all_peaks_before_cut_is_localization_error() {
        let locator = WindowLocator::new(&test_config().signal);
        let data = vec![1.0; 300];
        let err = extractor(&locator)
            .extract(&data, &[50, 120, 200], 250)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::SignalLocalization(_)));
    }

    #[test]
    fn all_peaks_after_cut_is_localization_error() {
        let locator = WindowLocator::new(&test_config().signal);
        let data = vec![1.0; 300];
        let err = extractor(&locator).extract(&data, &[50, 120], 10).unwrap_err();
        assert!(matches!(err, AnalysisError::SignalLocalization(_)));
    }

    #[test]
    fn peaks_at_channel_edges_are_clipped() {
        let locator = WindowLocator::new(&test_config().signal);
        let mut data = vec![2.0; 200];
        data[100..].fill(1.5);
        let ex = extractor(&locator).extract(&data, &[0, 199], 100).unwrap();

        assert_eq!(ex.events[0].local, Window { start: 0, stop: 20 });
        assert_eq!(ex.events[1].local, Window { start: 179, stop: 200 });
        assert_eq!(ex.events[0].phase, CutPhase::Before);
        assert_eq!(ex.events[1].phase, CutPhase::After);
        assert!(ex.range_before.iter().all(|&v| v == 2.0));
        assert!(ex.range_after.iter().all(|&v| v == 1.5));
    }

    #[test]
    fn short_edge_window_is_skipped() {
        let locator = WindowLocator::new(&test_config().signal);
        let data = vec![1.0; 200];
        let ex = RangeExtractor {
            locator: &locator,
            cutting_duration: 8,
            cutting_speed: 10.0,
        }
        .extract(&data, &[0, 60, 150], 100)
        .unwrap();
        // [0, 8) is shorter than the 10-sample analysis window.
        assert_eq!(ex.events.len(), 2);
        assert_eq!(ex.events[0].peak, 60);
    }

    #[test]
    fn every_peak_skipped_is_localization_error() {
        let locator = WindowLocator::new(&test_config().signal);
        let data = vec![1.0; 300];
        // Local windows of 8 samples never fit the 10-sample analysis window.
        let err = RangeExtractor {
            locator: &locator,
            cutting_duration: 4,
            cutting_speed: 10.0,
        }
        .extract(&data, &[50, 120, 200], 100)
        .unwrap_err();
        assert!(matches!(err, AnalysisError::SignalLocalization(_)));
    }

    #[test]
    fn peak_at_cutting_start_counts_as_before() {
        let locator = WindowLocator::new(&test_config().signal);
        let data = vec![1.0; 300];
        let ex = extractor(&locator).extract(&data, &[50, 120, 200], 120).unwrap();
        let phases: Vec<CutPhase> = ex.events.iter().map(|e| e.phase).collect();
        assert_eq!(phases, vec![CutPhase::Before, CutPhase::Before, CutPhase::After]);
    }

    #[test]
    fn pipeline_measures_gap_between_pulses() {
        let config = test_config();
        let preparer = ChannelPreparer::new(&config).unwrap();
        let recording = synthetic_recording(2.0, 1.7);

        let outcome = RuctPipeline::new(&config, &preparer)
            .run(&params(Some(0.2)), &recording)
            .unwrap();

        assert!(outcome.cutting_start > 1_500 && outcome.cutting_start < 1_600);
        assert_eq!(outcome.result.median_before, 2.0);
        assert_eq!(outcome.result.median_after, 1.7);
        assert_eq!(outcome.result.ruct, 0.3);
        assert_eq!(outcome.result.ratio_pct, 50.0);
        assert!(outcome.diagnostics.is_none());
    }

    #[test]
    fn pipeline_sign_of_ratio() {
        let config = test_config();
        let preparer = ChannelPreparer::new(&config).unwrap();
        // Gap of 0.1 against a nominal 0.2 -> -50 %.
        let outcome = RuctPipeline::new(&config, &preparer)
            .run(&params(Some(0.2)), &synthetic_recording(1.6, 1.7))
            .unwrap();
        assert_eq!(outcome.result.ruct, 0.1);
        assert_eq!(outcome.result.ratio_pct, -50.0);
    }

    #[test]
    fn pipeline_keeps_diagnostics_on_request() {
        let mut config = test_config();
        config.batch.diagnostics_dir = Some(std::path::PathBuf::from("ruct"));
        let preparer = ChannelPreparer::new(&config).unwrap();
        let outcome = RuctPipeline::new(&config, &preparer)
            .run(&params(Some(0.2)), &synthetic_recording(2.0, 1.7))
            .unwrap();
        let diag = outcome.diagnostics.unwrap();
        assert_eq!(diag.peaks, vec![514, 3_014]);
        assert_eq!(diag.extraction.events.len(), 2);
    }

    #[test]
    fn pipeline_without_nominal_fails() {
        let config = test_config();
        let preparer = ChannelPreparer::new(&config).unwrap();
        let err = RuctPipeline::new(&config, &preparer)
            .run(&params(None), &synthetic_recording(2.0, 1.7))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration(_)));
    }

    #[test]
    fn pipeline_without_after_peak_fails() {
        let config = test_config();
        let preparer = ChannelPreparer::new(&config).unwrap();
        let mut recording = synthetic_recording(2.0, 1.7);
        recording.distance[3_000..3_030].fill(0.0);
        let err = RuctPipeline::new(&config, &preparer)
            .run(&params(Some(0.2)), &recording)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::SignalLocalization(_)));
    }
}
