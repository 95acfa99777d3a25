//! Run configuration: signal constants, channel layout, filename layout
//! and batch behaviour. Loaded from JSON; every field has a default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::model::Axis;
use crate::error::AnalysisError;

/// Complete analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the recordings.
    pub root: PathBuf,
    /// Extension of recording files (without the dot).
    pub extension: String,
    /// Column delimiter of the recording tables.
    pub delimiter: char,

    pub signal: SignalConfig,
    pub decimals: Decimals,
    pub channels: ChannelMap,
    pub reverse: AxisFlags,
    /// Optional axes; Y is always analysed.
    pub activate: ActivatedAxes,
    pub filename: FilenameLayout,
    pub batch: BatchConfig,
}

/// Constants of the acquisition and of the cutting rig.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Sampling frequency in Hz.
    pub sampling_frequency: f64,
    /// Low-pass cutoff in Hz.
    pub cutoff_frequency: f64,
    pub filter_order: usize,
    pub max_revolutions_per_second: f64,
    /// Workpiece length in m.
    pub workpiece_length: f64,
    /// Fraction of the window trimmed at the left edge (sensor latency).
    pub horizontal_offset_left: f64,
    /// Fraction of the window trimmed at the right edge.
    pub horizontal_offset_right: f64,
    /// Samples averaged at the start of a channel to estimate its bias.
    pub offset_samples: usize,
    /// Channel whose engagement marks the cutting start (feed force).
    pub reference_axis: Axis,
    /// Window variant used for the force statistics.
    pub force_scanner: ScannerVariant,
}

/// Length of the sliding analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerVariant {
    /// Full workpiece length, refined to the middle half.
    Standard,
    /// Half the workpiece length, used as is.
    Fast,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Decimals {
    pub ruct: u32,
    pub ratio: u32,
    pub mean: u32,
    pub std: u32,
}

/// Column index of each physical channel in the recording table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMap {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub distance: usize,
}

/// Per-axis boolean flag (sign reversal).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisFlags {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl AxisFlags {
    pub fn get(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivatedAxes {
    pub x: bool,
    pub z: bool,
}

impl ActivatedAxes {
    pub fn is_active(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.x,
            Axis::Y => true,
            Axis::Z => self.z,
        }
    }
}

/// Byte range `[from, to)` of a parameter inside the filename.
pub type Span = [usize; 2];

/// Where each parameter sits in the filename. `None` means "not encoded".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilenameLayout {
    pub cutting_speed: Option<Span>,
    pub fibre_angle: Option<Span>,
    pub moisture_content: Option<Span>,
    pub repetition_no: Option<Span>,
    pub species: Option<Span>,
    pub tool: Option<Span>,
    pub uncut_chip_thickness: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failing file and continue with the next one.
    Isolate,
    /// Abort the batch on the first failing file.
    FailFast,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub on_failure: FailurePolicy,
    /// Analyse files on a rayon worker pool.
    pub parallel: bool,
    /// Folder receiving the peaks, events and ranges of every RUCT run as
    /// JSON. Nothing is kept when unset.
    pub diagnostics_dir: Option<PathBuf>,
}

// -- Defaults --

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            extension: "txt".to_string(),
            delimiter: ',',
            signal: SignalConfig::default(),
            decimals: Decimals::default(),
            channels: ChannelMap::default(),
            reverse: AxisFlags::default(),
            activate: ActivatedAxes::default(),
            filename: FilenameLayout::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            sampling_frequency: 10_000.0,
            cutoff_frequency: 500.0,
            filter_order: 2,
            max_revolutions_per_second: 50.0,
            workpiece_length: 0.1,
            horizontal_offset_left: 0.1,
            horizontal_offset_right: 0.1,
            offset_samples: 100,
            reference_axis: Axis::Y,
            force_scanner: ScannerVariant::Standard,
        }
    }
}

impl Default for Decimals {
    fn default() -> Self {
        Self {
            ruct: 3,
            ratio: 2,
            mean: 3,
            std: 3,
        }
    }
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            x: 0,
            y: 1,
            z: 2,
            distance: 3,
        }
    }
}

/// Matches filenames such as `V50_A45_M12_R01_spruce_hss_CH03.txt`.
impl Default for FilenameLayout {
    fn default() -> Self {
        Self {
            cutting_speed: Some([1, 3]),
            fibre_angle: Some([5, 7]),
            moisture_content: Some([9, 11]),
            repetition_no: Some([13, 15]),
            species: Some([16, 22]),
            tool: Some([23, 26]),
            uncut_chip_thickness: Some([29, 31]),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            on_failure: FailurePolicy::Isolate,
            parallel: false,
            diagnostics_dir: None,
        }
    }
}

// -- Loading & validation --

impl Config {
    /// Read a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject constants the signal core cannot work with.
    pub fn validate(&self) -> std::result::Result<(), AnalysisError> {
        let s = &self.signal;
        let nyquist = 0.5 * s.sampling_frequency;

        if !(s.sampling_frequency > 0.0) {
            return Err(AnalysisError::config("sampling frequency must be positive"));
        }
        if !(s.cutoff_frequency > 0.0 && s.cutoff_frequency < nyquist) {
            return Err(AnalysisError::config(format!(
                "cutoff frequency {} Hz must lie in (0, {nyquist}) Hz",
                s.cutoff_frequency
            )));
        }
        if s.filter_order == 0 || s.filter_order > 20 {
            return Err(AnalysisError::config("filter order must be within 1..=20"));
        }
        if !(s.max_revolutions_per_second > 0.0) {
            return Err(AnalysisError::config(
                "max revolutions per second must be positive",
            ));
        }
        if !(s.workpiece_length > 0.0) {
            return Err(AnalysisError::config("workpiece length must be positive"));
        }
        for (name, fraction) in [
            ("left", s.horizontal_offset_left),
            ("right", s.horizontal_offset_right),
        ] {
            if !(0.0..1.0).contains(&fraction) {
                return Err(AnalysisError::config(format!(
                    "{name} horizontal offset {fraction} must lie in [0, 1)"
                )));
            }
        }
        if s.offset_samples == 0 {
            return Err(AnalysisError::config("offset sample count must be positive"));
        }
        if self.filename.cutting_speed.is_none() {
            return Err(AnalysisError::config(
                "cutting speed is essential and must have a filename range",
            ));
        }

        let c = &self.channels;
        let columns = [c.x, c.y, c.z, c.distance];
        for (i, a) in columns.iter().enumerate() {
            if columns[i + 1..].contains(a) {
                return Err(AnalysisError::config(format!(
                    "column {a} is mapped to more than one channel"
                )));
            }
        }
        Ok(())
    }

    /// Largest column index the recordings must provide.
    pub fn max_column(&self) -> usize {
        let c = &self.channels;
        c.x.max(c.y).max(c.z).max(c.distance)
    }
}
