use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Axis – one of the three force axes of the dynamometer
// ---------------------------------------------------------------------------

/// A spatial force axis. Resolved once at the input boundary; everything
/// downstream dispatches on the variant instead of on strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "AxisToken")]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Axis as written in a configuration file: `1` or `"y"`, `"axis Y"`...
#[derive(Deserialize)]
#[serde(untagged)]
enum AxisToken {
    Index(usize),
    Name(String),
}

impl TryFrom<AxisToken> for Axis {
    type Error = AnalysisError;

    fn try_from(token: AxisToken) -> Result<Self> {
        match token {
            AxisToken::Index(i) => Axis::from_index(i),
            AxisToken::Name(s) => s.parse(),
        }
    }
}

impl Axis {
    /// Resolve a numeric selector (0, 1, 2).
    pub fn from_index(index: usize) -> Result<Self> {
        match index {
            0 => Ok(Axis::X),
            1 => Ok(Axis::Y),
            2 => Ok(Axis::Z),
            other => Err(invalid_axis(&other.to_string())),
        }
    }

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Accepts `0`/`1`/`2`, `x`/`y`/`z`, and forms like `"Axis Y"` or `"axis_z"`.
impl FromStr for Axis {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.to_ascii_lowercase().replace("axis", "");
        let token = token.trim_matches(|c: char| c.is_whitespace() || c == '_' || c == '-');

        if token == "0" || token.contains('x') {
            Ok(Axis::X)
        } else if token == "1" || token.contains('y') {
            Ok(Axis::Y)
        } else if token == "2" || token.contains('z') {
            Ok(Axis::Z)
        } else {
            Err(invalid_axis(s))
        }
    }
}

fn invalid_axis(token: &str) -> AnalysisError {
    AnalysisError::config(format!(
        "\"{token}\" was specified as the axis; expected 0, 1, 2 or a token containing x, y or z"
    ))
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

// ---------------------------------------------------------------------------
// Channels of one recording
// ---------------------------------------------------------------------------

/// The four physical channels of a recording, each an owned sample buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub distance: Vec<f64>,
}

impl Recording {
    pub fn axis(&self, axis: Axis) -> &[f64] {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

// ---------------------------------------------------------------------------
// Window – inferred engagement region
// ---------------------------------------------------------------------------

/// Half-open sample range `[start, stop)` with `start < stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: usize,
    pub stop: usize,
}

impl Window {
    pub fn new(start: usize, stop: usize) -> Result<Self> {
        if start >= stop {
            return Err(AnalysisError::config(format!(
                "degenerate window [{start}, {stop}); widen the analysis window or lower the latency offsets"
            )));
        }
        Ok(Window { start, stop })
    }

    /// Borrow the window's samples, clipped to the slice length.
    pub fn slice<'a>(&self, data: &'a [f64]) -> &'a [f64] {
        let stop = self.stop.min(data.len());
        let start = self.start.min(stop);
        &data[start..stop]
    }
}

// ---------------------------------------------------------------------------
// Parameters – values encoded in the filename
// ---------------------------------------------------------------------------

/// Experiment parameters decoded from a recording's filename.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Parameters {
    /// Cutting speed in m/s, within `(0, 100]`.
    pub cutting_speed: u32,
    /// Fibre angle in degrees, within `[0, 90]`.
    pub fibre_angle: Option<f64>,
    pub moisture_content: Option<u32>,
    pub repetition_no: Option<i64>,
    pub species: Option<String>,
    pub tool: Option<String>,
    /// Nominal uncut chip thickness in mm.
    pub uncut_chip_thickness: Option<f64>,
}

// ---------------------------------------------------------------------------
// RUCT result and per-peak events
// ---------------------------------------------------------------------------

/// Real uncut chip thickness and its deviation from the nominal value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RuctResult {
    pub ruct: f64,
    /// Signed percentage deviation from the nominal thickness.
    pub ratio_pct: f64,
    pub median_before: f64,
    pub median_after: f64,
}

/// Whether a peak lies before or after the cutting start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CutPhase {
    Before,
    After,
}

/// One detected engagement peak in the distance channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodicEvent {
    /// Peak index in the whole recording.
    pub peak: usize,
    /// Clipped local sub-window around the peak, in recording indices.
    pub local: Window,
    /// Refined window inside `local`, in local indices.
    pub window: Window,
    pub phase: CutPhase,
}

// ---------------------------------------------------------------------------
// Descriptive statistics of the force channels
// ---------------------------------------------------------------------------

/// Mean and population standard deviation over the engagement window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseStats {
    pub mean: f64,
    pub std: f64,
}

/// Statistics of one axis for the raw and the conditioned signal.
/// `None` when the axis was not activated for the run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AxisStats {
    pub raw: Option<PhaseStats>,
    pub conditioned: Option<PhaseStats>,
}

/// Everything computed for one recording, handed to the record store.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub filename: String,
    pub parameters: Parameters,
    pub ruct: RuctResult,
    pub x: AxisStats,
    pub y: AxisStats,
    pub z: AxisStats,
}

impl FileRecord {
    pub fn axis(&self, axis: Axis) -> &AxisStats {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_tokens_resolve() {
        assert_eq!("0".parse::<Axis>().unwrap(), Axis::X);
        assert_eq!("Y".parse::<Axis>().unwrap(), Axis::Y);
        assert_eq!("axis z".parse::<Axis>().unwrap(), Axis::Z);
        assert_eq!("AxisX".parse::<Axis>().unwrap(), Axis::X);
        assert_eq!("axis_1".parse::<Axis>().unwrap(), Axis::Y);
        assert_eq!(Axis::from_index(2).unwrap(), Axis::Z);
    }

    #[test]
    fn unknown_axis_is_configuration_error() {
        for token in ["3", "", "w", "axis"] {
            let err = token.parse::<Axis>().unwrap_err();
            assert!(matches!(err, AnalysisError::Configuration(_)), "{token}");
        }
        assert!(Axis::from_index(5).is_err());
    }

    #[test]
    fn axis_deserializes_from_index_or_token() {
        let axes: Vec<Axis> = serde_json::from_str(r#"[0, "y", "Axis Z", 2]"#).unwrap();
        assert_eq!(axes, vec![Axis::X, Axis::Y, Axis::Z, Axis::Z]);
        assert!(serde_json::from_str::<Axis>(r#""w""#).is_err());
        assert!(serde_json::from_str::<Axis>("7").is_err());
    }

    #[test]
    fn window_rejects_empty_range() {
        assert!(Window::new(5, 5).is_err());
        assert!(Window::new(6, 5).is_err());
        let w = Window::new(2, 5).unwrap();
        assert_eq!(w.slice(&[0.0, 1.0, 2.0, 3.0]), &[2.0, 3.0]);
    }
}
