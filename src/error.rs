use thiserror::Error;

// ---------------------------------------------------------------------------
// AnalysisError – failures raised by the signal core
// ---------------------------------------------------------------------------

/// Errors produced by the conditioning, localization and RUCT stages.
///
/// The core never recovers from these: every stage propagates them so the
/// calling batch layer decides whether a file failure aborts the run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Missing or inconsistent configuration (bad axis token, filter
    /// cutoff above Nyquist, analysis window longer than the channel...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A value decoded from a filename or recording is out of range.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    /// No usable peaks, or no peak on one side of the cutting start.
    #[error("signal localization failed: {0}")]
    SignalLocalization(String),
}

impl AnalysisError {
    pub fn config(msg: impl Into<String>) -> Self {
        AnalysisError::Configuration(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        AnalysisError::DataIntegrity(msg.into())
    }

    pub fn localization(msg: impl Into<String>) -> Self {
        AnalysisError::SignalLocalization(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
