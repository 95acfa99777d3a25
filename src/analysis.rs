use std::path::Path;

use anyhow::{Context, Result};
use log::debug;

use crate::config::Config;
use crate::data::loader::load_recording;
use crate::data::model::{Axis, AxisStats, FileRecord, PhaseStats, Window};
use crate::data::params::extract_parameters;
use crate::ruct::{Diagnostics, RuctPipeline};
use crate::signal::prepare::ChannelPreparer;
use crate::signal::stats::{mean, round_to, std_dev};

// ---------------------------------------------------------------------------
// Per-file analysis
// ---------------------------------------------------------------------------

/// Result of analysing one recording.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub record: FileRecord,
    pub diagnostics: Option<Diagnostics>,
}

/// Analyses recordings with one configuration. Shareable across threads:
/// every call owns its channels.
pub struct FileAnalyzer<'a> {
    config: &'a Config,
    preparer: ChannelPreparer,
}

impl<'a> FileAnalyzer<'a> {
    pub fn new(config: &'a Config) -> Result<Self> {
        let preparer = ChannelPreparer::new(config).context("building channel preparer")?;
        Ok(FileAnalyzer { config, preparer })
    }

    /// Run the RUCT pipeline and the force statistics for one file.
    pub fn analyze(&self, path: &Path) -> Result<FileAnalysis> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("{} has no UTF-8 file name", path.display()))?;

        let parameters = extract_parameters(filename, &self.config.filename)
            .with_context(|| format!("decoding parameters of {filename}"))?;
        let recording = load_recording(path, self.config)?;
        let speed = f64::from(parameters.cutting_speed);

        let ruct = RuctPipeline::new(self.config, &self.preparer)
            .run(&parameters, &recording)
            .with_context(|| format!("estimating chip thickness of {filename}"))?;

        // Y defines the engagement window for every axis.
        let y_raw = recording.axis(Axis::Y);
        let y = self
            .preparer
            .prepare_with(Axis::Y, y_raw, speed, self.config.signal.force_scanner)
            .with_context(|| format!("preparing axis y of {filename}"))?;
        let window = y.window;
        debug!(
            "{filename}: cutting start {}, force window [{}, {})",
            ruct.cutting_start, window.start, window.stop
        );

        let mut stats = [AxisStats::default(); 3];
        stats[Axis::Y.index()] = self.axis_stats(y_raw, &y.data, window);

        for axis in [Axis::X, Axis::Z] {
            if !self.config.activate.is_active(axis) {
                continue;
            }
            let raw = recording.axis(axis);
            let prepared = self
                .preparer
                .prepare_with(axis, raw, speed, self.config.signal.force_scanner)
                .with_context(|| format!("preparing axis {axis} of {filename}"))?;
            stats[axis.index()] = self.axis_stats(raw, &prepared.data, window);
        }

        let [x, y, z] = stats;
        Ok(FileAnalysis {
            record: FileRecord {
                filename: filename.to_string(),
                parameters,
                ruct: ruct.result,
                x,
                y,
                z,
            },
            diagnostics: ruct.diagnostics,
        })
    }

    fn axis_stats(&self, raw: &[f64], conditioned: &[f64], window: Window) -> AxisStats {
        AxisStats {
            raw: self.phase_stats(window.slice(raw)),
            conditioned: self.phase_stats(window.slice(conditioned)),
        }
    }

    fn phase_stats(&self, data: &[f64]) -> Option<PhaseStats> {
        let decimals = &self.config.decimals;
        Some(PhaseStats {
            mean: round_to(mean(data)?, decimals.mean),
            std: round_to(std_dev(data)?, decimals.std),
        })
    }
}
