use std::sync::Mutex;

use serde::Serialize;

use crate::data::model::{Axis, FileRecord, PhaseStats};

// ---------------------------------------------------------------------------
// RecordRow – one flat output row per recording
// ---------------------------------------------------------------------------

/// Flat row of the results table. Index `0` columns describe the raw
/// signal, index `1` columns the conditioned one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordRow {
    pub filename: String,
    pub cutting_speed: u32,
    pub fibre_angle: Option<f64>,
    pub moisture_content: Option<u32>,
    pub repetition_no: Option<i64>,
    pub species: Option<String>,
    pub tool: Option<String>,
    /// Nominal uncut chip thickness.
    pub uncut_chip_thickness_0: Option<f64>,
    /// Measured (real) uncut chip thickness.
    pub uncut_chip_thickness_1: f64,
    pub ruct_ratio_pct: f64,
    pub axis_x_mean_0: Option<f64>,
    pub axis_y_mean_0: Option<f64>,
    pub axis_z_mean_0: Option<f64>,
    pub axis_x_std_0: Option<f64>,
    pub axis_y_std_0: Option<f64>,
    pub axis_z_std_0: Option<f64>,
    pub axis_x_mean_1: Option<f64>,
    pub axis_y_mean_1: Option<f64>,
    pub axis_z_mean_1: Option<f64>,
    pub axis_x_std_1: Option<f64>,
    pub axis_y_std_1: Option<f64>,
    pub axis_z_std_1: Option<f64>,
}

impl From<&FileRecord> for RecordRow {
    fn from(rec: &FileRecord) -> Self {
        let raw = |axis: Axis| rec.axis(axis).raw;
        let cond = |axis: Axis| rec.axis(axis).conditioned;
        let mean = |s: Option<PhaseStats>| s.map(|s| s.mean);
        let std = |s: Option<PhaseStats>| s.map(|s| s.std);
        let p = &rec.parameters;

        RecordRow {
            filename: rec.filename.clone(),
            cutting_speed: p.cutting_speed,
            fibre_angle: p.fibre_angle,
            moisture_content: p.moisture_content,
            repetition_no: p.repetition_no,
            species: p.species.clone(),
            tool: p.tool.clone(),
            uncut_chip_thickness_0: p.uncut_chip_thickness,
            uncut_chip_thickness_1: rec.ruct.ruct,
            ruct_ratio_pct: rec.ruct.ratio_pct,
            axis_x_mean_0: mean(raw(Axis::X)),
            axis_y_mean_0: mean(raw(Axis::Y)),
            axis_z_mean_0: mean(raw(Axis::Z)),
            axis_x_std_0: std(raw(Axis::X)),
            axis_y_std_0: std(raw(Axis::Y)),
            axis_z_std_0: std(raw(Axis::Z)),
            axis_x_mean_1: mean(cond(Axis::X)),
            axis_y_mean_1: mean(cond(Axis::Y)),
            axis_z_mean_1: mean(cond(Axis::Z)),
            axis_x_std_1: std(cond(Axis::X)),
            axis_y_std_1: std(cond(Axis::Y)),
            axis_z_std_1: std(cond(Axis::Z)),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordStore – shared sink of all pipeline runs
// ---------------------------------------------------------------------------

/// In-memory results table. The only state shared between concurrent
/// file pipelines; every insertion takes the lock.
#[derive(Debug, Default)]
pub struct RecordStore {
    rows: Mutex<Vec<RecordRow>>,
}

impl RecordStore {
    pub fn insert(&self, record: &FileRecord) {
        let row = RecordRow::from(record);
        self.rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(row);
    }

    /// Take the rows out, sorted by filename so parallel runs export in a
    /// stable order.
    pub fn into_rows(self) -> Vec<RecordRow> {
        let mut rows = self
            .rows
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        rows.sort_by(|a, b| a.filename.cmp(&b.filename));
        rows
    }
}
