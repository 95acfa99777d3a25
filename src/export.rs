use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};

use crate::ruct::Diagnostics;
use crate::store::RecordRow;

/// Output table format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }
}

/// Refuse to clobber earlier results unless asked to.
pub fn ensure_writable(path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        bail!(
            "{} already exists; move, delete or rename it, or pass --overwrite",
            path.display()
        );
    }
    Ok(())
}

pub fn write_table(path: &Path, rows: &[RecordRow], format: ExportFormat) -> Result<()> {
    match format {
        ExportFormat::Csv => write_csv(path, rows),
        ExportFormat::Parquet => write_parquet(path, rows),
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

const COLUMNS: [&str; 22] = [
    "filename",
    "cutting_speed",
    "fibre_angle",
    "moisture_content",
    "repetition_no",
    "species",
    "tool",
    "uncut_chip_thickness_0",
    "uncut_chip_thickness_1",
    "ruct_ratio_pct",
    "axis_x_mean_0",
    "axis_y_mean_0",
    "axis_z_mean_0",
    "axis_x_std_0",
    "axis_y_std_0",
    "axis_z_std_0",
    "axis_x_mean_1",
    "axis_y_mean_1",
    "axis_z_mean_1",
    "axis_x_std_1",
    "axis_y_std_1",
    "axis_z_std_1",
];

/// Header row plus one row per recording; missing values are empty cells.
fn write_csv(path: &Path, rows: &[RecordRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    if rows.is_empty() {
        writer.write_record(COLUMNS).context("writing CSV header")?;
    }
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("writing row for {}", row.filename))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Arrow view of the results table; the columns follow [`COLUMNS`].
fn record_batch(rows: &[RecordRow]) -> Result<RecordBatch> {
    let float = |get: fn(&RecordRow) -> Option<f64>| -> ArrayRef {
        Arc::new(Float64Array::from(rows.iter().map(get).collect::<Vec<_>>()))
    };
    let int = |get: fn(&RecordRow) -> Option<i64>| -> ArrayRef {
        Arc::new(Int64Array::from(rows.iter().map(get).collect::<Vec<_>>()))
    };
    let text = |get: fn(&RecordRow) -> Option<&str>| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(get).collect::<Vec<_>>()))
    };

    let arrays: Vec<ArrayRef> = vec![
        text(|r| Some(r.filename.as_str())),
        int(|r| Some(i64::from(r.cutting_speed))),
        float(|r| r.fibre_angle),
        int(|r| r.moisture_content.map(i64::from)),
        int(|r| r.repetition_no),
        text(|r| r.species.as_deref()),
        text(|r| r.tool.as_deref()),
        float(|r| r.uncut_chip_thickness_0),
        float(|r| Some(r.uncut_chip_thickness_1)),
        float(|r| Some(r.ruct_ratio_pct)),
        float(|r| r.axis_x_mean_0),
        float(|r| r.axis_y_mean_0),
        float(|r| r.axis_z_mean_0),
        float(|r| r.axis_x_std_0),
        float(|r| r.axis_y_std_0),
        float(|r| r.axis_z_std_0),
        float(|r| r.axis_x_mean_1),
        float(|r| r.axis_y_mean_1),
        float(|r| r.axis_z_mean_1),
        float(|r| r.axis_x_std_1),
        float(|r| r.axis_y_std_1),
        float(|r| r.axis_z_std_1),
    ];

    let required = ["filename", "cutting_speed", "uncut_chip_thickness_1", "ruct_ratio_pct"];
    let fields: Vec<Field> = COLUMNS
        .iter()
        .zip(&arrays)
        .map(|(name, array)| {
            Field::new(*name, array.data_type().clone(), !required.contains(name))
        })
        .collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).context("building record batch")
}

fn write_parquet(path: &Path, rows: &[RecordRow]) -> Result<()> {
    let batch = record_batch(rows)?;
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

/// Results rendered as a text table for the log.
pub fn preview(rows: &[RecordRow]) -> Result<String> {
    let batch = record_batch(rows)?;
    let table = pretty_format_batches(&[batch]).context("formatting results")?;
    Ok(table.to_string())
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Write the peaks, events and ranges of one file as `<dir>/<stem>.json`.
pub fn write_diagnostics(dir: &Path, filename: &str, diagnostics: &Diagnostics) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let path = dir.join(format!("{stem}.json"));
    let file = std::fs::File::create(&path)
        .with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), diagnostics)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::sample_record;
    use parquet::file::reader::{FileReader, SerializedFileReader};

    fn rows() -> Vec<RecordRow> {
        vec![
            RecordRow::from(&sample_record("a.txt")),
            RecordRow::from(&sample_record("b.txt")),
        ]
    }

    #[test]
    fn csv_has_header_and_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_table(&path, &rows(), ExportFormat::Csv).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), COLUMNS.join(","));
        let first = lines.next().unwrap();
        assert!(first.starts_with("a.txt,50,45.0,,,spruce,,0.3,0.28,-6.67,,30.5,"));
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn empty_csv_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_table(&path, &[], ExportFormat::Csv).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), COLUMNS.join(","));
    }

    #[test]
    fn parquet_round_trip_row_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        write_table(&path, &rows(), ExportFormat::Parquet).unwrap();

        let reader = SerializedFileReader::new(std::fs::File::open(&path).unwrap()).unwrap();
        let meta = reader.metadata();
        assert_eq!(meta.file_metadata().num_rows(), 2);
        assert_eq!(meta.file_metadata().schema_descr().num_columns(), COLUMNS.len());
    }

    #[test]
    fn preview_lists_every_row() {
        let table = preview(&rows()).unwrap();
        assert!(table.contains("uncut_chip_thickness_1"));
        assert!(table.contains("a.txt"));
        assert!(table.contains("b.txt"));
    }

    #[test]
    fn existing_output_is_protected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        ensure_writable(&path, false).unwrap();
        std::fs::write(&path, "x").unwrap();
        assert!(ensure_writable(&path, false).is_err());
        ensure_writable(&path, true).unwrap();
    }
}
