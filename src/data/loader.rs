use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::config::{ChannelMap, Config};

use super::model::Recording;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the four mapped channels of a recording in a single pass.
///
/// Layout: one row per sample, no header, columns separated by the
/// configured delimiter. Columns beyond the mapped ones are ignored.
pub fn load_recording(path: &Path, config: &Config) -> Result<Recording> {
    let rows = read_rows(path, config.delimiter, config.max_column())?;
    Ok(split_channels(&rows, &config.channels))
}

// ---------------------------------------------------------------------------
// Delimited text reader
// ---------------------------------------------------------------------------

fn read_rows(path: &Path, delimiter: char, max_column: usize) -> Result<Vec<Vec<f64>>> {
    if !delimiter.is_ascii() {
        bail!("Delimiter '{delimiter}' is not a single-byte character");
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter as u8)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening recording {}", path.display()))?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("{}: row {row_no}", path.display()))?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        if record.len() <= max_column {
            bail!(
                "{}: row {row_no} has {} columns, column {max_column} is required",
                path.display(),
                record.len()
            );
        }

        let row = record
            .iter()
            .take(max_column + 1)
            .enumerate()
            .map(|(col, cell)| {
                cell.parse::<f64>().with_context(|| {
                    format!("{}: row {row_no}, column {col}: '{cell}' is not a number", path.display())
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }

    if rows.is_empty() {
        bail!("{} contains no samples", path.display());
    }
    Ok(rows)
}

fn split_channels(rows: &[Vec<f64>], map: &ChannelMap) -> Recording {
    let column = |idx: usize| rows.iter().map(|row| row[idx]).collect::<Vec<f64>>();
    Recording {
        x: column(map.x),
        y: column(map.y),
        z: column(map.z),
        distance: column(map.distance),
    }
}
