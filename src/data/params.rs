use std::str::FromStr;

use crate::config::{FilenameLayout, Span};
use crate::error::{AnalysisError, Result};

use super::model::Parameters;

/// Decode the experiment parameters from a filename using fixed ranges.
///
/// Validation:
/// * cutting speed is required and must lie in `(0, 100]` m/s
/// * fibre angle must lie in `[0, 90]` degrees
/// * moisture content and chip thickness must be non-negative
pub fn extract_parameters(filename: &str, layout: &FilenameLayout) -> Result<Parameters> {
    let speed_span = layout.cutting_speed.ok_or_else(|| {
        AnalysisError::config("cutting speed is essential and must not be omitted")
    })?;
    let cutting_speed: i64 = parse_field(filename, speed_span, "cutting speed")?;
    if cutting_speed <= 0 || cutting_speed > 100 {
        return Err(AnalysisError::integrity(format!(
            "cutting speed equals {cutting_speed} m/s; make sure that correct indexes are given"
        )));
    }

    let fibre_angle = optional::<f64>(filename, layout.fibre_angle, "fibre angle")?;
    if let Some(angle) = fibre_angle {
        if !(0.0..=90.0).contains(&angle) {
            return Err(AnalysisError::integrity(format!(
                "fibre angle should be between 0° and 90°, got {angle}°"
            )));
        }
    }

    let moisture = optional::<i64>(filename, layout.moisture_content, "moisture content")?;
    let moisture_content = match moisture {
        Some(m) if m < 0 => {
            return Err(AnalysisError::integrity(format!(
                "moisture content equals {m}; make sure that correct indexes are given"
            )))
        }
        Some(m) => Some(m as u32),
        None => None,
    };

    let repetition_no = optional::<i64>(filename, layout.repetition_no, "repetition number")?;

    let species = layout
        .species
        .map(|span| field(filename, span, "species").map(str::to_lowercase))
        .transpose()?;
    let tool = layout
        .tool
        .map(|span| field(filename, span, "tool").map(str::to_lowercase))
        .transpose()?;

    let uncut_chip_thickness = layout
        .uncut_chip_thickness
        .map(|span| parse_thickness(field(filename, span, "uncut chip thickness")?))
        .transpose()?;

    Ok(Parameters {
        cutting_speed: cutting_speed as u32,
        fibre_angle,
        moisture_content,
        repetition_no,
        species,
        tool,
        uncut_chip_thickness,
    })
}

/// `0-35` means 0.35; `03` means tenths, i.e. 0.3.
fn parse_thickness(raw: &str) -> Result<f64> {
    let value = if raw.contains('-') {
        parse_str::<f64>(&raw.replace('-', "."), "uncut chip thickness")?
    } else {
        parse_str::<f64>(raw, "uncut chip thickness")? / 10.0
    };
    if value < 0.0 {
        return Err(AnalysisError::integrity(format!(
            "uncut chip thickness equals {value}; make sure that correct indexes are given"
        )));
    }
    Ok(value)
}

fn field<'a>(filename: &'a str, [from, to]: Span, name: &str) -> Result<&'a str> {
    filename.get(from..to).ok_or_else(|| {
        AnalysisError::integrity(format!(
            "{name}: range {from}..{to} is outside filename \"{filename}\""
        ))
    })
}

fn parse_str<T: FromStr>(raw: &str, name: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| AnalysisError::integrity(format!("{name}: '{raw}' is not a number")))
}

fn parse_field<T: FromStr>(filename: &str, span: Span, name: &str) -> Result<T> {
    parse_str(field(filename, span, name)?, name)
}

fn optional<T: FromStr>(filename: &str, span: Option<Span>, name: &str) -> Result<Option<T>> {
    span.map(|s| parse_field(filename, s, name)).transpose()
}
