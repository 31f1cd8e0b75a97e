//! Extraction of the loudness normalizer's first-pass measurement from the
//! engine's diagnostic text.
//!
//! The engine prints the measurement as a JSON object somewhere in a stream of
//! unrelated log lines, some of which contain braces of their own (stream
//! metadata such as `title : Song {Live`). Candidates are located with a
//! balanced-brace scanner; a `{` that never balances or does not parse is
//! skipped and the scan resumes right after it. The last block that parses is
//! authoritative: if it lacks the measurement fields the result is an error,
//! even when an earlier block had them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// First-pass loudness figures fed back into the apply pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessMeasurement {
    pub input_i: f64,
    pub input_tp: f64,
    pub input_lra: f64,
    pub input_thresh: f64,
    pub target_offset: f64,
}

/// Why no measurement could be extracted
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasurementError {
    #[error("no JSON object found in engine diagnostics")]
    NoJsonObject,

    #[error("measurement field {0} is missing")]
    MissingField(&'static str),

    #[error("measurement field {field} has unusable value {value:?}")]
    InvalidField { field: &'static str, value: String },
}

const FIELDS: [&str; 5] = ["input_i", "input_tp", "input_lra", "input_thresh", "target_offset"];

/// Top-level JSON object slices of `text`, in order of appearance
///
/// Quotes and escapes are only tracked inside a candidate, so stray quotes in
/// surrounding log lines cannot desynchronize the scanner.
pub fn json_objects(text: &str) -> Vec<&str> {
    parsed_objects(text).into_iter().map(|(slice, _)| slice).collect()
}

/// The last JSON object in `text` that parses
pub fn last_json_block(text: &str) -> Option<Value> {
    parsed_objects(text).pop().map(|(_, value)| value)
}

/// Parse the measurement from the last JSON object in the diagnostics
pub fn parse_measurement(diagnostics: &str) -> Result<LoudnessMeasurement, MeasurementError> {
    let block = last_json_block(diagnostics).ok_or(MeasurementError::NoJsonObject)?;
    measurement_from(&block)
}

fn parsed_objects(text: &str) -> Vec<(&str, Value)> {
    let mut found = Vec::new();
    let mut from = 0usize;

    while let Some(offset) = text[from..].find('{') {
        let start = from + offset;
        if let Some(end) = balanced_end(text, start) {
            let candidate = &text[start..=end];
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(candidate) {
                found.push((candidate, value));
                from = end + 1;
                continue;
            }
        }
        from = start + 1;
    }
    found
}

/// Byte index of the `}` closing the `{` at `start`, if it closes at all
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn measurement_from(value: &Value) -> Result<LoudnessMeasurement, MeasurementError> {
    let mut numbers = [0.0f64; 5];
    for (slot, field) in numbers.iter_mut().zip(FIELDS) {
        *slot = field_value(value, field)?;
    }
    let [input_i, input_tp, input_lra, input_thresh, target_offset] = numbers;
    Ok(LoudnessMeasurement {
        input_i,
        input_tp,
        input_lra,
        input_thresh,
        target_offset,
    })
}

/// Fields arrive as JSON strings (`"-14.02"`) or plain numbers
fn field_value(value: &Value, field: &'static str) -> Result<f64, MeasurementError> {
    let raw = value.get(field).ok_or(MeasurementError::MissingField(field))?;
    let invalid = || MeasurementError::InvalidField {
        field,
        value: raw.to_string(),
    };

    let number = match raw {
        Value::Number(n) => n.as_f64().ok_or_else(invalid)?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };
    if number.is_finite() {
        Ok(number)
    } else {
        Err(invalid())
    }
}
