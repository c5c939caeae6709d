//! Raw sweep dump: writer and parser.
//!
//! The raw file keeps every device response exactly as rendered text, all in
//! one CSV row. Turning it back into a table is a line scan: an `- angle:` line
//! sets the current angle, and each following `- data:` line becomes one
//! [`ScanRecord`] for that angle.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::data::model::ScanRecord;
use crate::error::{AppResult, SonarError};
use crate::hardware::ping_protocol::DeviceData;

static ANGLE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"- angle:(.*)").expect("Invalid angle marker regex"));
static DATA_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"- data:(.*)").expect("Invalid data marker regex"));
/// Brackets, quotes and spaces around the hex list
static SAMPLE_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\[\]' ]").expect("Invalid sample noise regex"));

/// Write all responses as a single CSV row, one field per response.
pub fn write_raw_dump(path: &Path, responses: &[DeviceData]) -> AppResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(responses.iter().map(|r| r.to_string()))?;
    writer.flush()?;
    tracing::info!(path = %path.display(), responses = responses.len(), "raw dump written");
    Ok(())
}

/// Read and parse a raw dump file.
pub fn read_dump(path: &Path) -> AppResult<Vec<ScanRecord>> {
    let text = std::fs::read_to_string(path)?;
    parse_dump(&text)
}

/// Scan dump text into records, in file order.
///
/// A `data` line with no earlier `angle` line is an error. An empty sample
/// list yields a record with no samples.
pub fn parse_dump(text: &str) -> AppResult<Vec<ScanRecord>> {
    let mut angle: Option<String> = None;
    let mut records = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;

        if let Some(caps) = ANGLE_MARKER.captures(line) {
            angle = Some(caps[1].trim().to_string());
        }

        if let Some(caps) = DATA_MARKER.captures(line) {
            let current = angle
                .clone()
                .ok_or(SonarError::DataBeforeAngle { line: line_no })?;
            let samples = parse_samples(&caps[1], line_no)?;
            records.push(ScanRecord::new(current, samples));
        }
    }

    tracing::debug!(records = records.len(), "dump parsed");
    Ok(records)
}

fn parse_samples(list: &str, line_no: usize) -> AppResult<Vec<u8>> {
    let cleaned = SAMPLE_NOISE.replace_all(list, "");
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }

    cleaned
        .split(',')
        .map(|token| {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            u8::from_str_radix(digits, 16).map_err(|_| SonarError::InvalidSample {
                line: line_no,
                token: token.to_string(),
            })
        })
        .collect()
}
