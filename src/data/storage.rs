//! Results table writer.
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::data::model::ScanRecord;
use crate::error::AppResult;

/// Column header of the results table.
pub const RESULTS_HEADER: [&str; 2] = ["Angle (gradian)", "Intensity (0-255)"];

/// Field separator of the results table.
pub const RESULTS_DELIMITER: u8 = b';';

/// A writer for the semicolon-separated results table.
///
/// Rows are ragged: the header has two columns while each record carries
/// its angle followed by every sample.
pub struct ResultsCsvWriter {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    rows: usize,
}

impl ResultsCsvWriter {
    /// Create (or truncate) `path` and write the header row.
    pub fn create(path: &Path, header: &[&str]) -> AppResult<Self> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(RESULTS_DELIMITER)
            .flexible(true)
            .from_path(path)?;
        writer.write_record(header)?;
        tracing::debug!(path = %path.display(), "results file created");
        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(writer),
            rows: 0,
        })
    }

    /// Append one record.
    pub fn write(&mut self, record: &ScanRecord) -> AppResult<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.write_record(record.to_row())?;
            self.rows += 1;
        }
        Ok(())
    }

    /// Flush and close the file. Returns the number of records written.
    pub fn finish(mut self) -> AppResult<usize> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        tracing::info!(path = %self.path.display(), rows = self.rows, "results written");
        Ok(self.rows)
    }
}

/// Write `header` followed by one row per record.
pub fn save_results(path: &Path, header: &[&str], records: &[ScanRecord]) -> AppResult<usize> {
    let mut writer = ResultsCsvWriter::create(path, header)?;
    for record in records {
        writer.write(record)?;
    }
    writer.finish()
}
