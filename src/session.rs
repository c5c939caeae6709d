//! One acquisition run, end to end.
//!
//! A run computes the acoustic parameters, configures the sonar, sweeps the
//! configured angles, then writes two files into the output directory:
//!
//! - **`<timestamp>.csv`**: the raw dump, every response rendered as text in
//!   one CSV row.
//! - **`<timestamp>_Results.csv`**: the dump parsed back into one
//!   `angle;sample;sample;...` row per response.
//!
//! The timestamp is local time formatted as `%Y-%m-%d %H-%M-%S`. The results
//! table is always produced by re-reading the raw file from disk, so
//! [`convert_dump`] on a saved raw file yields the same table as the run did.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use crate::acoustics::AcousticParameters;
use crate::acquisition::{configure_sonar, sweep, PingSettings};
use crate::config::SonarConfig;
use crate::data::{read_dump, save_results, write_raw_dump, ScanRecord, RESULTS_HEADER};
use crate::hardware::capabilities::ScanningSonar;

/// Timestamp format used for run file names.
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H-%M-%S";

/// Suffix appended to the raw file stem for the results table.
pub const RESULTS_SUFFIX: &str = "_Results";

/// File locations for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    /// `<timestamp>.csv`
    pub raw: PathBuf,
    /// `<timestamp>_Results.csv`
    pub results: PathBuf,
}

impl RunPaths {
    /// Paths for a run started at `started`.
    pub fn for_timestamp(directory: &Path, started: DateTime<Local>) -> Self {
        let stamp = started.format(RUN_TIMESTAMP_FORMAT).to_string();
        Self {
            raw: directory.join(format!("{stamp}.csv")),
            results: directory.join(format!("{stamp}{RESULTS_SUFFIX}.csv")),
        }
    }

    /// Paths for a run starting now, creating `directory` if needed.
    pub fn create(directory: &Path) -> Result<Self> {
        std::fs::create_dir_all(directory).with_context(|| {
            format!("Failed to create output directory '{}'", directory.display())
        })?;
        Ok(Self::for_timestamp(directory, Local::now()))
    }
}

/// Default results path for an existing raw dump: `<stem>_Results.csv`
/// next to it.
pub fn results_path_for(raw: &Path) -> PathBuf {
    let stem = raw
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    raw.with_file_name(format!("{stem}{RESULTS_SUFFIX}.csv"))
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Values the device was configured from
    pub parameters: AcousticParameters,
    /// Files written
    pub paths: RunPaths,
    /// Responses received
    pub pings: usize,
    /// Rows in the results table
    pub records: usize,
    /// Brightest sample of the sweep
    pub strongest: Option<StrongestEcho>,
}

/// Brightest sample across a set of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrongestEcho {
    /// Angle text of the record holding it
    pub angle: String,
    /// Sample index within that record
    pub sample: usize,
    /// Intensity (0-255)
    pub intensity: u8,
}

/// The brightest sample over all records. Ties go to the earliest record.
pub fn strongest_echo(records: &[ScanRecord]) -> Option<StrongestEcho> {
    let mut best: Option<StrongestEcho> = None;
    for record in records {
        if let Some((sample, intensity)) = record.peak() {
            if best.as_ref().map_or(true, |b| intensity > b.intensity) {
                best = Some(StrongestEcho {
                    angle: record.angle.clone(),
                    sample,
                    intensity,
                });
            }
        }
    }
    best
}

/// Outcome of turning a raw dump into a results table.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Rows written below the header
    pub rows: usize,
    /// Brightest sample in the dump
    pub strongest: Option<StrongestEcho>,
}

/// Parse a raw dump and write its results table.
pub fn convert_dump(raw: &Path, results: &Path) -> Result<Conversion> {
    let records = read_dump(raw).map_err(|e| {
        let what = if e.is_dump_format() {
            "Malformed raw dump"
        } else {
            "Failed to read raw dump"
        };
        anyhow::Error::new(e).context(format!("{what} '{}'", raw.display()))
    })?;
    let rows = save_results(results, &RESULTS_HEADER, &records)
        .with_context(|| format!("Failed to write results '{}'", results.display()))?;

    let strongest = strongest_echo(&records);
    if let Some(echo) = &strongest {
        tracing::info!(
            angle = %echo.angle,
            sample = echo.sample,
            intensity = echo.intensity,
            "strongest echo"
        );
    }
    Ok(Conversion { rows, strongest })
}

/// Run the full acquisition against `sonar` using `config`.
///
/// Any failure aborts the run. Files already written stay on disk.
pub async fn run_acquisition<S>(sonar: &S, config: &SonarConfig) -> Result<RunSummary>
where
    S: ScanningSonar + ?Sized,
{
    let parameters = config.acoustic_parameters();
    tracing::info!(
        speed_of_sound = parameters.speed_of_sound,
        sample_distance = parameters.sample_distance,
        sample_period = parameters.sample_period,
        "acoustic parameters"
    );

    let info = sonar.initialize().await.context("Sonar initialization failed")?;
    tracing::debug!(?info, "sonar ready");

    configure_sonar(sonar, &PingSettings::from_config(config)).await?;
    let responses = sweep(sonar, config.sweep_angles()).await?;

    let paths = RunPaths::create(&config.output.directory)?;
    write_raw_dump(&paths.raw, &responses)
        .with_context(|| format!("Failed to write raw dump '{}'", paths.raw.display()))?;
    let conversion = convert_dump(&paths.raw, &paths.results)?;

    tracing::info!(
        raw = %paths.raw.display(),
        results = %paths.results.display(),
        records = conversion.rows,
        "run complete"
    );

    Ok(RunSummary {
        parameters,
        paths,
        pings: responses.len(),
        records: conversion.rows,
        strongest: conversion.strongest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::MockSonar;
    use chrono::TimeZone;

    #[test]
    fn run_paths_use_timestamp() {
        let started = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let paths = RunPaths::for_timestamp(Path::new("data"), started);
        assert_eq!(paths.raw, Path::new("data/2024-03-05 14-07-09.csv"));
        assert_eq!(
            paths.results,
            Path::new("data/2024-03-05 14-07-09_Results.csv")
        );
    }

    #[test]
    fn results_path_sits_next_to_raw() {
        assert_eq!(
            results_path_for(Path::new("out/run.csv")),
            Path::new("out/run_Results.csv")
        );
    }

    #[test]
    fn create_makes_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let paths = RunPaths::create(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(paths.raw.parent(), Some(nested.as_path()));
    }

    #[test]
    fn strongest_echo_spans_records() {
        let records = vec![
            ScanRecord::new("150", vec![3, 40, 7]),
            ScanRecord::new("151", vec![]),
            ScanRecord::new("152", vec![1, 2, 90, 90]),
            ScanRecord::new("153", vec![90]),
        ];
        assert_eq!(
            strongest_echo(&records),
            Some(StrongestEcho {
                angle: "152".to_string(),
                sample: 2,
                intensity: 90,
            })
        );
        assert_eq!(strongest_echo(&[]), None);
    }

    #[test]
    fn malformed_dump_is_reported_as_such() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("bad.csv");
        std::fs::write(&raw, "  - data: [0A]\n").unwrap();

        let err = convert_dump(&raw, &results_path_for(&raw)).unwrap_err();
        assert!(err.to_string().starts_with("Malformed raw dump"), "{err}");
        assert!(matches!(
            err.downcast_ref::<crate::error::SonarError>(),
            Some(crate::error::SonarError::DataBeforeAngle { line: 1 })
        ));

        let missing = dir.path().join("absent.csv");
        let err = convert_dump(&missing, &results_path_for(&missing)).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read raw dump"), "{err}");
    }

    #[tokio::test]
    async fn run_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SonarConfig::default();
        config.output.directory = dir.path().to_path_buf();
        config.acquisition.number_of_samples = 32;
        config.acquisition.start_angle = 10;
        config.acquisition.stop_angle = 14;

        let sonar = MockSonar::new();
        let summary = run_acquisition(&sonar, &config).await.unwrap();

        assert_eq!(summary.pings, 5);
        assert_eq!(summary.records, 5);
        assert!(summary.paths.raw.exists());

        let text = std::fs::read_to_string(&summary.paths.results).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[1].starts_with("10;"));
        assert_eq!(lines[5].split(';').count(), 33);

        let strongest = summary.strongest.unwrap();
        assert_eq!(strongest.intensity, 255);
        assert_eq!(strongest.angle, "10");
    }

    #[tokio::test]
    async fn failed_sweep_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SonarConfig::default();
        config.output.directory = dir.path().join("out");

        let sonar = MockSonar::new().failing_at(160);
        assert!(run_acquisition(&sonar, &config).await.is_err());
        assert!(!config.output.directory.exists());
    }
}
