//! Data pipeline integration tests
//!
//! Responses go to a raw dump on disk, the dump is parsed back, and the
//! records land in the results table.
//!
//! # Test Coverage
//!
//! - Full simulated run into a temporary output directory
//! - Re-parsing a saved raw dump gives the same table
//! - Hand-written dumps, including malformed ones

use sonar_sweep::config::SonarConfig;
use sonar_sweep::data::{parse_dump, read_dump, save_results, write_raw_dump, RESULTS_HEADER};
use sonar_sweep::error::SonarError;
use sonar_sweep::hardware::mock::MockSonar;
use sonar_sweep::hardware::ping_protocol::DeviceData;
use sonar_sweep::session::{convert_dump, results_path_for, run_acquisition};

fn response(angle: u16, data: Vec<u8>) -> DeviceData {
    DeviceData {
        mode: 1,
        gain_setting: 1,
        angle,
        transmit_duration: 16,
        sample_period: 91,
        transmit_frequency: 1000,
        number_of_samples: data.len() as u16,
        data,
    }
}

#[tokio::test]
async fn simulated_run_produces_results_table() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SonarConfig::default();
    config.output.directory = dir.path().join("data");

    let summary = run_acquisition(&MockSonar::new(), &config).await.unwrap();

    assert_eq!(summary.pings, 101);
    assert_eq!(summary.records, 101);

    let raw_name = summary.paths.raw.file_name().unwrap().to_string_lossy();
    let results_name = summary.paths.results.file_name().unwrap().to_string_lossy();
    assert_eq!(results_name, raw_name.replace(".csv", "_Results.csv"));

    let text = std::fs::read_to_string(&summary.paths.results).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines[0], "Angle (gradian);Intensity (0-255)");
    assert_eq!(lines.len(), 102);
    assert!(lines[1].starts_with("150;"));
    assert!(lines[101].starts_with("250;"));
    assert_eq!(lines[1].split(';').count(), 1201);
}

#[test]
fn reparsing_raw_dump_matches_written_responses() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("run.csv");
    let responses = vec![
        response(150, vec![0x0a, 0x1b, 0xff]),
        response(151, vec![0, 1]),
    ];

    write_raw_dump(&raw, &responses).unwrap();
    let records = read_dump(&raw).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].angle, "150");
    assert_eq!(records[0].samples, vec![10, 27, 255]);
    assert_eq!(records[1].angle, "151");
    assert_eq!(records[1].samples, vec![0, 1]);

    let results = results_path_for(&raw);
    let conversion = convert_dump(&raw, &results).unwrap();
    assert_eq!(conversion.rows, 2);
    let strongest = conversion.strongest.unwrap();
    assert_eq!((strongest.angle.as_str(), strongest.sample), ("150", 2));
    let text = std::fs::read_to_string(results).unwrap();
    assert_eq!(
        text.lines().collect::<Vec<_>>(),
        [
            "Angle (gradian);Intensity (0-255)",
            "150;10;27;255",
            "151;0;1"
        ]
    );
}

#[test]
fn hand_written_dump_pairs_data_with_latest_angle() {
    let text = "\
  - angle: 150
  - data: [0A, 1B]
  - angle: 151
  - data: ['0x01']
  - data: ['0x02']
";
    let records = parse_dump(text).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].to_row(), ["150", "10", "27"]);
    assert_eq!(records[1].to_row(), ["151", "1"]);
    assert_eq!(records[2].to_row(), ["151", "2"]);
}

#[test]
fn dump_without_markers_gives_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");

    let records = parse_dump("nothing to see here\n").unwrap();
    assert!(records.is_empty());

    save_results(&path, &RESULTS_HEADER, &records).unwrap();
    let text = std::fs::read_to_string(path).unwrap();
    assert_eq!(text.lines().count(), 1);
}

#[test]
fn data_before_angle_is_rejected() {
    let err = parse_dump("  - data: [0A]\n  - angle: 3\n").unwrap_err();
    assert!(matches!(err, SonarError::DataBeforeAngle { line: 1 }));
    assert!(err.is_dump_format());
}

#[test]
fn non_hex_sample_is_rejected() {
    let err = parse_dump("  - angle: 3\n  - data: [0A, zz]\n").unwrap_err();
    match err {
        SonarError::InvalidSample { line, token } => {
            assert_eq!(line, 2);
            assert_eq!(token, "zz");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_raw_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_dump(&dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, SonarError::Io(_)));
}
