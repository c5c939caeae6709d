//! Data layer: scan records, the raw dump, and the results table.
//!
//! ```text
//!  DeviceData per ping
//!        │ write_raw_dump
//!        ▼
//!   <timestamp>.csv          one CSV row, one rendered response per field
//!        │ read_dump / parse_dump
//!        ▼
//!   Vec<ScanRecord>          (angle, samples) in sweep order
//!        │ save_results
//!        ▼
//!   <timestamp>_Results.csv  Angle (gradian);Intensity (0-255)
//! ```
pub mod dump;
pub mod model;
pub mod storage;

pub use dump::{parse_dump, read_dump, write_raw_dump};
pub use model::ScanRecord;
pub use storage::{save_results, ResultsCsvWriter, RESULTS_HEADER};
