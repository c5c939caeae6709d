//! # Sonar Sweep Core Library
//!
//! This crate drives a Ping360 scanning sonar through one sector sweep and
//! turns the device responses into a per-angle intensity table. The binary
//! (`main.rs`) is a thin CLI over the pieces below, so the same pipeline runs
//! against real hardware, the simulator, or a saved raw dump.
//!
//! ## Crate Structure
//!
//! - **`acoustics`**: Speed of sound in water and the sample period that
//!   spreads the requested samples over the requested range.
//! - **`acquisition`**: Pushes ping settings to the device and sweeps an
//!   inclusive angle range, one blocking ping per angle.
//! - **`config`**: Layered configuration (defaults, TOML file, environment)
//!   via `figment`. See `config::SonarConfig`.
//! - **`data`**: Scan records, the raw dump writer and parser, and the
//!   semicolon-separated results table.
//! - **`error`**: The `SonarError` enum shared by the library.
//! - **`hardware`**: The `ScanningSonar` capability trait, the Ping wire
//!   protocol, the serial Ping360 driver and a mock head.
//! - **`logging`**: `tracing` subscriber setup.
//! - **`session`**: One run end to end, including output file naming.

pub mod acoustics;
pub mod acquisition;
pub mod config;
pub mod data;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod session;
