//! Configuration System using Figment
//!
//! Strongly-typed settings for one sweep. Sources are layered, later ones
//! overriding earlier ones:
//! 1. Built-in defaults (the water conditions and device settings of the
//!    reference setup: 16 °C fresh water, 2 m range, 1200 samples, COM4)
//! 2. A TOML file (`config/sonar.toml` unless another path is given)
//! 3. Environment variables prefixed with `SONAR_SWEEP_`, using `__` between
//!    levels (e.g. `SONAR_SWEEP_DEVICE__PORT=/dev/ttyUSB0`)
//!
//! # Example
//! ```no_run
//! use sonar_sweep::config::SonarConfig;
//!
//! let config = SonarConfig::load()?;
//! println!("Port: {}", config.device.port);
//! # Ok::<(), sonar_sweep::error::SonarError>(())
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::acoustics::AcousticParameters;
use crate::error::{AppResult, SonarError};

/// Default configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/sonar.toml";
/// Environment variable prefix
pub const ENV_PREFIX: &str = "SONAR_SWEEP_";

const DEFAULT_TEMPERATURE_C: f64 = 16.0;
const DEFAULT_SALINITY_PSU: f64 = 0.0;
const DEFAULT_DEPTH_M: f64 = 0.15;
const DEFAULT_MAX_RANGE_M: f64 = 2.0;
const DEFAULT_NUMBER_OF_SAMPLES: u16 = 1200;
const DEFAULT_TRANSMIT_DURATION_US: u16 = 16;
const DEFAULT_TRANSMIT_FREQUENCY_KHZ: u16 = 1000;
const DEFAULT_START_ANGLE: u16 = 150;
const DEFAULT_STOP_ANGLE: u16 = 250;
const DEFAULT_PORT: &str = "COM4";
const DEFAULT_BAUD_RATE: u32 = 115_200;
const DEFAULT_TIMEOUT_MS: u64 = 5000;
const DEFAULT_OUTPUT_DIR: &str = "data";

/// One full turn of the head
const GRADIANS_PER_TURN: u16 = 400;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SonarConfig {
    /// Water conditions for the speed of sound
    #[serde(default)]
    pub water: WaterConfig,
    /// Ping and sweep settings
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    /// Serial link
    #[serde(default)]
    pub device: DeviceConfig,
    /// Where run files go
    #[serde(default)]
    pub output: OutputConfig,
    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Water conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterConfig {
    /// Water temperature (°C)
    pub temperature_c: f64,
    /// Salinity (PSU); 0 for fresh water
    pub salinity_psu: f64,
    /// Transducer depth below the surface (m)
    pub depth_m: f64,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            temperature_c: DEFAULT_TEMPERATURE_C,
            salinity_psu: DEFAULT_SALINITY_PSU,
            depth_m: DEFAULT_DEPTH_M,
        }
    }
}

/// Receiver gain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GainSetting {
    /// Code 0
    Low,
    /// Code 1
    #[default]
    Normal,
    /// Code 2
    High,
}

impl GainSetting {
    /// Device gain code
    pub fn code(self) -> u8 {
        match self {
            GainSetting::Low => 0,
            GainSetting::Normal => 1,
            GainSetting::High => 2,
        }
    }
}

/// Ping and sweep settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Farthest range to record (m)
    pub max_range_m: f64,
    /// Samples per ping
    pub number_of_samples: u16,
    /// Receiver gain
    pub gain: GainSetting,
    /// Ping length (µs)
    pub transmit_duration_us: u16,
    /// Ping frequency (kHz)
    pub transmit_frequency_khz: u16,
    /// First angle of the sweep (gradians)
    pub start_angle: u16,
    /// Last angle of the sweep, inclusive (gradians)
    pub stop_angle: u16,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            max_range_m: DEFAULT_MAX_RANGE_M,
            number_of_samples: DEFAULT_NUMBER_OF_SAMPLES,
            gain: GainSetting::Normal,
            transmit_duration_us: DEFAULT_TRANSMIT_DURATION_US,
            transmit_frequency_khz: DEFAULT_TRANSMIT_FREQUENCY_KHZ,
            start_angle: DEFAULT_START_ANGLE,
            stop_angle: DEFAULT_STOP_ANGLE,
        }
    }
}

/// Serial link settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial port path (e.g. "/dev/ttyUSB0", "COM4")
    pub port: String,
    /// Link speed
    pub baud_rate: u32,
    /// Reply timeout per request (ms)
    pub timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Output location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for raw and results files; created if missing
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, coloured
    #[default]
    Pretty,
    /// One line per event
    Compact,
    /// JSON lines
    Json,
}

/// Log settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl SonarConfig {
    /// Load from `config/sonar.toml` and environment variables
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific file path. A missing file leaves the defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        Ok(Self::figment(path.as_ref()).extract()?)
    }

    /// The layered provider chain, exposed for callers that add their own layers.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(SonarConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(SonarError::Configuration(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        let acq = &self.acquisition;
        if acq.start_angle > acq.stop_angle {
            return Err(SonarError::Configuration(format!(
                "start_angle {} is after stop_angle {}",
                acq.start_angle, acq.stop_angle
            )));
        }
        if acq.stop_angle >= GRADIANS_PER_TURN {
            return Err(SonarError::Configuration(format!(
                "stop_angle {} out of range. Must be 0-{}",
                acq.stop_angle,
                GRADIANS_PER_TURN - 1
            )));
        }
        if acq.number_of_samples == 0 {
            return Err(SonarError::Configuration(
                "number_of_samples must be at least 1".to_string(),
            ));
        }
        if acq.max_range_m.is_nan() || acq.max_range_m <= 0.0 {
            return Err(SonarError::Configuration(format!(
                "max_range_m must be positive, got {}",
                acq.max_range_m
            )));
        }
        if self.device.baud_rate == 0 {
            return Err(SonarError::Configuration(
                "baud_rate must be non-zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Timing values derived from the water and acquisition settings
    pub fn acoustic_parameters(&self) -> AcousticParameters {
        AcousticParameters::compute(
            self.water.temperature_c,
            self.water.salinity_psu,
            self.water.depth_m,
            self.acquisition.max_range_m,
            f64::from(self.acquisition.number_of_samples),
        )
    }

    /// Angles to ping, in order
    pub fn sweep_angles(&self) -> RangeInclusive<u16> {
        self.acquisition.start_angle..=self.acquisition.stop_angle
    }

    /// Render as TOML (used by `sonar-sweep config`)
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
