//! CLI Entry Point for sonar-sweep
//!
//! # Usage
//!
//! Sweep with the Ping360 on a serial port:
//! ```bash
//! sonar-sweep run --port /dev/ttyUSB0
//! ```
//!
//! Same pipeline without hardware:
//! ```bash
//! sonar-sweep simulate --output /tmp/sonar
//! ```
//!
//! Rebuild a results table from a saved raw dump:
//! ```bash
//! sonar-sweep parse "data/2024-03-05 14-07-09.csv"
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use sonar_sweep::config::{SonarConfig, DEFAULT_CONFIG_PATH};
use sonar_sweep::hardware::mock::MockSonar;
use sonar_sweep::logging::{self, TracingConfig};
use sonar_sweep::session::{self, RunSummary, StrongestEcho};

#[derive(Parser)]
#[command(name = "sonar-sweep")]
#[command(about = "Ping360 sector sweep acquisition", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Clone)]
struct ConfigArgs {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Output directory for run files
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep with the sonar on a serial port
    Run {
        #[command(flatten)]
        args: ConfigArgs,

        /// Serial port (e.g. COM4 or /dev/ttyUSB0)
        #[arg(long)]
        port: Option<String>,

        /// Baud rate
        #[arg(long)]
        baud: Option<u32>,
    },

    /// Sweep against the simulated sonar
    Simulate {
        #[command(flatten)]
        args: ConfigArgs,
    },

    /// Convert an existing raw dump into a results table
    Parse {
        /// Raw dump file
        raw: PathBuf,

        /// Results file (default: <raw stem>_Results.csv next to the raw file)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the acoustic parameters for a configuration
    Params {
        /// Configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Print the default configuration as TOML
    Config,

    /// List serial ports
    Ports,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { args, port, baud } => {
            let mut config = load_config(&args)?;
            if let Some(port) = port {
                config.device.port = port;
            }
            if let Some(baud) = baud {
                config.device.baud_rate = baud;
            }
            config.validate()?;
            run_device(&config).await
        }
        Commands::Simulate { args } => {
            let config = load_config(&args)?;
            config.validate()?;
            let sonar = MockSonar::new();
            let summary = session::run_acquisition(&sonar, &config).await?;
            print_summary(&summary);
            Ok(())
        }
        Commands::Parse { raw, output } => parse_raw(&raw, output),
        Commands::Params { config } => {
            let config = SonarConfig::load_from(&config)?;
            config.validate()?;
            let params = config.acoustic_parameters();
            println!("Speed of sound:   {} m/s", params.speed_of_sound);
            println!("Sample distance:  {} m", params.sample_distance);
            println!(
                "Sample period:    {} ticks (sent as {})",
                params.sample_period,
                params.device_sample_period()
            );
            Ok(())
        }
        Commands::Config => {
            print!("{}", SonarConfig::default().to_toml()?);
            Ok(())
        }
        Commands::Ports => list_ports(),
    }
}

/// Load configuration, apply CLI overrides and start logging.
fn load_config(args: &ConfigArgs) -> Result<SonarConfig> {
    let mut config = SonarConfig::load_from(&args.config)
        .with_context(|| format!("Failed to load '{}'", args.config.display()))?;
    if let Some(output) = &args.output {
        config.output.directory = output.clone();
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    logging::init(TracingConfig::from_config(&config).map_err(anyhow::Error::msg)?)
        .map_err(anyhow::Error::msg)?;
    tracing::debug!(config = %args.config.display(), "configuration loaded");
    Ok(config)
}

#[cfg(feature = "instrument_serial")]
async fn run_device(config: &SonarConfig) -> Result<()> {
    use sonar_sweep::hardware::ping360::Ping360Driver;
    use std::time::Duration;

    let sonar = Ping360Driver::connect(&config.device.port, config.device.baud_rate)?
        .with_timeout(Duration::from_millis(config.device.timeout_ms));
    let summary = session::run_acquisition(&sonar, config).await?;
    print_summary(&summary);
    Ok(())
}

#[cfg(not(feature = "instrument_serial"))]
async fn run_device(_config: &SonarConfig) -> Result<()> {
    Err(sonar_sweep::error::SonarError::SerialFeatureDisabled.into())
}

fn parse_raw(raw: &Path, output: Option<PathBuf>) -> Result<()> {
    let results = output.unwrap_or_else(|| session::results_path_for(raw));
    let conversion = session::convert_dump(raw, &results)?;
    println!("{} rows -> {}", conversion.rows, results.display());
    if let Some(echo) = &conversion.strongest {
        print_strongest(echo);
    }
    Ok(())
}

#[cfg(feature = "instrument_serial")]
fn list_ports() -> Result<()> {
    let ports = sonar_sweep::hardware::ping360::available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{port}");
    }
    Ok(())
}

#[cfg(not(feature = "instrument_serial"))]
fn list_ports() -> Result<()> {
    Err(sonar_sweep::error::SonarError::SerialFeatureDisabled.into())
}

fn print_summary(summary: &RunSummary) {
    println!("Pings:    {}", summary.pings);
    println!("Raw:      {}", summary.paths.raw.display());
    println!("Results:  {} ({} rows)", summary.paths.results.display(), summary.records);
    if let Some(echo) = &summary.strongest {
        print_strongest(echo);
    }
}

fn print_strongest(echo: &StrongestEcho) {
    println!(
        "Strongest echo: {} at angle {} sample {}",
        echo.intensity, echo.angle, echo.sample
    );
}
