//! Blue Robotics Ping360 Scanning Sonar Driver
//!
//! Reference: Ping Protocol, common + ping360 message sets
//!
//! Protocol Overview:
//! - Format: binary frames (see [`ping_protocol`](super::ping_protocol))
//! - Baud: 115200, 8N1, no flow control
//! - Timing: half-duplex request-response
//! - A ping is a `transducer` message with `transmit = 1`; the head replies
//!   with one `device_data` message for that angle
//!
//! # Example Usage
//!
//! ```no_run
//! use sonar_sweep::hardware::ping360::Ping360Driver;
//! use sonar_sweep::hardware::capabilities::ScanningSonar;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sonar = Ping360Driver::connect("/dev/ttyUSB0", 115_200)?;
//!     sonar.initialize().await?;
//!     let echo = sonar.transmit_angle(200).await?;
//!     println!("{} samples", echo.data.len());
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::SonarError;
use crate::hardware::capabilities::ScanningSonar;
use crate::hardware::ping_protocol::{
    general_request, ids, DeviceData, DeviceInformation, Nack, PingMessage, PingParser,
    ProtocolVersion, TransducerCommand, TransducerSettings,
};

#[cfg(feature = "instrument_serial")]
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Default wait for a reply before giving up
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Framed link: transport plus the bytes received but not yet parsed
struct Link<T> {
    io: T,
    parser: PingParser,
}

/// Driver for the Blue Robotics Ping360
///
/// Generic over the byte transport so the same code runs on a serial port
/// or an in-memory pipe.
pub struct Ping360Driver<T> {
    /// Transport protected by Mutex for exclusive request/response access
    link: Mutex<Link<T>>,
    /// Settings sent with every transducer command
    settings: Mutex<TransducerSettings>,
    /// Set once the handshake succeeded
    initialized: Mutex<bool>,
    /// Reply timeout
    timeout: Duration,
}

#[cfg(feature = "instrument_serial")]
impl Ping360Driver<SerialStream> {
    /// Open the serial port and create a driver
    ///
    /// # Arguments
    /// * `port_path` - Serial port path (e.g., "/dev/ttyUSB0" on Linux, "COM4" on Windows)
    /// * `baud_rate` - Link speed (115200 for the Ping360)
    ///
    /// # Errors
    /// Returns error if serial port cannot be opened
    pub fn connect(port_path: &str, baud_rate: u32) -> Result<Self> {
        let port = tokio_serial::new(port_path, baud_rate)
            .open_native_async()
            .with_context(|| format!("Failed to open Ping360 serial port '{port_path}'"))?;
        tracing::info!(port = port_path, baud_rate, "serial link open");
        Ok(Self::with_transport(port))
    }
}

impl<T> Ping360Driver<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already open transport.
    pub fn with_transport(io: T) -> Self {
        Self {
            link: Mutex::new(Link {
                io,
                parser: PingParser::new(),
            }),
            settings: Mutex::new(TransducerSettings::default()),
            initialized: Mutex::new(false),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replace the reply timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ask the device for `message_id` and wait for it.
    async fn request(&self, message_id: u16) -> Result<PingMessage> {
        let mut link = self.link.lock().await;
        Self::send(&mut link, &general_request(message_id)).await?;
        self.wait_for(&mut link, message_id).await
    }

    async fn send(link: &mut Link<T>, message: &PingMessage) -> Result<()> {
        let frame = message.encode();
        tracing::trace!(message_id = message.message_id, len = frame.len(), "tx");
        link.io
            .write_all(&frame)
            .await
            .context("Ping360 write failed")?;
        link.io.flush().await.context("Ping360 flush failed")?;
        Ok(())
    }

    /// Read until a frame with `expected` id arrives, bounded by the timeout.
    async fn wait_for(&self, link: &mut Link<T>, expected: u16) -> Result<PingMessage> {
        tokio::time::timeout(self.timeout, Self::read_until(link, expected))
            .await
            .map_err(|_| anyhow::Error::new(SonarError::Timeout { expected }))?
    }

    /// A `nack` becomes an error; unrelated frames are skipped.
    async fn read_until(link: &mut Link<T>, expected: u16) -> Result<PingMessage> {
        let mut buf = [0u8; 1024];
        loop {
            while let Some(message) = link.parser.next_message() {
                tracing::trace!(message_id = message.message_id, "rx");
                if message.message_id == expected {
                    return Ok(message);
                }
                if message.message_id == ids::NACK {
                    let nack = Nack::from_message(&message)?;
                    return Err(SonarError::from(nack).into());
                }
                tracing::debug!(
                    message_id = message.message_id,
                    expected,
                    "ignoring unexpected message"
                );
            }

            let n = link.io.read(&mut buf).await.context("Ping360 read error")?;
            if n == 0 {
                return Err(anyhow!("Ping360 link closed"));
            }
            link.parser.feed(&buf[..n]);
        }
    }

    async fn update_settings(&self, update: impl FnOnce(&mut TransducerSettings)) -> Result<()> {
        let mut settings = self.settings.lock().await;
        update(&mut settings);
        Ok(())
    }
}

#[async_trait]
impl<T> ScanningSonar for Ping360Driver<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn initialize(&self) -> Result<DeviceInformation> {
        let version = ProtocolVersion::from_message(
            &self
                .request(ids::PROTOCOL_VERSION)
                .await
                .context("Ping360 did not report its protocol version")?,
        )?;
        let info = DeviceInformation::from_message(
            &self
                .request(ids::DEVICE_INFORMATION)
                .await
                .context("Ping360 did not report device information")?,
        )?;

        tracing::info!(
            protocol = %version,
            device_type = info.device_type,
            firmware = %format!(
                "{}.{}.{}",
                info.firmware_version_major, info.firmware_version_minor, info.firmware_version_patch
            ),
            "Ping360 initialized"
        );
        *self.initialized.lock().await = true;
        Ok(info)
    }

    async fn set_number_of_samples(&self, number_of_samples: u16) -> Result<()> {
        self.update_settings(|s| s.number_of_samples = number_of_samples)
            .await
    }

    async fn set_sample_period(&self, sample_period: u16) -> Result<()> {
        self.update_settings(|s| s.sample_period = sample_period).await
    }

    async fn set_gain_setting(&self, gain_setting: u8) -> Result<()> {
        self.update_settings(|s| s.gain_setting = gain_setting).await
    }

    async fn set_transmit_duration(&self, transmit_duration: u16) -> Result<()> {
        self.update_settings(|s| s.transmit_duration = transmit_duration)
            .await
    }

    async fn set_transmit_frequency(&self, transmit_frequency: u16) -> Result<()> {
        self.update_settings(|s| s.transmit_frequency = transmit_frequency)
            .await
    }

    async fn settings(&self) -> TransducerSettings {
        *self.settings.lock().await
    }

    async fn transmit_angle(&self, angle: u16) -> Result<DeviceData> {
        if !*self.initialized.lock().await {
            return Err(anyhow!("Ping360 not initialized"));
        }

        let command = TransducerCommand {
            settings: self.settings().await,
            angle,
            transmit: true,
        };

        let mut link = self.link.lock().await;
        Self::send(&mut link, &command.to_message()).await?;
        let reply = self
            .wait_for(&mut link, ids::DEVICE_DATA)
            .await
            .with_context(|| format!("No echo for angle {angle}"))?;
        Ok(DeviceData::from_message(&reply)?)
    }
}

/// Serial ports visible to the operating system.
#[cfg(feature = "instrument_serial")]
pub fn available_ports() -> Result<Vec<String>> {
    Ok(tokio_serial::available_ports()
        .context("Failed to enumerate serial ports")?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}
