//! Scanning Sonar Capability
//!
//! The acquisition code never talks to a concrete driver. It works against
//! [`ScanningSonar`], which is the handful of operations a sweep needs:
//!
//! - `initialize` after the link is open
//! - five setters for the per-ping transducer settings
//! - `transmit_angle` to fire one ping and get its echo profile back
//!
//! Opening the link is the driver's constructor (see
//! [`Ping360Driver::connect`](crate::hardware::ping360::Ping360Driver)) and
//! closing it is `Drop`, so a failed run never leaves the serial port open.
//!
//! # Design Philosophy
//!
//! Each method:
//! - Is async (uses #[async_trait])
//! - Takes `&self`; implementations keep their state behind a lock
//! - Uses anyhow::Result for errors
//!
//! # Example
//!
//! ```rust,ignore
//! async fn ping_once<S: ScanningSonar>(sonar: &S) -> Result<usize> {
//!     sonar.initialize().await?;
//!     sonar.set_number_of_samples(1200).await?;
//!     let echo = sonar.transmit_angle(200).await?;
//!     Ok(echo.data.len())
//! }
//! ```

use anyhow::Result;
use async_trait::async_trait;

use crate::hardware::ping_protocol::{DeviceData, DeviceInformation, TransducerSettings};

/// Capability: Scanning Sonar
///
/// A mechanically or electronically steered sonar head that records one
/// echo-intensity profile per transmit angle.
///
/// # Contract
/// - `initialize` must succeed before `transmit_angle`
/// - Setters only change the settings used by later pings
/// - `transmit_angle` blocks the caller until the echo arrives or fails
/// - Angles are in gradians (0-399)
#[async_trait]
pub trait ScanningSonar: Send + Sync {
    /// Handshake with the device after the link is open.
    ///
    /// # Returns
    /// Identification reported by the device.
    async fn initialize(&self) -> Result<DeviceInformation>;

    /// Samples recorded per ping
    async fn set_number_of_samples(&self, number_of_samples: u16) -> Result<()>;

    /// Time between samples, in 12.5 ns ticks
    async fn set_sample_period(&self, sample_period: u16) -> Result<()>;

    /// Gain code: 0 = low, 1 = normal, 2 = high
    async fn set_gain_setting(&self, gain_setting: u8) -> Result<()>;

    /// Ping length in microseconds
    async fn set_transmit_duration(&self, transmit_duration: u16) -> Result<()>;

    /// Ping frequency in kHz
    async fn set_transmit_frequency(&self, transmit_frequency: u16) -> Result<()>;

    /// Settings the next ping will use.
    async fn settings(&self) -> TransducerSettings;

    /// Fire one ping at `angle` and wait for its echo profile.
    ///
    /// # Returns
    /// - Ok(DeviceData) with one intensity byte per sample
    /// - Err if the device refuses, times out, or was never initialized
    async fn transmit_angle(&self, angle: u16) -> Result<DeviceData>;
}
