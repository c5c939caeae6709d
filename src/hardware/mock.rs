//! Mock Hardware Implementations
//!
//! Provides a simulated sonar head for running sweeps without physical hardware.
//!
//! # Available Mocks
//!
//! - `MockSonar` - Simulated Ping360 with a single reflector in the water
//!
//! # Echo Model
//!
//! Every ping returns `number_of_samples` bytes. Samples near the reflector's
//! range form a bright peak; everything else is low deterministic clutter, so
//! identical settings always produce identical data.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::RwLock;

use crate::acoustics::SAMPLE_PERIOD_TICK_S;
use crate::hardware::capabilities::ScanningSonar;
use crate::hardware::ping_protocol::{DeviceData, DeviceInformation, TransducerSettings};

/// Speed of sound the simulator assumes (m/s)
const NOMINAL_SPEED_OF_SOUND: f64 = 1480.0;
/// Half-width of the reflector peak, in samples
const PEAK_HALF_WIDTH: usize = 8;
/// Gradians per full revolution
const GRADIANS_PER_TURN: u16 = 400;

// =============================================================================
// MockSonar - Simulated Scanning Sonar
// =============================================================================

/// Mock scanning sonar
///
/// Simulates a Ping360 with:
/// - A reflector at a fixed range (default 1.0 m)
/// - Transmit refused before `initialize`
/// - Angles of 400 gradians or more refused
/// - Optional injected failure at one angle
///
/// # Example
///
/// ```rust,ignore
/// let sonar = MockSonar::new();
/// sonar.initialize().await?;
/// let echo = sonar.transmit_angle(200).await?;
/// assert_eq!(echo.angle, 200);
/// ```
pub struct MockSonar {
    settings: RwLock<TransducerSettings>,
    initialized: RwLock<bool>,
    reflector_range_m: f64,
    fail_at_angle: Option<u16>,
    ping_count: AtomicU64,
    angle_log: Mutex<Vec<u16>>,
}

impl MockSonar {
    /// Create a mock with the reflector at 1.0 m
    pub fn new() -> Self {
        Self::with_reflector(1.0)
    }

    /// Create a mock with the reflector at `range_m` metres
    pub fn with_reflector(range_m: f64) -> Self {
        Self {
            settings: RwLock::new(TransducerSettings::default()),
            initialized: RwLock::new(false),
            reflector_range_m: range_m,
            fail_at_angle: None,
            ping_count: AtomicU64::new(0),
            angle_log: Mutex::new(Vec::new()),
        }
    }

    /// Make `transmit_angle(angle)` fail, as a device dropping off the bus would
    pub fn failing_at(mut self, angle: u16) -> Self {
        self.fail_at_angle = Some(angle);
        self
    }

    /// Total pings answered
    pub fn ping_count(&self) -> u64 {
        self.ping_count.load(Ordering::SeqCst)
    }

    /// Angles pinged so far, in order
    pub fn angle_log(&self) -> Vec<u16> {
        self.angle_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Check if `initialize` has been called
    pub async fn is_initialized(&self) -> bool {
        *self.initialized.read().await
    }

    /// Sample index of the reflector for the given sample period.
    fn reflector_sample(&self, sample_period: u16) -> usize {
        let metres_per_sample = NOMINAL_SPEED_OF_SOUND * f64::from(sample_period) * SAMPLE_PERIOD_TICK_S;
        if metres_per_sample <= 0.0 {
            return usize::MAX;
        }
        (self.reflector_range_m / metres_per_sample) as usize
    }

    fn echo_profile(&self, angle: u16, settings: &TransducerSettings) -> Vec<u8> {
        let peak = self.reflector_sample(settings.sample_period);
        let gain_boost = settings.gain_setting.saturating_mul(10);
        (0..usize::from(settings.number_of_samples))
            .map(|i| {
                let distance = i.abs_diff(peak);
                if distance < PEAK_HALF_WIDTH {
                    255u8.saturating_sub((distance * 25) as u8)
                } else {
                    let clutter = ((i * 7 + usize::from(angle) * 13) % 16) as u8;
                    clutter.saturating_add(gain_boost)
                }
            })
            .collect()
    }

    async fn update(&self, update: impl FnOnce(&mut TransducerSettings) + Send) -> Result<()> {
        update(&mut *self.settings.write().await);
        Ok(())
    }
}

impl Default for MockSonar {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScanningSonar for MockSonar {
    async fn initialize(&self) -> Result<DeviceInformation> {
        *self.initialized.write().await = true;
        tracing::debug!("MockSonar: initialized");
        Ok(DeviceInformation {
            device_type: 2,
            device_revision: 0,
            firmware_version_major: 3,
            firmware_version_minor: 3,
            firmware_version_patch: 0,
        })
    }

    async fn set_number_of_samples(&self, number_of_samples: u16) -> Result<()> {
        self.update(|s| s.number_of_samples = number_of_samples).await
    }

    async fn set_sample_period(&self, sample_period: u16) -> Result<()> {
        self.update(|s| s.sample_period = sample_period).await
    }

    async fn set_gain_setting(&self, gain_setting: u8) -> Result<()> {
        if gain_setting > 2 {
            return Err(anyhow!("MockSonar: gain setting must be 0-2, got {gain_setting}"));
        }
        self.update(|s| s.gain_setting = gain_setting).await
    }

    async fn set_transmit_duration(&self, transmit_duration: u16) -> Result<()> {
        self.update(|s| s.transmit_duration = transmit_duration).await
    }

    async fn set_transmit_frequency(&self, transmit_frequency: u16) -> Result<()> {
        self.update(|s| s.transmit_frequency = transmit_frequency).await
    }

    async fn settings(&self) -> TransducerSettings {
        *self.settings.read().await
    }

    async fn transmit_angle(&self, angle: u16) -> Result<DeviceData> {
        if !*self.initialized.read().await {
            anyhow::bail!("MockSonar: Cannot transmit - not initialized");
        }
        if angle >= GRADIANS_PER_TURN {
            anyhow::bail!("MockSonar: angle {angle} out of range (0-399)");
        }
        if self.fail_at_angle == Some(angle) {
            anyhow::bail!("MockSonar: injected failure at angle {angle}");
        }

        let settings = self.settings().await;
        let data = self.echo_profile(angle, &settings);
        self.ping_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.angle_log.lock() {
            log.push(angle);
        }

        Ok(DeviceData {
            mode: settings.mode,
            gain_setting: settings.gain_setting,
            angle,
            transmit_duration: settings.transmit_duration,
            sample_period: settings.sample_period,
            transmit_frequency: settings.transmit_frequency,
            number_of_samples: settings.number_of_samples,
            data,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
