//! Device configuration and the angle sweep.
//!
//! Both steps are strictly sequential: one setter or one ping at a time, and
//! the first failure ends the sweep. Nothing is retried.

use anyhow::{Context, Result};
use std::ops::RangeInclusive;

use crate::acoustics::device_sample_period;
use crate::config::{GainSetting, SonarConfig};
use crate::hardware::capabilities::ScanningSonar;
use crate::hardware::ping_protocol::DeviceData;

/// The five values pushed to the device before a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingSettings {
    /// Samples per ping
    pub number_of_samples: u16,
    /// Sample period in 12.5 ns ticks, before rounding
    pub sample_period: f64,
    /// Receiver gain
    pub gain: GainSetting,
    /// Ping length (µs)
    pub transmit_duration: u16,
    /// Ping frequency (kHz)
    pub transmit_frequency: u16,
}

impl PingSettings {
    /// Derive the ping settings from a loaded configuration.
    pub fn from_config(config: &SonarConfig) -> Self {
        let acq = &config.acquisition;
        Self {
            number_of_samples: acq.number_of_samples,
            sample_period: config.acoustic_parameters().sample_period,
            gain: acq.gain,
            transmit_duration: acq.transmit_duration_us,
            transmit_frequency: acq.transmit_frequency_khz,
        }
    }
}

/// Push ping settings to the device. The sample period is rounded to the
/// nearest tick.
///
/// The device must already be connected and initialized.
pub async fn configure_sonar<S>(sonar: &S, settings: &PingSettings) -> Result<()>
where
    S: ScanningSonar + ?Sized,
{
    let period = device_sample_period(settings.sample_period);

    sonar
        .set_number_of_samples(settings.number_of_samples)
        .await
        .context("setting number of samples")?;
    sonar
        .set_sample_period(period)
        .await
        .context("setting sample period")?;
    sonar
        .set_gain_setting(settings.gain.code())
        .await
        .context("setting gain")?;
    sonar
        .set_transmit_duration(settings.transmit_duration)
        .await
        .context("setting transmit duration")?;
    sonar
        .set_transmit_frequency(settings.transmit_frequency)
        .await
        .context("setting transmit frequency")?;

    tracing::info!(
        number_of_samples = settings.number_of_samples,
        sample_period = period,
        gain = settings.gain.code(),
        transmit_duration = settings.transmit_duration,
        transmit_frequency = settings.transmit_frequency,
        "sonar configured"
    );
    Ok(())
}

/// Ping every angle in `angles` once, in order, and collect the responses.
pub async fn sweep<S>(sonar: &S, angles: RangeInclusive<u16>) -> Result<Vec<DeviceData>>
where
    S: ScanningSonar + ?Sized,
{
    let (start, stop) = (*angles.start(), *angles.end());
    let mut responses = Vec::with_capacity(angles.clone().count());

    for angle in angles {
        let response = sonar
            .transmit_angle(angle)
            .await
            .with_context(|| format!("transmit at angle {angle}"))?;
        tracing::debug!(angle, samples = response.data.len(), "ping");
        responses.push(response);
    }

    tracing::info!(start, stop, pings = responses.len(), "sweep complete");
    Ok(responses)
}
