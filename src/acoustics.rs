//! Acoustic timing parameters
//!
//! Converts the water conditions and the requested range resolution into the
//! sample period the sonar expects. The functions are plain arithmetic: they do
//! not validate sign or plausibility, so zero or negative inputs produce
//! meaningless (but finite or infinite) numbers instead of errors.

/// Duration of one device timing tick in seconds (12.5 ns).
pub const SAMPLE_PERIOD_TICK_S: f64 = 12.5e-9;

/// Speed of sound in water in m/s.
///
/// Simplified empirical polynomial in temperature `t` (°C), salinity `s` (PSU)
/// and depth `d` (m):
///
/// `1410 + 4.21·t − 0.037·t² + 1.10·s + 0.018·d`
pub fn speed_of_sound(t: f64, s: f64, d: f64) -> f64 {
    1410.0 + 4.21 * t - 0.037 * t.powi(2) + 1.10 * s + 0.018 * d
}

/// Distance covered by one sample in metres.
pub fn sample_distance(max_range: f64, number_of_samples: f64) -> f64 {
    max_range / number_of_samples
}

/// Sample period in device ticks for a given per-sample distance.
pub fn sample_period(sample_distance: f64, v_sound: f64) -> f64 {
    sample_distance / (v_sound * SAMPLE_PERIOD_TICK_S)
}

/// Sample period as the device register value: nearest integer tick,
/// saturating into `u16` (NaN maps to 0).
pub fn device_sample_period(period: f64) -> u16 {
    period.round() as u16
}

/// The three derived timing values for one configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcousticParameters {
    /// Speed of sound in m/s
    pub speed_of_sound: f64,
    /// Metres per sample
    pub sample_distance: f64,
    /// Ticks of 12.5 ns per sample
    pub sample_period: f64,
}

impl AcousticParameters {
    /// Run the full pipeline: speed of sound, then sample distance, then period.
    pub fn compute(
        temperature_c: f64,
        salinity_psu: f64,
        depth_m: f64,
        max_range_m: f64,
        number_of_samples: f64,
    ) -> Self {
        let speed_of_sound = speed_of_sound(temperature_c, salinity_psu, depth_m);
        let sample_distance = sample_distance(max_range_m, number_of_samples);
        Self {
            speed_of_sound,
            sample_distance,
            sample_period: sample_period(sample_distance, speed_of_sound),
        }
    }

    /// Sample period rounded for the device.
    pub fn device_sample_period(&self) -> u16 {
        device_sample_period(self.sample_period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_of_sound_matches_polynomial() {
        let v = speed_of_sound(16.0, 0.0, 0.15);
        assert_eq!(v, 1410.0 + 4.21 * 16.0 - 0.037 * 256.0 + 0.0 + 0.018 * 0.15);
    }

    #[test]
    fn salinity_raises_speed() {
        assert!(speed_of_sound(16.0, 35.0, 0.15) > speed_of_sound(16.0, 0.0, 0.15));
    }

    #[test]
    fn sample_distance_divides_range() {
        assert_eq!(sample_distance(2.0, 1200.0), 2.0 / 1200.0);
    }

    #[test]
    fn sample_period_monotonic_in_distance() {
        let v = speed_of_sound(16.0, 0.0, 0.15);
        let mut last = 0.0;
        for n in [2400.0, 1200.0, 600.0, 300.0] {
            let p = sample_period(sample_distance(2.0, n), v);
            assert!(p > last, "{p} should exceed {last}");
            last = p;
        }
    }

    #[test]
    fn sample_period_decreases_with_speed() {
        let d = sample_distance(2.0, 1200.0);
        assert!(sample_period(d, 1400.0) > sample_period(d, 1500.0));
        assert!(sample_period(d, 1500.0) > sample_period(d, 1600.0));
    }

    #[test]
    fn default_run_rounds_to_91_ticks() {
        let params = AcousticParameters::compute(16.0, 0.0, 0.15, 2.0, 1200.0);
        assert!((params.sample_period - 90.83).abs() < 0.01);
        assert_eq!(params.device_sample_period(), 91);
    }

    #[test]
    fn zero_samples_does_not_panic() {
        let params = AcousticParameters::compute(16.0, 0.0, 0.15, 2.0, 0.0);
        assert!(params.sample_distance.is_infinite());
        assert_eq!(params.device_sample_period(), u16::MAX);
    }

    #[test]
    fn device_period_saturates() {
        assert_eq!(device_sample_period(-4.0), 0);
        assert_eq!(device_sample_period(f64::NAN), 0);
        assert_eq!(device_sample_period(80.5), 81);
        assert_eq!(device_sample_period(1.0e9), u16::MAX);
    }
}
