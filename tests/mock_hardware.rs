//! Integration tests for the mock sonar
//!
//! These tests verify that MockSonar implements the capability trait and
//! produces echo profiles the rest of the pipeline can rely on.

use sonar_sweep::acquisition::{configure_sonar, sweep, PingSettings};
use sonar_sweep::config::SonarConfig;
use sonar_sweep::hardware::capabilities::ScanningSonar;
use sonar_sweep::hardware::mock::MockSonar;
use std::sync::Arc;

// =============================================================================
// MockSonar Tests
// =============================================================================

#[tokio::test]
async fn test_mock_sonar_through_trait_object() {
    let sonar: Arc<dyn ScanningSonar> = Arc::new(MockSonar::new());

    sonar.initialize().await.unwrap();
    sonar.set_number_of_samples(64).await.unwrap();

    let echo = sonar.transmit_angle(200).await.unwrap();
    assert_eq!(echo.angle, 200);
    assert_eq!(echo.data.len(), 64);
}

#[tokio::test]
async fn test_mock_sonar_peak_tracks_reflector_range() {
    let config = SonarConfig::default();
    let settings = PingSettings::from_config(&config);

    let near = MockSonar::with_reflector(0.5);
    let far = MockSonar::with_reflector(1.5);
    for sonar in [&near, &far] {
        sonar.initialize().await.unwrap();
        configure_sonar(sonar, &settings).await.unwrap();
    }

    let near_echo = near.transmit_angle(200).await.unwrap();
    let far_echo = far.transmit_angle(200).await.unwrap();

    let peak = |data: &[u8]| {
        data.iter()
            .enumerate()
            .max_by_key(|(_, v)| **v)
            .map(|(i, _)| i)
            .unwrap()
    };
    assert!(peak(&near_echo.data) < peak(&far_echo.data));
    assert_eq!(near_echo.data[peak(&near_echo.data)], 255);
}

#[tokio::test]
async fn test_mock_sonar_is_deterministic() {
    let a = MockSonar::new();
    let b = MockSonar::new();
    a.initialize().await.unwrap();
    b.initialize().await.unwrap();

    assert_eq!(
        a.transmit_angle(175).await.unwrap(),
        b.transmit_angle(175).await.unwrap()
    );
}

#[tokio::test]
async fn test_mock_sonar_default_sweep() {
    let config = SonarConfig::default();
    let sonar = MockSonar::new();
    sonar.initialize().await.unwrap();
    configure_sonar(&sonar, &PingSettings::from_config(&config))
        .await
        .unwrap();

    let responses = sweep(&sonar, config.sweep_angles()).await.unwrap();

    assert_eq!(responses.len(), 101);
    assert_eq!(sonar.ping_count(), 101);
    assert!(responses.iter().all(|r| r.data.len() == 1200));
    assert!(responses.iter().all(|r| r.sample_period == 91));
    assert_eq!(
        responses.iter().map(|r| r.angle).collect::<Vec<_>>(),
        (150..=250).collect::<Vec<u16>>()
    );
}

#[tokio::test]
async fn test_mock_sonar_rejects_bad_input() {
    let sonar = MockSonar::new();
    sonar.initialize().await.unwrap();

    assert!(sonar.set_gain_setting(3).await.is_err());
    assert!(sonar.transmit_angle(400).await.is_err());
    assert_eq!(sonar.ping_count(), 0);
}
