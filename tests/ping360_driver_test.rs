//! Ping360 driver tests against a fake device
//!
//! The driver talks to an in-memory duplex pipe. A task on the other end
//! decodes frames with the same parser and answers the way the head does.

use sonar_sweep::acquisition::{configure_sonar, sweep, PingSettings};
use sonar_sweep::config::SonarConfig;
use sonar_sweep::error::SonarError;
use sonar_sweep::hardware::capabilities::ScanningSonar;
use sonar_sweep::hardware::ping360::Ping360Driver;
use sonar_sweep::hardware::ping_protocol::{
    ids, DeviceData, DeviceInformation, Nack, PingMessage, PingParser, ProtocolVersion,
    TransducerCommand,
};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

/// How the fake head answers a ping.
#[derive(Clone, Copy)]
enum Behaviour {
    Echo,
    NackAngle(u16),
}

fn reply_to(message: &PingMessage, behaviour: Behaviour) -> Vec<PingMessage> {
    match message.message_id {
        ids::GENERAL_REQUEST => {
            let requested = u16::from_le_bytes([message.payload[0], message.payload[1]]);
            match requested {
                ids::PROTOCOL_VERSION => vec![ProtocolVersion {
                    major: 1,
                    minor: 0,
                    patch: 0,
                }
                .to_message()],
                ids::DEVICE_INFORMATION => vec![DeviceInformation {
                    device_type: 2,
                    device_revision: 1,
                    firmware_version_major: 3,
                    firmware_version_minor: 3,
                    firmware_version_patch: 1,
                }
                .to_message()],
                _ => vec![],
            }
        }
        ids::TRANSDUCER => {
            let command = TransducerCommand::from_message(message).unwrap();
            if let Behaviour::NackAngle(angle) = behaviour {
                if command.angle == angle {
                    return vec![Nack {
                        nacked_id: ids::TRANSDUCER,
                        message: "angle refused".to_string(),
                    }
                    .to_message()];
                }
            }
            let s = command.settings;
            let data = (0..s.number_of_samples)
                .map(|i| (i as u8).wrapping_add(command.angle as u8))
                .collect();
            vec![DeviceData {
                mode: s.mode,
                gain_setting: s.gain_setting,
                angle: command.angle,
                transmit_duration: s.transmit_duration,
                sample_period: s.sample_period,
                transmit_frequency: s.transmit_frequency,
                number_of_samples: s.number_of_samples,
                data,
            }
            .to_message()]
        }
        _ => vec![],
    }
}

fn spawn_fake_device(mut io: DuplexStream, behaviour: Behaviour) {
    tokio::spawn(async move {
        let mut parser = PingParser::new();
        let mut buf = [0u8; 512];
        loop {
            let n = match io.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            parser.feed(&buf[..n]);
            while let Some(message) = parser.next_message() {
                for reply in reply_to(&message, behaviour) {
                    // Garbage ahead of each reply exercises resync
                    if io.write_all(b"\x00zz").await.is_err() {
                        return;
                    }
                    if io.write_all(&reply.encode()).await.is_err() {
                        return;
                    }
                }
            }
        }
    });
}

fn driver(behaviour: Behaviour) -> Ping360Driver<DuplexStream> {
    let (host, device) = tokio::io::duplex(16 * 1024);
    spawn_fake_device(device, behaviour);
    Ping360Driver::with_transport(host).with_timeout(Duration::from_secs(2))
}

#[tokio::test]
async fn initialize_reports_device_information() {
    let sonar = driver(Behaviour::Echo);
    let info = sonar.initialize().await.unwrap();
    assert_eq!(info.device_type, 2);
    assert_eq!(info.firmware_version_major, 3);
    assert_eq!(info.firmware_version_patch, 1);
}

#[tokio::test]
async fn transmit_sends_cached_settings() {
    let sonar = driver(Behaviour::Echo);
    sonar.initialize().await.unwrap();

    let config = SonarConfig::default();
    configure_sonar(&sonar, &PingSettings::from_config(&config))
        .await
        .unwrap();

    let echo = sonar.transmit_angle(200).await.unwrap();
    assert_eq!(echo.angle, 200);
    assert_eq!(echo.number_of_samples, 1200);
    assert_eq!(echo.sample_period, 91);
    assert_eq!(echo.gain_setting, 1);
    assert_eq!(echo.transmit_duration, 16);
    assert_eq!(echo.transmit_frequency, 1000);
    assert_eq!(echo.data.len(), 1200);
    assert_eq!(echo.data[0], 200);
}

#[tokio::test]
async fn sweep_over_serial_link() {
    let sonar = driver(Behaviour::Echo);
    sonar.initialize().await.unwrap();
    sonar.set_number_of_samples(16).await.unwrap();

    let responses = sweep(&sonar, 150..=160).await.unwrap();
    assert_eq!(responses.len(), 11);
    for (response, angle) in responses.iter().zip(150u16..) {
        assert_eq!(response.angle, angle);
        assert_eq!(response.data.len(), 16);
    }
}

#[tokio::test]
async fn nack_aborts_sweep() {
    let sonar = driver(Behaviour::NackAngle(153));
    sonar.initialize().await.unwrap();
    sonar.set_number_of_samples(8).await.unwrap();

    let err = sweep(&sonar, 150..=160).await.unwrap_err();
    let nack = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<SonarError>())
        .expect("SonarError in chain");
    match nack {
        SonarError::Nack { message_id, reason } => {
            assert_eq!(*message_id, ids::TRANSDUCER);
            assert_eq!(reason, "angle refused");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn silent_device_times_out() {
    let (host, _device) = tokio::io::duplex(1024);
    let sonar = Ping360Driver::with_transport(host).with_timeout(Duration::from_millis(50));

    let err = sonar.initialize().await.unwrap_err();
    assert!(err
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<SonarError>(), Some(SonarError::Timeout { .. }))));
}
