//! Ping Protocol Framing
//!
//! Binary message format spoken by Blue Robotics Ping devices, including the
//! Ping360 scanning sonar.
//!
//! Frame layout (all integers little-endian):
//!
//! ```text
//! | 'B' | 'R' | payload_len u16 | message_id u16 | src u8 | dst u8 | payload ... | checksum u16 |
//! ```
//!
//! The checksum is the wrapping `u16` sum of every byte before it.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::error::{AppResult, SonarError};

/// First start byte (`'B'`)
pub const START_1: u8 = b'B';
/// Second start byte (`'R'`)
pub const START_2: u8 = b'R';
/// Bytes before the payload
pub const HEADER_LEN: usize = 8;
/// Trailing checksum width
pub const CHECKSUM_LEN: usize = 2;
/// Frames announcing a larger payload are treated as noise
pub const MAX_PAYLOAD_LEN: usize = 8192;

/// Message identifiers used by this crate.
pub mod ids {
    /// Common: acknowledge
    pub const ACK: u16 = 1;
    /// Common: not acknowledged
    pub const NACK: u16 = 2;
    /// Common: device information
    pub const DEVICE_INFORMATION: u16 = 4;
    /// Common: protocol version
    pub const PROTOCOL_VERSION: u16 = 5;
    /// Common: ask the device to send a message
    pub const GENERAL_REQUEST: u16 = 6;
    /// Ping360: one ping's echo profile
    pub const DEVICE_DATA: u16 = 2300;
    /// Ping360: transducer control
    pub const TRANSDUCER: u16 = 2601;
}

fn message_name(message_id: u16) -> &'static str {
    match message_id {
        ids::ACK => "ack",
        ids::NACK => "nack",
        ids::DEVICE_INFORMATION => "device_information",
        ids::PROTOCOL_VERSION => "protocol_version",
        ids::GENERAL_REQUEST => "general_request",
        ids::DEVICE_DATA => "device_data",
        ids::TRANSDUCER => "transducer",
        _ => "unknown",
    }
}

/// Wrapping byte sum used as the frame checksum.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, b| acc.wrapping_add(u16::from(*b)))
}

/// One decoded (or to-be-encoded) frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingMessage {
    /// Message identifier
    pub message_id: u16,
    /// Sender id
    pub src_device_id: u8,
    /// Receiver id
    pub dst_device_id: u8,
    /// Raw payload
    pub payload: Bytes,
}

impl PingMessage {
    /// Message from the host (id 0) to the device (id 0).
    pub fn new(message_id: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            message_id,
            src_device_id: 0,
            dst_device_id: 0,
            payload: payload.into(),
        }
    }

    /// Serialize into a complete frame including checksum.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len() + CHECKSUM_LEN);
        buf.put_u8(START_1);
        buf.put_u8(START_2);
        buf.put_u16_le(self.payload.len() as u16);
        buf.put_u16_le(self.message_id);
        buf.put_u8(self.src_device_id);
        buf.put_u8(self.dst_device_id);
        buf.put_slice(&self.payload);
        let sum = checksum(&buf);
        buf.put_u16_le(sum);
        buf.freeze()
    }

    /// Checksum the encoded frame would carry.
    pub fn checksum(&self) -> u16 {
        let frame = self.encode();
        checksum(&frame[..frame.len() - CHECKSUM_LEN])
    }

    /// Human-readable message name.
    pub fn name(&self) -> &'static str {
        message_name(self.message_id)
    }

    fn expect_id(&self, expected: u16) -> AppResult<()> {
        if self.message_id != expected {
            return Err(SonarError::Protocol(format!(
                "expected message {} ({}), got {} ({})",
                expected,
                message_name(expected),
                self.message_id,
                self.name()
            )));
        }
        Ok(())
    }

    fn expect_len(&self, min: usize) -> AppResult<()> {
        if self.payload.len() < min {
            return Err(SonarError::Protocol(format!(
                "{} payload too short: {} < {} bytes",
                self.name(),
                self.payload.len(),
                min
            )));
        }
        Ok(())
    }
}

/// `general_request` asking the device to send `requested_id`.
pub fn general_request(requested_id: u16) -> PingMessage {
    PingMessage::new(ids::GENERAL_REQUEST, requested_id.to_le_bytes().to_vec())
}

// =============================================================================
// Streaming parser
// =============================================================================

/// Incremental frame parser.
///
/// Bytes are appended with [`feed`](Self::feed) as they arrive from the link;
/// [`next_message`](Self::next_message) yields complete frames. Leading noise is
/// skipped until a `BR` start sequence; frames with a bad checksum are dropped.
#[derive(Debug, Default)]
pub struct PingParser {
    buf: BytesMut,
    dropped: u64,
}

impl PingParser {
    /// Empty parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes.
    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Frames discarded because of checksum mismatch.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }

    /// Bytes buffered but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next complete frame, if one is buffered.
    pub fn next_message(&mut self) -> Option<PingMessage> {
        loop {
            if !self.sync_to_start() {
                return None;
            }
            if self.buf.len() < HEADER_LEN {
                return None;
            }

            let payload_len = usize::from(u16::from_le_bytes([self.buf[2], self.buf[3]]));
            if payload_len > MAX_PAYLOAD_LEN {
                // False start sequence inside noise
                self.buf.advance(1);
                continue;
            }

            let frame_len = HEADER_LEN + payload_len + CHECKSUM_LEN;
            if self.buf.len() < frame_len {
                return None;
            }

            let body_len = frame_len - CHECKSUM_LEN;
            let received = u16::from_le_bytes([self.buf[body_len], self.buf[body_len + 1]]);
            let computed = checksum(&self.buf[..body_len]);
            if received != computed {
                // The length field is untrusted; resync from the next byte
                self.dropped += 1;
                tracing::warn!(received, computed, "dropping frame with bad checksum");
                self.buf.advance(1);
                continue;
            }

            let mut frame = self.buf.split_to(frame_len).freeze();
            // start bytes + payload length
            frame.advance(4);
            let message_id = frame.get_u16_le();
            let src_device_id = frame.get_u8();
            let dst_device_id = frame.get_u8();
            let payload = frame.split_to(payload_len);

            return Some(PingMessage {
                message_id,
                src_device_id,
                dst_device_id,
                payload,
            });
        }
    }

    /// Discard bytes until the buffer starts with `BR`. Returns false when more
    /// data is needed.
    fn sync_to_start(&mut self) -> bool {
        loop {
            match self.buf.first() {
                None => return false,
                Some(&START_1) => match self.buf.get(1) {
                    None => return false,
                    Some(&START_2) => return true,
                    Some(_) => self.buf.advance(1),
                },
                Some(_) => self.buf.advance(1),
            }
        }
    }
}

// =============================================================================
// Typed payloads
// =============================================================================

/// Transducer settings shared by every `transducer` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransducerSettings {
    /// Operating mode (1 for the Ping360)
    pub mode: u8,
    /// 0 = low, 1 = normal, 2 = high
    pub gain_setting: u8,
    /// Microseconds
    pub transmit_duration: u16,
    /// Ticks of 12.5 ns
    pub sample_period: u16,
    /// kHz
    pub transmit_frequency: u16,
    /// Samples per ping
    pub number_of_samples: u16,
}

impl Default for TransducerSettings {
    fn default() -> Self {
        Self {
            mode: 1,
            gain_setting: 0,
            transmit_duration: 32,
            sample_period: 80,
            transmit_frequency: 740,
            number_of_samples: 1024,
        }
    }
}

/// `transducer` control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransducerCommand {
    /// Settings for this ping
    pub settings: TransducerSettings,
    /// Head angle in gradians (0-399)
    pub angle: u16,
    /// Fire a ping and reply with `device_data`
    pub transmit: bool,
}

impl TransducerCommand {
    /// Encode as a `transducer` message.
    pub fn to_message(&self) -> PingMessage {
        let s = &self.settings;
        let mut payload = BytesMut::with_capacity(14);
        payload.put_u8(s.mode);
        payload.put_u8(s.gain_setting);
        payload.put_u16_le(self.angle);
        payload.put_u16_le(s.transmit_duration);
        payload.put_u16_le(s.sample_period);
        payload.put_u16_le(s.transmit_frequency);
        payload.put_u16_le(s.number_of_samples);
        payload.put_u8(u8::from(self.transmit));
        payload.put_u8(0);
        PingMessage::new(ids::TRANSDUCER, payload.freeze())
    }

    /// Decode a `transducer` message (device side, used by fakes).
    pub fn from_message(message: &PingMessage) -> AppResult<Self> {
        message.expect_id(ids::TRANSDUCER)?;
        message.expect_len(14)?;
        let mut p = message.payload.clone();
        let mode = p.get_u8();
        let gain_setting = p.get_u8();
        let angle = p.get_u16_le();
        let transmit_duration = p.get_u16_le();
        let sample_period = p.get_u16_le();
        let transmit_frequency = p.get_u16_le();
        let number_of_samples = p.get_u16_le();
        let transmit = p.get_u8() != 0;
        Ok(Self {
            settings: TransducerSettings {
                mode,
                gain_setting,
                transmit_duration,
                sample_period,
                transmit_frequency,
                number_of_samples,
            },
            angle,
            transmit,
        })
    }
}

/// `device_data`: the echo profile recorded for one ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceData {
    /// Operating mode
    pub mode: u8,
    /// Gain used for this ping
    pub gain_setting: u8,
    /// Head angle in gradians
    pub angle: u16,
    /// Microseconds
    pub transmit_duration: u16,
    /// Ticks of 12.5 ns
    pub sample_period: u16,
    /// kHz
    pub transmit_frequency: u16,
    /// Samples requested
    pub number_of_samples: u16,
    /// Echo intensity per sample
    pub data: Vec<u8>,
}

impl DeviceData {
    const FIXED_LEN: usize = 14;

    /// Decode from a `device_data` message.
    pub fn from_message(message: &PingMessage) -> AppResult<Self> {
        message.expect_id(ids::DEVICE_DATA)?;
        message.expect_len(Self::FIXED_LEN)?;
        let mut p = message.payload.clone();
        let mode = p.get_u8();
        let gain_setting = p.get_u8();
        let angle = p.get_u16_le();
        let transmit_duration = p.get_u16_le();
        let sample_period = p.get_u16_le();
        let transmit_frequency = p.get_u16_le();
        let number_of_samples = p.get_u16_le();
        let data_length = usize::from(p.get_u16_le());
        if p.remaining() < data_length {
            return Err(SonarError::Protocol(format!(
                "device_data announces {} samples but carries {}",
                data_length,
                p.remaining()
            )));
        }
        Ok(Self {
            mode,
            gain_setting,
            angle,
            transmit_duration,
            sample_period,
            transmit_frequency,
            number_of_samples,
            data: p.copy_to_bytes(data_length).to_vec(),
        })
    }

    /// Encode as a `device_data` message sent by the device.
    pub fn to_message(&self) -> PingMessage {
        let mut payload = BytesMut::with_capacity(Self::FIXED_LEN + self.data.len());
        payload.put_u8(self.mode);
        payload.put_u8(self.gain_setting);
        payload.put_u16_le(self.angle);
        payload.put_u16_le(self.transmit_duration);
        payload.put_u16_le(self.sample_period);
        payload.put_u16_le(self.transmit_frequency);
        payload.put_u16_le(self.number_of_samples);
        payload.put_u16_le(self.data.len() as u16);
        payload.put_slice(&self.data);
        PingMessage::new(ids::DEVICE_DATA, payload.freeze())
    }
}

/// Multi-line text block used in the raw dump. Each payload field is on its
/// own `  - name: value` line; the sample bytes are rendered as a list of hex
/// literals and followed by a checksum line.
impl fmt::Display for DeviceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self.to_message();
        writeln!(f, "--------------------------------------------------")?;
        writeln!(f, "ID: {} - {}", message.message_id, message.name())?;
        writeln!(
            f,
            "Header: start_1: {} start_2: {} payload_length: {} message_id: {} src_device_id: {} dst_device_id: {}",
            START_1,
            START_2,
            message.payload.len(),
            message.message_id,
            message.src_device_id,
            message.dst_device_id
        )?;
        writeln!(f, "Payload:")?;
        writeln!(f, "  - mode: {}", self.mode)?;
        writeln!(f, "  - gain_setting: {}", self.gain_setting)?;
        writeln!(f, "  - angle: {}", self.angle)?;
        writeln!(f, "  - transmit_duration: {}", self.transmit_duration)?;
        writeln!(f, "  - sample_period: {}", self.sample_period)?;
        writeln!(f, "  - transmit_frequency: {}", self.transmit_frequency)?;
        writeln!(f, "  - number_of_samples: {}", self.number_of_samples)?;
        writeln!(f, "  - data_length: {}", self.data.len())?;
        let samples = self
            .data
            .iter()
            .map(|b| format!("'{b:#04x}'"))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "  - data: [{samples}]")?;
        write!(f, "Checksum: {}", message.checksum())
    }
}

/// `device_information` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInformation {
    /// 2 = Ping360
    pub device_type: u8,
    /// Hardware revision
    pub device_revision: u8,
    /// Firmware major
    pub firmware_version_major: u8,
    /// Firmware minor
    pub firmware_version_minor: u8,
    /// Firmware patch
    pub firmware_version_patch: u8,
}

impl DeviceInformation {
    /// Decode from a `device_information` message.
    pub fn from_message(message: &PingMessage) -> AppResult<Self> {
        message.expect_id(ids::DEVICE_INFORMATION)?;
        message.expect_len(5)?;
        let p = &message.payload;
        Ok(Self {
            device_type: p[0],
            device_revision: p[1],
            firmware_version_major: p[2],
            firmware_version_minor: p[3],
            firmware_version_patch: p[4],
        })
    }

    /// Encode (device side).
    pub fn to_message(&self) -> PingMessage {
        PingMessage::new(
            ids::DEVICE_INFORMATION,
            vec![
                self.device_type,
                self.device_revision,
                self.firmware_version_major,
                self.firmware_version_minor,
                self.firmware_version_patch,
                0,
            ],
        )
    }
}

/// `protocol_version` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion {
    /// Major
    pub major: u8,
    /// Minor
    pub minor: u8,
    /// Patch
    pub patch: u8,
}

impl ProtocolVersion {
    /// Decode from a `protocol_version` message.
    pub fn from_message(message: &PingMessage) -> AppResult<Self> {
        message.expect_id(ids::PROTOCOL_VERSION)?;
        message.expect_len(3)?;
        let p = &message.payload;
        Ok(Self {
            major: p[0],
            minor: p[1],
            patch: p[2],
        })
    }

    /// Encode (device side).
    pub fn to_message(&self) -> PingMessage {
        PingMessage::new(
            ids::PROTOCOL_VERSION,
            vec![self.major, self.minor, self.patch, 0],
        )
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// `nack` reply: the device refused a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nack {
    /// Refused message id
    pub nacked_id: u16,
    /// Reason text
    pub message: String,
}

impl Nack {
    /// Decode from a `nack` message. The reason is NUL-terminated.
    pub fn from_message(message: &PingMessage) -> AppResult<Self> {
        message.expect_id(ids::NACK)?;
        message.expect_len(2)?;
        let mut p = message.payload.clone();
        let nacked_id = p.get_u16_le();
        let text = p.chunk();
        let end = text.iter().position(|b| *b == 0).unwrap_or(text.len());
        Ok(Self {
            nacked_id,
            message: String::from_utf8_lossy(&text[..end]).into_owned(),
        })
    }

    /// Encode (device side).
    pub fn to_message(&self) -> PingMessage {
        let mut payload = BytesMut::with_capacity(3 + self.message.len());
        payload.put_u16_le(self.nacked_id);
        payload.put_slice(self.message.as_bytes());
        payload.put_u8(0);
        PingMessage::new(ids::NACK, payload.freeze())
    }
}

impl From<Nack> for SonarError {
    fn from(value: Nack) -> Self {
        SonarError::Nack {
            message_id: value.nacked_id,
            reason: value.message,
        }
    }
}
