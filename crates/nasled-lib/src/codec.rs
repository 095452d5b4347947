//! Frame codec: command frame encoding and status reply decoding.
//!
//! Pure and stateless. Corrupt or short status replies are not errors: an
//! unpopulated disk bay never answers properly, so they decode to
//! [`StatusReply::NotPresent`].

use serde::Serialize;

use crate::led::{LedError, LedId, OpMode, Result, Rgb};
use crate::protocol::{
    FRAME_CHECKSUM_SPAN, FRAME_CMD_OFFSET, FRAME_HEADER, FRAME_LEN, FRAME_PARAMS_OFFSET,
    MAX_PARAMS, STATUS_CHECKSUM_SPAN, STATUS_LEN,
};

// ── Checksums ──

/// Byte sum truncated to 16 bits.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

/// Check a buffer whose last two bytes are a big-endian checksum of the rest.
///
/// A zero checksum never verifies: an all-zero reply is what an absent
/// device tends to produce.
pub fn verify_checksum(data: &[u8]) -> bool {
    let Some(split) = data.len().checked_sub(2) else {
        return false;
    };
    let sum = checksum(&data[..split]);
    let want = u16::from_be_bytes([data[split], data[split + 1]]);
    sum != 0 && sum == want
}

// ── Command frames ──

/// An encoded 12-byte command frame, ready to be written to the LED's register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame([u8; FRAME_LEN]);

impl CommandFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn led_byte(&self) -> u8 {
        self.0[0]
    }

    pub fn command(&self) -> u8 {
        self.0[FRAME_CMD_OFFSET]
    }

    pub fn params(&self) -> &[u8] {
        &self.0[FRAME_PARAMS_OFFSET..FRAME_PARAMS_OFFSET + MAX_PARAMS]
    }

    /// The transmitted checksum bytes.
    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes([self.0[FRAME_LEN - 2], self.0[FRAME_LEN - 1]])
    }
}

/// Encode a command frame for `led`.
///
/// Parameters shorter than four bytes are zero-padded. The checksum is taken
/// with the identity byte still zero and the identity is written afterwards,
/// reproducing the byte sequence the controller firmware has been observed
/// to accept.
pub fn encode_command(led: LedId, command: u8, params: &[u8]) -> Result<CommandFrame> {
    if params.len() > MAX_PARAMS {
        return Err(LedError::InvalidParams(format!(
            "at most {MAX_PARAMS} parameter bytes, got {}",
            params.len()
        )));
    }

    let mut frame = [0u8; FRAME_LEN];
    frame[1..1 + FRAME_HEADER.len()].copy_from_slice(&FRAME_HEADER);
    frame[FRAME_CMD_OFFSET] = command;
    frame[FRAME_PARAMS_OFFSET..FRAME_PARAMS_OFFSET + params.len()].copy_from_slice(params);

    let sum = checksum(&frame[..FRAME_CHECKSUM_SPAN]);
    frame[FRAME_CHECKSUM_SPAN..].copy_from_slice(&sum.to_be_bytes());

    frame[0] = led.raw();
    Ok(CommandFrame(frame))
}

// ── Status replies ──

/// LED state as reported by the controller.
///
/// `available == false` means the LED did not produce a valid reply; every
/// other field is zero in that case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedStatus {
    pub available: bool,
    pub op_mode: OpMode,
    pub brightness: u8,
    pub color: Rgb,
    pub on_duration_ms: u16,
    pub cycle_duration_ms: u16,
}

impl LedStatus {
    /// Off part of the blink/breath cycle. Saturates if the device reports
    /// an on-duration longer than the cycle.
    pub fn off_duration_ms(&self) -> u16 {
        self.cycle_duration_ms.saturating_sub(self.on_duration_ms)
    }
}

/// Outcome of a status read that reached the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReply {
    Responding(LedStatus),
    /// Wrong length or bad checksum: treat the LED as absent.
    NotPresent,
}

impl StatusReply {
    pub fn is_responding(&self) -> bool {
        matches!(self, StatusReply::Responding(_))
    }

    /// Flatten into a [`LedStatus`]; `NotPresent` becomes the zeroed, unavailable status.
    pub fn status(&self) -> LedStatus {
        match self {
            StatusReply::Responding(s) => *s,
            StatusReply::NotPresent => LedStatus::default(),
        }
    }
}

/// Decode an 11-byte status reply.
pub fn decode_status(bytes: &[u8]) -> StatusReply {
    if bytes.len() != STATUS_LEN || !verify_checksum(bytes) {
        return StatusReply::NotPresent;
    }
    StatusReply::Responding(LedStatus {
        available: true,
        op_mode: OpMode::from_raw(bytes[0]),
        brightness: bytes[1],
        color: Rgb::new(bytes[2], bytes[3], bytes[4]),
        cycle_duration_ms: u16::from_be_bytes([bytes[5], bytes[6]]),
        on_duration_ms: u16::from_be_bytes([bytes[7], bytes[8]]),
    })
}

/// Encode a status reply the way the controller does. Used by the bus mock
/// and by diagnostics that replay captured replies.
pub fn encode_status(raw_mode: u8, status: &LedStatus) -> [u8; STATUS_LEN] {
    let mut out = [0u8; STATUS_LEN];
    out[0] = raw_mode;
    out[1] = status.brightness;
    out[2..5].copy_from_slice(&status.color.to_bytes());
    out[5..7].copy_from_slice(&status.cycle_duration_ms.to_be_bytes());
    out[7..9].copy_from_slice(&status.on_duration_ms.to_be_bytes());
    let sum = checksum(&out[..STATUS_CHECKSUM_SPAN]);
    out[STATUS_CHECKSUM_SPAN..].copy_from_slice(&sum.to_be_bytes());
    out
}
