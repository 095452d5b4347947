//! LED modes: the requested mode (`LedMode`), its timing parameters
//! (`ModeParams`) and the mode reported back by the controller (`OpMode`).

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::protocol::{
    CMD_BLINK, CMD_BREATH, CMD_POWER, MAX_PARAMS, MODE_BLINK, MODE_BREATH, MODE_OFF, MODE_ON,
};

use super::error::{LedError, Result};

/// Mode a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LedMode {
    Off,
    On,
    Blink,
    Breath,
}

impl LedMode {
    /// Command byte carrying this mode.
    pub fn command(self) -> u8 {
        match self {
            LedMode::Off | LedMode::On => CMD_POWER,
            LedMode::Blink => CMD_BLINK,
            LedMode::Breath => CMD_BREATH,
        }
    }

    /// Whether the mode carries timing parameters.
    pub fn is_timed(self) -> bool {
        matches!(self, LedMode::Blink | LedMode::Breath)
    }
}

impl fmt::Display for LedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LedMode::Off => "off",
            LedMode::On => "on",
            LedMode::Blink => "blink",
            LedMode::Breath => "breath",
        })
    }
}

impl FromStr for LedMode {
    type Err = crate::NasledError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" => Ok(LedMode::Off),
            "on" => Ok(LedMode::On),
            "blink" => Ok(LedMode::Blink),
            "breath" => Ok(LedMode::Breath),
            other => Err(crate::NasledError::Parse(format!(
                "unknown mode: {other} (use off, on, blink or breath)"
            ))),
        }
    }
}

/// Blink/breath timing: total cycle (on + off) and on-duration, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModeParams {
    pub cycle_ms: u16,
    pub on_ms: u16,
}

impl ModeParams {
    /// Timing from a cycle length and on-duration. The on-duration must fit in the cycle.
    pub fn new(cycle_ms: u16, on_ms: u16) -> Result<Self> {
        if on_ms > cycle_ms {
            return Err(LedError::InvalidParams(format!(
                "on-duration {on_ms}ms exceeds cycle {cycle_ms}ms"
            )));
        }
        Ok(ModeParams { cycle_ms, on_ms })
    }

    pub fn off_ms(&self) -> u16 {
        self.cycle_ms - self.on_ms
    }

    /// Wire form: `[cycle_hi, cycle_lo, on_hi, on_lo]`.
    pub fn to_bytes(&self) -> [u8; MAX_PARAMS] {
        let [c_hi, c_lo] = self.cycle_ms.to_be_bytes();
        let [o_hi, o_lo] = self.on_ms.to_be_bytes();
        [c_hi, c_lo, o_hi, o_lo]
    }

    /// Parse the wire form. Fails unless exactly four bytes describe a valid timing.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; MAX_PARAMS] = bytes.try_into().map_err(|_| {
            LedError::InvalidParams(format!(
                "timed modes need {MAX_PARAMS} parameter bytes, got {}",
                bytes.len()
            ))
        })?;
        Self::new(
            u16::from_be_bytes([bytes[0], bytes[1]]),
            u16::from_be_bytes([bytes[2], bytes[3]]),
        )
    }
}

/// Operating mode reported in a status reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpMode {
    #[default]
    Off,
    On,
    Blink,
    Breath,
    Unknown,
}

impl OpMode {
    /// Map a raw status byte through the controller's mode table.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            MODE_OFF => OpMode::Off,
            MODE_ON => OpMode::On,
            MODE_BLINK => OpMode::Blink,
            MODE_BREATH => OpMode::Breath,
            _ => OpMode::Unknown,
        }
    }
}

impl From<LedMode> for OpMode {
    fn from(mode: LedMode) -> Self {
        match mode {
            LedMode::Off => OpMode::Off,
            LedMode::On => OpMode::On,
            LedMode::Blink => OpMode::Blink,
            LedMode::Breath => OpMode::Breath,
        }
    }
}

impl fmt::Display for OpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpMode::Off => "off",
            OpMode::On => "on",
            OpMode::Blink => "blink",
            OpMode::Breath => "breath",
            OpMode::Unknown => "unknown",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_and_on_share_power_command() {
        assert_eq!(LedMode::Off.command(), CMD_POWER);
        assert_eq!(LedMode::On.command(), CMD_POWER);
        assert_eq!(LedMode::Blink.command(), CMD_BLINK);
        assert_eq!(LedMode::Breath.command(), CMD_BREATH);
    }

    #[test]
    fn timed_modes() {
        assert!(!LedMode::Off.is_timed());
        assert!(!LedMode::On.is_timed());
        assert!(LedMode::Blink.is_timed());
        assert!(LedMode::Breath.is_timed());
    }

    #[test]
    fn parse_mode_names() {
        assert_eq!("Blink".parse::<LedMode>().unwrap(), LedMode::Blink);
        assert_eq!(" off ".parse::<LedMode>().unwrap(), LedMode::Off);
        assert!("strobe".parse::<LedMode>().is_err());
    }

    #[test]
    fn params_big_endian_cycle_then_on() {
        let p = ModeParams::new(200, 100).unwrap();
        assert_eq!(p.to_bytes(), [0x00, 0xC8, 0x00, 0x64]);
        assert_eq!(p.off_ms(), 100);
    }

    #[test]
    fn params_on_longer_than_cycle_rejected() {
        let err = ModeParams::new(100, 200).unwrap_err();
        assert!(matches!(err, LedError::InvalidParams(_)));
    }

    #[test]
    fn params_from_bytes() {
        let p = ModeParams::from_bytes(&[0x01, 0x00, 0x00, 0x80]).unwrap();
        assert_eq!(p.cycle_ms, 256);
        assert_eq!(p.on_ms, 128);
    }

    #[test]
    fn params_from_bytes_wrong_length() {
        assert!(ModeParams::from_bytes(&[0, 200, 0]).is_err());
        assert!(ModeParams::from_bytes(&[0, 200, 0, 100, 0]).is_err());
    }

    #[test]
    fn op_mode_table() {
        assert_eq!(OpMode::from_raw(0), OpMode::Off);
        assert_eq!(OpMode::from_raw(1), OpMode::On);
        assert_eq!(OpMode::from_raw(2), OpMode::Blink);
        assert_eq!(OpMode::from_raw(3), OpMode::Breath);
        assert_eq!(OpMode::from_raw(4), OpMode::Unknown);
        assert_eq!(OpMode::from_raw(0xFF), OpMode::Unknown);
    }

    #[test]
    fn op_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&OpMode::Breath).unwrap(), "\"breath\"");
    }
}
