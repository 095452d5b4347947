use std::fmt;

use crate::device::DeviceError;

use super::LedId;

/// Failures of LED state-changing operations.
#[derive(Debug, Clone)]
pub enum LedError {
    /// Every write attempt went unconfirmed. `cause` is the last transport
    /// error seen, or `None` if the writes went through but the device never
    /// reported the expected state.
    CommandFailed {
        led: LedId,
        attempts: u32,
        cause: Option<DeviceError>,
    },
    /// Malformed command or mode parameters supplied by the caller.
    InvalidParams(String),
}

impl fmt::Display for LedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedError::CommandFailed {
                led,
                attempts,
                cause: Some(e),
            } => write!(f, "failed to set {led} after {attempts} attempts: {e}"),
            LedError::CommandFailed {
                led,
                attempts,
                cause: None,
            } => write!(
                f,
                "failed to set {led} after {attempts} attempts: not confirmed by device"
            ),
            LedError::InvalidParams(e) => write!(f, "Invalid parameters: {e}"),
        }
    }
}

impl std::error::Error for LedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedError::CommandFailed { cause: Some(e), .. } => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedError>;
