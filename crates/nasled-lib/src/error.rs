//! Unified error type for the nasled-lib crate.
//!
//! [`NasledError`] wraps module-specific errors (`DeviceError`, `LedError`)
//! and domain-specific error kinds (`Config`, `Disk`, `Parse`).
//! `From` impls allow `?` to propagate across module boundaries.

use std::fmt;

use crate::device::DeviceError;
use crate::led::LedError;

/// Unified error type for nasled-lib operations.
#[derive(Debug)]
pub enum NasledError {
    /// Bus communication error (open, transact).
    Device(DeviceError),
    /// LED operation failed or was rejected.
    Led(LedError),
    /// Standard I/O error (config persistence, sysfs and procfs reads).
    Io(std::io::Error),
    /// Configuration validation error.
    Config(String),
    /// Disk discovery error.
    Disk(String),
    /// User-supplied value could not be parsed (LED name, color, mode).
    Parse(String),
}

impl fmt::Display for NasledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NasledError::Device(e) => write!(f, "{e}"),
            NasledError::Led(e) => write!(f, "{e}"),
            NasledError::Io(e) => write!(f, "I/O error: {e}"),
            NasledError::Config(e) => write!(f, "Config error: {e}"),
            NasledError::Disk(e) => write!(f, "Disk error: {e}"),
            NasledError::Parse(e) => write!(f, "Parse error: {e}"),
        }
    }
}

impl std::error::Error for NasledError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NasledError::Device(e) => Some(e),
            NasledError::Led(e) => Some(e),
            NasledError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DeviceError> for NasledError {
    fn from(e: DeviceError) -> Self {
        NasledError::Device(e)
    }
}

impl From<LedError> for NasledError {
    fn from(e: LedError) -> Self {
        NasledError::Led(e)
    }
}

impl From<std::io::Error> for NasledError {
    fn from(e: std::io::Error) -> Self {
        NasledError::Io(e)
    }
}

/// Crate-level Result alias using [`NasledError`].
pub type Result<T> = std::result::Result<T, NasledError>;
