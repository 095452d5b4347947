//! Daemon configuration: TOML file in the platform config directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::{DEFAULT_I2C_BUS, LED_CONTROLLER_ADDR};
use crate::retry::RetryPolicy;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const MIN_POLL_INTERVAL_MS: u64 = 10;
pub const MAX_POLL_INTERVAL_MS: u64 = 5000;

pub const DEFAULT_RAINBOW_CYCLE_MS: u64 = 4000;
pub const MIN_RAINBOW_CYCLE_MS: u64 = 1000;
pub const MAX_RAINBOW_CYCLE_MS: u64 = 10_000;

pub const DEFAULT_RAINBOW_BRIGHTNESS: u8 = 48;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// I2C adapter device node. Default: "/dev/i2c-0".
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: String,

    /// 7-bit slave address of the LED controller. Default: 0x3A.
    #[serde(default = "default_i2c_address")]
    pub i2c_address: u16,

    /// Activity sampling interval in milliseconds. Default: 100, range 10..=5000.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Drive disk bay LEDs from disk activity.
    #[serde(default = "default_true")]
    pub disk_leds: bool,

    /// Drive the network LED from network activity.
    #[serde(default = "default_true")]
    pub network_led: bool,

    /// Cycle the power LED through the color wheel.
    #[serde(default = "default_true")]
    pub enable_rainbow: bool,

    /// Duration of one full rainbow cycle in milliseconds. Default: 4000, range 1000..=10000.
    #[serde(default = "default_rainbow_cycle_ms")]
    pub rainbow_cycle_ms: u64,

    /// Power LED brightness while the rainbow runs. Default: 48.
    #[serde(default = "default_rainbow_brightness")]
    pub rainbow_brightness: u8,

    /// Bus timing of the write-confirm cycle.
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Write-confirm timings in microseconds, see [`RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub settle_us: u64,
    pub retry_settle_us: u64,
    pub poll_us: u64,
    pub poll_retry_us: u64,
    pub post_confirm_us: u64,
    pub max_attempts: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        let p = RetryPolicy::default();
        TimingConfig {
            settle_us: p.settle.as_micros() as u64,
            retry_settle_us: p.retry_settle.as_micros() as u64,
            poll_us: p.poll.as_micros() as u64,
            poll_retry_us: p.poll_retry.as_micros() as u64,
            post_confirm_us: p.post_confirm.as_micros() as u64,
            max_attempts: p.max_attempts,
        }
    }
}

impl TimingConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            settle: Duration::from_micros(self.settle_us),
            retry_settle: Duration::from_micros(self.retry_settle_us),
            poll: Duration::from_micros(self.poll_us),
            poll_retry: Duration::from_micros(self.poll_retry_us),
            post_confirm: Duration::from_micros(self.post_confirm_us),
            max_attempts: self.max_attempts,
        }
    }
}

fn default_i2c_bus() -> String {
    DEFAULT_I2C_BUS.into()
}
fn default_i2c_address() -> u16 {
    LED_CONTROLLER_ADDR
}
fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
fn default_rainbow_cycle_ms() -> u64 {
    DEFAULT_RAINBOW_CYCLE_MS
}
fn default_rainbow_brightness() -> u8 {
    DEFAULT_RAINBOW_BRIGHTNESS
}
fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            i2c_bus: default_i2c_bus(),
            i2c_address: default_i2c_address(),
            poll_interval_ms: default_poll_interval_ms(),
            disk_leds: true,
            network_led: true,
            enable_rainbow: true,
            rainbow_cycle_ms: default_rainbow_cycle_ms(),
            rainbow_brightness: default_rainbow_brightness(),
            timing: TimingConfig::default(),
        }
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The `i2c_bus` field is empty or whitespace-only.
    EmptyBusPath,
    /// The `i2c_address` field does not fit in 7 bits.
    InvalidAddress(u16),
    /// `timing.max_attempts` is zero, so no write would ever be issued.
    ZeroAttempts,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyBusPath => write!(f, "I2C bus path cannot be empty"),
            ValidationError::InvalidAddress(a) => {
                write!(f, "Invalid I2C address 0x{a:02X}: must be a 7-bit address")
            }
            ValidationError::ZeroAttempts => write!(f, "timing.max_attempts must be at least 1"),
        }
    }
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("nasled"))
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Load config from an arbitrary path, returning the config and any warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist and
    /// `(defaults, [warning])` if it exists but can't be parsed. Out-of-range
    /// intervals are clamped, each with a warning.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => config,
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    return (Self::default(), vec![warning]);
                }
            },
            Err(_) => return (Self::default(), vec![]),
        };
        let warnings = config.normalize();
        (config, warnings)
    }

    /// Load config from the default path, returning the config and any warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Clamp intervals into their accepted ranges. Zero means unset and
    /// falls back to the default.
    pub fn normalize(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        clamp_field(
            "poll_interval_ms",
            &mut self.poll_interval_ms,
            DEFAULT_POLL_INTERVAL_MS,
            MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS,
            &mut warnings,
        );
        clamp_field(
            "rainbow_cycle_ms",
            &mut self.rainbow_cycle_ms,
            DEFAULT_RAINBOW_CYCLE_MS,
            MIN_RAINBOW_CYCLE_MS..=MAX_RAINBOW_CYCLE_MS,
            &mut warnings,
        );
        warnings
    }

    /// Validate every field.
    ///
    /// Returns `Ok(())` if valid, or `Err(Vec<ValidationError>)` with all problems found.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.i2c_bus.trim().is_empty() {
            errors.push(ValidationError::EmptyBusPath);
        }
        if self.i2c_address > 0x7F {
            errors.push(ValidationError::InvalidAddress(self.i2c_address));
        }
        if self.timing.max_attempts == 0 {
            errors.push(ValidationError::ZeroAttempts);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn rainbow_cycle(&self) -> Duration {
        Duration::from_millis(self.rainbow_cycle_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.timing.retry_policy()
    }
}

fn clamp_field(
    name: &str,
    value: &mut u64,
    default: u64,
    range: std::ops::RangeInclusive<u64>,
    warnings: &mut Vec<String>,
) {
    if *value == 0 {
        warnings.push(format!("{name} unset, using {default}"));
        *value = default;
    } else if *value < *range.start() {
        warnings.push(format!("{name} {value} too low, using {}", range.start()));
        *value = *range.start();
    } else if *value > *range.end() {
        warnings.push(format!("{name} {value} too high, using {}", range.end()));
        *value = *range.end();
    }
}
