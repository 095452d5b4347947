//! CLI subcommands: activity monitor, LED control, status, disk discovery.

mod config_cmd;
mod disks;
mod leds;
mod monitor;
mod set;
mod status;

use std::path::Path;

use clap::Subcommand;
use serde::Serialize;

pub(super) use crate::RUNNING;
pub(super) use nasled_lib::LedController;
pub(super) use nasled_lib::codec::LedStatus;
pub(super) use nasled_lib::config::Config;
pub(super) use nasled_lib::device::PlatformBus;
pub(super) use nasled_lib::disks::DiskInfo;
pub(super) use nasled_lib::error::Result;
pub(super) use nasled_lib::led::{self, LedId, LedMode, Rgb};

const PADDING: usize = 2;

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{key:<width$}{value}", width = w);
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

/// Print a JSON document, pretty-printed.
pub(super) fn print_json(value: &impl Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| nasled_lib::NasledError::Parse(format!("JSON output: {e}")))?;
    println!("{text}");
    Ok(())
}

/// Load the config from `path` (or the default location), logging any
/// normalization warnings.
pub(super) fn load_config(path: Option<&Path>) -> Config {
    let (config, warnings) = match path {
        Some(p) => Config::load_from(p),
        None => Config::load_with_warnings(),
    };
    for w in &warnings {
        log::warn!("[config] {w}");
    }
    config
}

/// Load and validate the config, then open the LED controller it points at.
pub(super) fn open_controller(config: &Config) -> Result<LedController<PlatformBus>> {
    if let Err(errors) = config.validate() {
        let msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(nasled_lib::NasledError::Config(msg));
    }
    let controller =
        LedController::open(&config.i2c_bus, config.i2c_address, config.retry_policy())?;
    log::debug!("[bus] opened {}", controller.bus_info());
    Ok(controller)
}

fn parse_color_arg(s: &str) -> std::result::Result<Rgb, String> {
    led::parse_color(s).map_err(|e| e.to_string())
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct StatusOutput {
    pub version: String,
    pub bus: String,
    pub address: u16,
    pub leds: Vec<LedStatusJson>,
}

#[derive(Serialize)]
pub(super) struct LedStatusJson {
    pub id: u8,
    pub name: String,
    /// `None` when the status read failed at the bus level.
    pub status: Option<LedStatus>,
    pub error: Option<String>,
}

#[derive(Serialize)]
pub(super) struct DisksOutput {
    pub count: usize,
    pub disks: Vec<DiskJson>,
}

#[derive(Serialize)]
pub(super) struct DiskJson {
    /// Bay LED driven by this disk, `None` past the last bay.
    pub led: Option<String>,
    #[serde(flatten)]
    pub disk: DiskInfo,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
}

#[derive(Serialize)]
pub(super) struct LedsOutput {
    pub count: usize,
    pub leds: Vec<LedJson>,
}

#[derive(Serialize)]
pub(super) struct LedJson {
    pub id: u8,
    pub name: String,
    pub bay: Option<u8>,
    pub write_register: u8,
    pub status_register: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Drive the front panel from disk and network activity until interrupted
    Monitor,

    /// Set color, brightness or mode of one LED
    Set {
        /// LED name (power, lan, disk1..disk8) or index
        led: LedId,
        /// Color: hex (#RRGGBB) or name (red, green, blue, white, off, ...)
        #[arg(long, value_parser = parse_color_arg)]
        color: Option<Rgb>,
        /// Brightness (0-255)
        #[arg(long)]
        brightness: Option<u8>,
        /// Mode: off, on, blink or breath
        #[arg(long)]
        mode: Option<LedMode>,
        /// Blink/breath cycle length in milliseconds
        #[arg(long, default_value_t = 1000)]
        cycle_ms: u16,
        /// Blink/breath on-duration in milliseconds
        #[arg(long, default_value_t = 500)]
        on_ms: u16,
    },

    /// Read LED status from the controller
    Status {
        /// Only this LED (default: all)
        led: Option<LedId>,
    },

    /// List bay disks and the LED each one drives
    Disks,

    /// Show current configuration and file paths
    Config,

    /// List front-panel LEDs and their registers (no hardware required)
    Leds,
}

/// Warn if `--json` was passed to a command that doesn't support it.
fn warn_json_unsupported(cmd_name: &str) {
    log::warn!("--json is not supported for `{cmd_name}` (ignored)");
}

pub fn run(cmd: Command, json: bool, config_path: Option<&Path>) -> Result<()> {
    match cmd {
        Command::Monitor => {
            if json {
                warn_json_unsupported("monitor");
            }
            monitor::cmd_monitor(config_path)
        }
        Command::Set {
            led,
            color,
            brightness,
            mode,
            cycle_ms,
            on_ms,
        } => {
            if json {
                warn_json_unsupported("set");
            }
            let request = set::SetRequest {
                led,
                color,
                brightness,
                mode,
                cycle_ms,
                on_ms,
            };
            set::cmd_set(&request, config_path)
        }
        Command::Status { led } => status::cmd_status(led, json, config_path),
        Command::Disks => disks::cmd_disks(json),
        Command::Config => config_cmd::cmd_config(json, config_path),
        Command::Leds => leds::cmd_leds(json),
    }
}

#[cfg(test)]
mod format_tests {
    use super::*;

    #[test]
    fn kv_width_top_only() {
        let w = kv_width(&["Short:", "Longer key:"], &[]);
        // "Longer key:" = 11 + PADDING = 13
        assert_eq!(w, 13);
    }

    #[test]
    fn kv_width_indent_drives_width() {
        let w = kv_width(&["A:"], &["rainbow_brightness:"]);
        // 19 + PADDING + 2 = 23
        assert_eq!(w, 23);
    }

    #[test]
    fn kv_width_top_drives_width() {
        let w = kv_width(&["Very long top key:"], &["Short:"]);
        // top: 18+2=20, indent: 6+2+2=10 → 20
        assert_eq!(w, 20);
    }

    #[test]
    fn values_align_across_levels() {
        let w = kv_width(&["Top:"], &["Indent:"]);
        let top = format_kv("Top:", "V", w);
        let indent = format!("  {:<width$}{}", "Indent:", "V", width = w - 2);
        assert_eq!(top.find('V'), indent.find('V'));
    }

    #[test]
    fn format_kv_basic() {
        assert_eq!(format_kv("Key:", "value", 10), "Key:      value");
    }

    #[test]
    fn format_kv_overlong_key_is_not_padded() {
        assert_eq!(format_kv("ExactWidth:", "val", 10), "ExactWidth:val");
    }

    #[test]
    fn kv_width_empty_both() {
        assert_eq!(kv_width(&[], &[]), 0);
    }
}
