//! `config` subcommand: show current configuration and file path.

use std::path::Path;

use super::{Config, ConfigOutput, Result, kv, kv_indent, kv_width};

pub(super) fn cmd_config(json: bool, custom_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(custom_path);
    let config_path = custom_path.map(|p| p.to_path_buf()).or_else(Config::path);
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());

    if json {
        return super::print_json(&ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: config,
        });
    }

    let w = kv_width(
        &["Config file:"],
        &[
            "i2c_bus:",
            "i2c_address:",
            "poll_interval_ms:",
            "disk_leds:",
            "network_led:",
            "enable_rainbow:",
            "rainbow_cycle_ms:",
            "rainbow_brightness:",
            "max_attempts:",
        ],
    );

    match &config_path {
        Some(p) if config_exists => kv("Config file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv(
            "Config file:",
            format_args!("{} (not found, using defaults)", p.display()),
            w,
        ),
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Bus:");
    kv_indent("i2c_bus:", &config.i2c_bus, w);
    kv_indent("i2c_address:", format_args!("0x{:02X}", config.i2c_address), w);
    println!();

    println!("Monitor:");
    kv_indent("poll_interval_ms:", config.poll_interval_ms, w);
    kv_indent("disk_leds:", config.disk_leds, w);
    kv_indent("network_led:", config.network_led, w);
    kv_indent("enable_rainbow:", config.enable_rainbow, w);
    kv_indent("rainbow_cycle_ms:", config.rainbow_cycle_ms, w);
    kv_indent("rainbow_brightness:", config.rainbow_brightness, w);
    println!();

    let policy = config.retry_policy();
    println!("Timing:");
    kv_indent("max_attempts:", policy.max_attempts, w);
    kv_indent("worst case:", format_args!("{:?}", policy.worst_case()), w);

    if let Err(errors) = config.validate() {
        for e in errors {
            log::warn!("[config] {e}");
        }
    }
    Ok(())
}
