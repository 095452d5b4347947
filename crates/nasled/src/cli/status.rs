//! `status` subcommand: read LED status back from the controller.

use std::path::Path;

use nasled_lib::device::LedBus;

use super::{
    LedController, LedId, LedStatus, LedStatusJson, Result, StatusOutput, kv, kv_indent, kv_width,
    led,
};

/// Fresh status of each requested LED. A failed read is reported for that
/// LED only; the sweep continues.
fn collect_status<B: LedBus>(ctl: &LedController<B>, leds: &[LedId]) -> Vec<LedStatusJson> {
    leds.iter()
        .map(|&id| {
            let (status, error) = match ctl.read_status(id) {
                Ok(reply) => (Some(reply.status()), None),
                Err(e) => {
                    log::debug!("[status] {id}: {e}");
                    (None, Some(e.to_string()))
                }
            };
            LedStatusJson {
                id: id.raw(),
                name: id.name().to_string(),
                status,
                error,
            }
        })
        .collect()
}

fn describe(status: &LedStatus) -> String {
    if !status.available {
        return "not present".into();
    }
    let mut text = format!(
        "{}, color {}, brightness {}",
        status.op_mode,
        led::format_color(status.color),
        status.brightness
    );
    if status.cycle_duration_ms > 0 {
        text.push_str(&format!(
            ", on {}ms / off {}ms",
            status.on_duration_ms,
            status.off_duration_ms()
        ));
    }
    text
}

pub(super) fn cmd_status(only: Option<LedId>, json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path);
    let ctl = super::open_controller(&config)?;

    let leds: Vec<LedId> = match only {
        Some(id) => vec![id],
        None => LedId::all().collect(),
    };
    let entries = collect_status(&ctl, &leds);

    if json {
        let info = ctl.bus_info();
        return super::print_json(&StatusOutput {
            version: env!("CARGO_PKG_VERSION").to_string(),
            bus: info.path.clone(),
            address: info.address,
            leds: entries,
        });
    }

    let names: Vec<String> = entries.iter().map(|e| format!("{}:", e.name)).collect();
    let keys: Vec<&str> = names.iter().map(String::as_str).collect();
    let w = kv_width(&["Controller:"], &keys);

    kv("Controller:", ctl.bus_info(), w);
    println!();
    println!("LEDs:");
    for (entry, key) in entries.iter().zip(&keys) {
        match (&entry.status, &entry.error) {
            (Some(status), _) => kv_indent(key, describe(status), w),
            (None, Some(err)) => kv_indent(key, format_args!("read failed ({err})"), w),
            (None, None) => kv_indent(key, "unknown", w),
        }
    }
    Ok(())
}
