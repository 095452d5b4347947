//! `set` subcommand: change color, brightness or mode of a single LED.

use std::path::Path;

use nasled_lib::NasledError;
use nasled_lib::device::LedBus;
use nasled_lib::led::ModeParams;

use super::{LedController, LedId, LedMode, Result, Rgb, led};

pub(super) struct SetRequest {
    pub led: LedId,
    pub color: Option<Rgb>,
    pub brightness: Option<u8>,
    pub mode: Option<LedMode>,
    pub cycle_ms: u16,
    pub on_ms: u16,
}

impl SetRequest {
    fn is_empty(&self) -> bool {
        self.color.is_none() && self.brightness.is_none() && self.mode.is_none()
    }
}

/// Apply color, then brightness, then mode. Returns one line per applied change.
fn apply_request<B: LedBus>(ctl: &LedController<B>, req: &SetRequest) -> Result<Vec<String>> {
    let mut applied = Vec::new();
    if let Some(color) = req.color {
        ctl.set_color(req.led, color)?;
        applied.push(format!("color -> {}", led::format_color(color)));
    }
    if let Some(value) = req.brightness {
        ctl.set_brightness(req.led, value)?;
        applied.push(format!("brightness -> {value}"));
    }
    if let Some(mode) = req.mode {
        if mode.is_timed() {
            let timing = ModeParams::new(req.cycle_ms, req.on_ms)?;
            ctl.set_mode(req.led, mode, &timing.to_bytes())?;
            applied.push(format!(
                "mode -> {mode} (cycle {}ms, on {}ms)",
                timing.cycle_ms, timing.on_ms
            ));
        } else {
            ctl.set_mode(req.led, mode, &[])?;
            applied.push(format!("mode -> {mode}"));
        }
    }
    Ok(applied)
}

pub(super) fn cmd_set(req: &SetRequest, config_path: Option<&Path>) -> Result<()> {
    if req.is_empty() {
        return Err(NasledError::Parse(
            "nothing to set (use --color, --brightness or --mode)".into(),
        ));
    }
    let config = super::load_config(config_path);
    let ctl = super::open_controller(&config)?;

    for line in apply_request(&ctl, req)? {
        println!("{}: {line}", req.led);
    }
    Ok(())
}
