//! Disk and network activity sampling, and the mapping from activity to LED
//! color and brightness.
//!
//! Counters come from `/proc/diskstats` and `/proc/net/dev`. Parsing and
//! mapping are pure; only [`sample`] touches the filesystem.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::led::Rgb;

const DISKSTATS: &str = "proc/diskstats";
const NET_DEV: &str = "proc/net/dev";

/// Brightness of the faintest active LED.
pub const MIN_ACTIVE_BRIGHTNESS: u8 = 32;

/// Interfaces that never count towards network activity.
const SKIPPED_IFACE_PREFIXES: &[&str] = &["veth", "docker"];

/// Sector counters of one disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCounters {
    pub reads: u64,
    pub writes: u64,
}

impl DiskCounters {
    pub fn total(&self) -> u64 {
        self.reads.saturating_add(self.writes)
    }

    /// Change since `prev`. A counter that went backwards counts as zero.
    pub fn delta(&self, prev: &DiskCounters) -> DiskCounters {
        DiskCounters {
            reads: self.reads.saturating_sub(prev.reads),
            writes: self.writes.saturating_sub(prev.writes),
        }
    }
}

/// Byte counters summed over all physical interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub rx: u64,
    pub tx: u64,
}

impl NetCounters {
    pub fn total(&self) -> u64 {
        self.rx.saturating_add(self.tx)
    }

    /// Change since `prev`. A counter that went backwards counts as zero.
    pub fn delta(&self, prev: &NetCounters) -> NetCounters {
        NetCounters {
            rx: self.rx.saturating_sub(prev.rx),
            tx: self.tx.saturating_sub(prev.tx),
        }
    }
}

/// One reading of all counters. `None` means the source could not be read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivitySample {
    pub disks: Option<HashMap<String, DiskCounters>>,
    pub net: Option<NetCounters>,
}

/// Sectors read (field 5) and written (field 9) for each of `devices`.
/// Lines with fewer than 14 fields are ignored.
pub fn parse_diskstats<S: AsRef<str>>(text: &str, devices: &[S]) -> HashMap<String, DiskCounters> {
    let mut stats = HashMap::new();
    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 14 {
            continue;
        }
        let name = fields[2];
        if !devices.iter().any(|d| d.as_ref() == name) {
            continue;
        }
        stats.insert(
            name.to_string(),
            DiskCounters {
                reads: fields[5].parse().unwrap_or(0),
                writes: fields[9].parse().unwrap_or(0),
            },
        );
    }
    stats
}

fn is_skipped_iface(iface: &str) -> bool {
    iface == "lo" || SKIPPED_IFACE_PREFIXES.iter().any(|p| iface.starts_with(p))
}

/// Received (field 0) and transmitted (field 8) bytes summed over every
/// interface except loopback, `veth*` and `docker*`.
pub fn parse_net_dev(text: &str) -> NetCounters {
    let mut total = NetCounters::default();
    for line in text.lines() {
        let Some((iface, rest)) = line.trim().split_once(':') else {
            continue;
        };
        if is_skipped_iface(iface.trim()) {
            continue;
        }
        let fields: Vec<&str> = rest.split_whitespace().collect();
        if fields.len() < 9 {
            continue;
        }
        total.rx = total.rx.saturating_add(fields[0].parse().unwrap_or(0));
        total.tx = total.tx.saturating_add(fields[8].parse().unwrap_or(0));
    }
    total
}

/// Read all counters below `root`. Unreadable sources are logged and left empty.
pub fn sample<S: AsRef<str>>(root: &Path, devices: &[S]) -> ActivitySample {
    let disks = match std::fs::read_to_string(root.join(DISKSTATS)) {
        Ok(text) => Some(parse_diskstats(&text, devices)),
        Err(e) => {
            log::warn!("cannot read disk activity: {e}");
            None
        }
    };
    let net = match std::fs::read_to_string(root.join(NET_DEV)) {
        Ok(text) => Some(parse_net_dev(&text)),
        Err(e) => {
            log::warn!("cannot read network activity: {e}");
            None
        }
    };
    ActivitySample { disks, net }
}

/// Blend of red (writes) and blue (reads). Black when idle.
pub fn color_for_activity(reads: u64, writes: u64) -> Rgb {
    let total = reads.saturating_add(writes);
    if total == 0 {
        return Rgb::BLACK;
    }
    let share = |part: u64| (part as f64 / total as f64 * 255.0) as u8;
    Rgb::new(share(writes), 0, share(reads))
}

/// Brightness scaled from 32 (idle) to 255 (the busiest interval seen so far).
pub fn brightness_for_activity(activity: u64, max_activity: u64) -> u8 {
    if max_activity == 0 {
        return MIN_ACTIVE_BRIGHTNESS;
    }
    let scaled = activity as f64 / max_activity as f64 * 223.0;
    (MIN_ACTIVE_BRIGHTNESS as f64 + scaled).min(255.0) as u8
}

/// Fully saturated color at `hue` degrees.
pub fn hue_to_rgb(hue: f64) -> Rgb {
    let h = hue.rem_euclid(360.0) / 60.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    let (r, g, b) = match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    let channel = |v: f64| (v * 255.0).round() as u8;
    Rgb::new(channel(r), channel(g), channel(b))
}

/// Position on the color wheel `elapsed` into a sweep lasting `cycle`.
pub fn rainbow_color(elapsed: Duration, cycle: Duration) -> Rgb {
    let cycle_ms = cycle.as_millis().max(1);
    let progress = (elapsed.as_millis() % cycle_ms) as f64 / cycle_ms as f64;
    hue_to_rgb(progress * 360.0)
}
