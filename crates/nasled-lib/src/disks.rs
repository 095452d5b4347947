//! Disk discovery: which block device sits behind which front-panel bay.
//!
//! Bays are ordered by their SATA attachment (`/dev/disk/by-path`), which is
//! stable across reboots, unlike `sdX` names. All paths are resolved below an
//! injectable root so the logic runs against a fake tree in tests.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{NasledError, Result};
use crate::led::LedId;

/// Root of the live system.
pub const SYSTEM_ROOT: &str = "/";

const SCSI_DISK_DIR: &str = "sys/class/scsi_disk";
const BY_PATH_DIR: &str = "dev/disk/by-path";
const SYS_BLOCK_DIR: &str = "sys/block";
const UDEV_DATA_DIR: &str = "run/udev/data";
const SERIAL_KEY: &str = "E:ID_SERIAL_SHORT=";

/// A disk attached to one of the front bays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskInfo {
    /// Kernel block device name, e.g. `sda`.
    pub name: String,
    /// SCSI host:channel:target:lun, empty if unknown.
    pub hctl: String,
    /// Short serial from udev, empty if unknown.
    pub serial: String,
    /// `by-path` link name the disk was found through.
    pub path: String,
    /// PCI address of the SATA controller, e.g. `0000:59:00.0`.
    pub pci_bus: String,
    /// ATA port on that controller (1-based).
    pub port: u32,
}

/// Parse a `by-path` link name like `pci-0000:59:00.0-ata-1` into the PCI
/// bus address and ATA port.
pub fn parse_pci_ata(name: &str) -> Option<(String, u32)> {
    let parts: Vec<&str> = name.split('-').collect();
    if parts.len() < 3 {
        return None;
    }
    let mut bus = None;
    let mut port = None;
    for pair in parts.windows(2) {
        match pair[0] {
            "pci" => bus = Some(pair[1]),
            "ata" => port = Some(pair[1].parse::<u32>().ok()?),
            _ => {}
        }
    }
    match (bus, port) {
        (Some(bus), Some(port)) if !bus.is_empty() && port > 0 => Some((bus.to_string(), port)),
        _ => None,
    }
}

/// Whole-disk SCSI device names (`sda`..`sdz`); partitions are excluded.
fn is_whole_disk(dev: &str) -> bool {
    dev.len() == 3 && dev.starts_with("sd")
}

fn read_dir_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names)
}

/// Block device name → HCTL, from `sys/class/scsi_disk/<hctl>/device/block/<dev>`.
fn hctl_map(root: &Path) -> Result<HashMap<String, String>> {
    let dir = root.join(SCSI_DISK_DIR);
    let entries = read_dir_names(&dir)
        .map_err(|e| NasledError::Disk(format!("{}: {e}", dir.display())))?;
    let mut map = HashMap::new();
    for hctl in entries {
        let block = dir.join(&hctl).join("device").join("block");
        if let Some(dev) = read_dir_names(&block).ok().and_then(|n| n.into_iter().next()) {
            map.insert(dev, hctl);
        }
    }
    Ok(map)
}

/// Block device name → short serial, from the udev database keyed by `major:minor`.
fn serial_map(root: &Path) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let block_dir = root.join(SYS_BLOCK_DIR);
    let devs = match read_dir_names(&block_dir) {
        Ok(devs) => devs,
        Err(e) => {
            log::warn!("cannot read disk serials from {}: {e}", block_dir.display());
            return map;
        }
    };
    for dev in devs {
        let Ok(devnum) = fs::read_to_string(block_dir.join(&dev).join("dev")) else {
            continue;
        };
        let udev = root
            .join(UDEV_DATA_DIR)
            .join(format!("b{}", devnum.trim()));
        let Ok(data) = fs::read_to_string(udev) else {
            continue;
        };
        if let Some(serial) = data.lines().find_map(|l| l.strip_prefix(SERIAL_KEY)) {
            map.insert(dev, serial.trim().to_string());
        }
    }
    map
}

/// Discover bay disks below `root`, in bay order.
///
/// Sorted by PCI bus (descending), then ATA port (ascending). The disk at
/// index `i` belongs to LED `disk(i + 1)`.
pub fn discover_disks(root: &Path) -> Result<Vec<DiskInfo>> {
    let hctls = hctl_map(root)?;
    let serials = serial_map(root);

    let by_path = root.join(BY_PATH_DIR);
    let links = read_dir_names(&by_path)
        .map_err(|e| NasledError::Disk(format!("{}: {e}", by_path.display())))?;

    let mut seen = HashSet::new();
    let mut disks = Vec::new();
    for link in links {
        let Ok(resolved) = fs::canonicalize(by_path.join(&link)) else {
            continue;
        };
        let Some(dev) = resolved.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if !is_whole_disk(&dev) || !seen.insert(dev.clone()) {
            continue;
        }
        let Some((pci_bus, port)) = parse_pci_ata(&link) else {
            log::debug!("skipping {link}: not a pci-*-ata-* link");
            continue;
        };
        disks.push(DiskInfo {
            hctl: hctls.get(&dev).cloned().unwrap_or_default(),
            serial: serials.get(&dev).cloned().unwrap_or_default(),
            name: dev,
            path: link,
            pci_bus,
            port,
        });
    }

    disks.sort_by(|a, b| b.pci_bus.cmp(&a.pci_bus).then(a.port.cmp(&b.port)));
    Ok(disks)
}

/// Pair each discovered disk with its bay LED. Disks beyond the last bay are dropped.
pub fn bay_assignments(disks: &[DiskInfo]) -> Vec<(LedId, &DiskInfo)> {
    disks
        .iter()
        .zip(LedId::disks())
        .map(|(disk, led)| (led, disk))
        .collect()
}
