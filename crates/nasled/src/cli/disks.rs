//! `disks` subcommand: list bay disks in LED order.

use std::path::Path;

use nasled_lib::disks::{self, SYSTEM_ROOT};

use super::{DiskInfo, DiskJson, DisksOutput, LedId, Result};

/// Discovered disks paired with their bay LED. Disks past the last bay get `None`.
fn collect_disks(root: &Path) -> Result<Vec<DiskJson>> {
    let found = disks::discover_disks(root)?;
    let mut bays = LedId::disks();
    Ok(found
        .into_iter()
        .map(|disk: DiskInfo| DiskJson {
            led: bays.next().map(|led| led.name().to_string()),
            disk,
        })
        .collect())
}

pub(super) fn cmd_disks(json: bool) -> Result<()> {
    let entries = collect_disks(Path::new(SYSTEM_ROOT))?;

    if json {
        return super::print_json(&DisksOutput {
            count: entries.len(),
            disks: entries,
        });
    }

    if entries.is_empty() {
        println!("No bay disks found.");
        return Ok(());
    }

    println!(
        "Found {} bay disk{}:",
        entries.len(),
        if entries.len() == 1 { "" } else { "s" }
    );
    println!();

    for entry in &entries {
        let d = &entry.disk;
        let led = entry.led.as_deref().unwrap_or("(no bay LED)");
        println!("  {led:<8} /dev/{}  {} port {}", d.name, d.pci_bus, d.port);
        if !d.hctl.is_empty() {
            println!("           HCTL:   {}", d.hctl);
        }
        if !d.serial.is_empty() {
            println!("           Serial: {}", d.serial);
        }
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::symlink;

    fn fake_root(disks: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for sub in ["sys/class/scsi_disk", "dev/disk/by-path", "sys/block", "run/udev/data"] {
            fs::create_dir_all(root.join(sub)).unwrap();
        }
        for (dev, link) in disks {
            let node = root.join("dev").join(dev);
            fs::write(&node, "").unwrap();
            symlink(&node, root.join("dev/disk/by-path").join(link)).unwrap();
        }
        dir
    }

    #[test]
    fn pairs_disks_with_bays_in_order() {
        let dir = fake_root(&[
            ("sdb", "pci-0000:00:17.0-ata-2"),
            ("sda", "pci-0000:59:00.0-ata-1"),
        ]);
        let entries = collect_disks(dir.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].disk.name, "sda");
        assert_eq!(entries[0].led.as_deref(), Some("disk1"));
        assert_eq!(entries[1].disk.name, "sdb");
        assert_eq!(entries[1].led.as_deref(), Some("disk2"));
    }

    #[test]
    fn empty_tree_yields_no_disks() {
        let dir = fake_root(&[]);
        assert!(collect_disks(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_sysfs_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_disks(dir.path()).is_err());
    }
}
