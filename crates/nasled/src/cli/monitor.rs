//! `monitor` subcommand: drive the front panel from disk and network activity.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime};

use nasled_lib::activity;
use nasled_lib::device::LedBus;
use nasled_lib::disks::{self, SYSTEM_ROOT};
use nasled_lib::monitor::{ActivityMonitor, MonitorSettings};

use super::{Config, DiskInfo, LedController, RUNNING, Result};

/// State for the `monitor` command, created during setup.
struct MonitorCtx<B: LedBus> {
    controller: LedController<B>,
    monitor: ActivityMonitor,
    devices: Vec<String>,
    poll_interval: Duration,
    config: Config,
    /// File watched for live changes, if any.
    config_path: Option<PathBuf>,
    config_stamp: Option<FileStamp>,
}

/// Modification time and length of the config file when it was last read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

fn file_stamp(path: &Path) -> Option<FileStamp> {
    let meta = fs::metadata(path).ok()?;
    Some(FileStamp {
        modified: meta.modified().ok()?,
        len: meta.len(),
    })
}

/// Bay disks below `root`. Discovery failure leaves the bay LEDs idle
/// instead of stopping the monitor.
fn find_disks(root: &Path) -> Vec<DiskInfo> {
    match disks::discover_disks(root) {
        Ok(found) => found,
        Err(e) => {
            log::warn!("[disks] {e}");
            Vec::new()
        }
    }
}

fn monitor_setup<B: LedBus>(
    controller: LedController<B>,
    config: &Config,
    disks: &[DiskInfo],
    root: &Path,
    config_path: Option<PathBuf>,
) -> MonitorCtx<B> {
    let mut monitor = ActivityMonitor::new(MonitorSettings::from(config), disks);
    let devices = monitor.devices();
    monitor.prime(&activity::sample(root, &devices));
    log::debug!(
        "[monitor] worst-case failing LED command: {:?}",
        config.retry_policy().worst_case()
    );
    MonitorCtx {
        controller,
        monitor,
        devices,
        poll_interval: config.poll_interval(),
        config: config.clone(),
        config_stamp: config_path.as_deref().and_then(file_stamp),
        config_path,
    }
}

/// Re-read the config file if it changed since the last read, and apply the
/// monitor settings and poll interval from it. Bus settings and timing only
/// take effect on restart. Returns whether a reload happened.
fn reload_if_changed<B: LedBus>(mctx: &mut MonitorCtx<B>) -> bool {
    let Some(path) = mctx.config_path.as_deref() else {
        return false;
    };
    let stamp = file_stamp(path);
    if stamp == mctx.config_stamp {
        return false;
    }
    mctx.config_stamp = stamp;

    let config = super::load_config(Some(path));
    log::info!("[config] reloaded {}", path.display());
    if config.i2c_bus != mctx.config.i2c_bus
        || config.i2c_address != mctx.config.i2c_address
        || config.timing != mctx.config.timing
    {
        log::warn!("[config] bus and timing changes take effect after a restart");
    }

    let dropped = mctx.monitor.update_settings(MonitorSettings::from(&config));
    let failures = ActivityMonitor::apply(&mctx.controller, &dropped);
    if failures > 0 {
        log::warn!("{failures} LED(s) could not be switched off");
    }
    mctx.poll_interval = config.poll_interval();
    mctx.config = config;
    true
}

/// Sample and apply until `running` is cleared.
fn monitor_loop<B: LedBus>(mctx: &mut MonitorCtx<B>, root: &Path, running: &AtomicBool) {
    let start = Instant::now();
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(mctx.poll_interval);
        reload_if_changed(mctx);
        let sample = activity::sample(root, &mctx.devices);
        let failures = mctx
            .monitor
            .step(&mctx.controller, &sample, start.elapsed());
        if failures > 0 {
            log::debug!("[monitor] {failures} LED command(s) failed this tick");
        }
    }
}

/// Switch the activity LEDs off on exit.
fn monitor_teardown<B: LedBus>(mctx: &MonitorCtx<B>) -> usize {
    let commands = mctx.monitor.shutdown_commands();
    ActivityMonitor::apply(&mctx.controller, &commands)
}

pub(super) fn cmd_monitor(config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path);
    let controller = super::open_controller(&config)?;
    println!("[bus]    {}", controller.bus_info());

    let root = Path::new(SYSTEM_ROOT);
    let disks = find_disks(root);
    for (led, disk) in disks::bay_assignments(&disks) {
        println!("[disks]  {led} <- /dev/{} ({} port {})", disk.name, disk.pci_bus, disk.port);
    }
    if disks.is_empty() {
        println!("[disks]  no bay disks found");
    }

    let watched = config_path.map(Path::to_path_buf).or_else(Config::path);
    let mut mctx = monitor_setup(controller, &config, &disks, root, watched);
    let settings = mctx.monitor.settings();
    println!(
        "[config] disks: {}, network: {}, rainbow: {}, poll: {}ms",
        settings.disk_leds, settings.network_led, settings.enable_rainbow, config.poll_interval_ms
    );
    println!();
    println!("Monitoring... (Ctrl+C to stop)");

    monitor_loop(&mut mctx, root, &RUNNING);

    println!();
    println!("Switching activity LEDs off...");
    let failures = monitor_teardown(&mctx);
    if failures > 0 {
        log::warn!("{failures} LED(s) could not be switched off");
    }
    println!("Done.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use nasled_lib::device::mock::MockBus;
    use nasled_lib::led::{LedId, Rgb};
    use nasled_lib::protocol::{MODE_OFF, MODE_ON};
    use nasled_lib::retry::RetryPolicy;

    const NET_DEV_HEADER: &str = "Inter-|   Receive                            |  Transmit\n face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n";

    /// Fake procfs with one disk and one idle interface.
    fn write_proc(root: &Path, sda_sectors_read: u64) {
        let proc = root.join("proc/net");
        fs::create_dir_all(&proc).unwrap();
        fs::write(
            root.join("proc/diskstats"),
            format!("   8       0 sda 0 0 {sda_sectors_read} 0 0 0 0 0 0 0 0\n"),
        )
        .unwrap();
        fs::write(
            proc.join("dev"),
            format!("{NET_DEV_HEADER}  eth0: 1000 10 0 0 0 0 0 0 2000 10 0 0 0 0 0 0\n"),
        )
        .unwrap();
    }

    fn sda() -> DiskInfo {
        DiskInfo {
            name: "sda".into(),
            hctl: String::new(),
            serial: String::new(),
            path: "pci-0000:59:00.0-ata-1".into(),
            pci_bus: "0000:59:00.0".into(),
            port: 1,
        }
    }

    fn test_config() -> Config {
        Config {
            poll_interval_ms: 10,
            enable_rainbow: false,
            ..Config::default()
        }
    }

    fn setup(root: &Path) -> (MonitorCtx<MockBus>, MockBus) {
        let bus = MockBus::new();
        let ctl = LedController::new(bus.clone(), RetryPolicy::immediate());
        (monitor_setup(ctl, &test_config(), &[sda()], root, None), bus)
    }

    const WATCHED_CONFIG: &str = "poll_interval_ms = 10\nenable_rainbow = false\n";
    const EDITED_CONFIG: &str =
        "poll_interval_ms = 20\nenable_rainbow = false\nnetwork_led = false\n";

    /// Monitor watching a config file at `root/nasled.toml`.
    fn setup_watched(root: &Path) -> (MonitorCtx<MockBus>, MockBus, PathBuf) {
        let path = root.join("nasled.toml");
        fs::write(&path, WATCHED_CONFIG).unwrap();
        let (config, _) = Config::load_from(&path);
        let bus = MockBus::new();
        let ctl = LedController::new(bus.clone(), RetryPolicy::immediate());
        let mctx = monitor_setup(ctl, &config, &[sda()], root, Some(path.clone()));
        (mctx, bus, path)
    }

    /// Rewrite the config and move its mtime forward so the change is seen
    /// even on filesystems with coarse timestamps.
    fn edit_config(path: &Path, contents: &str) {
        fs::write(path, contents).unwrap();
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();
    }

    #[test]
    fn setup_primes_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        write_proc(dir.path(), 10);
        let (mctx, bus) = setup(dir.path());
        assert_eq!(mctx.devices, vec!["sda".to_string()]);
        assert_eq!(mctx.poll_interval, Duration::from_millis(10));
        assert_eq!(bus.write_count(), 0);
    }

    #[test]
    fn loop_stops_when_flag_cleared() {
        let dir = tempfile::tempdir().unwrap();
        write_proc(dir.path(), 10);
        let (mut mctx, bus) = setup(dir.path());
        write_proc(dir.path(), 500);

        let running = Arc::new(AtomicBool::new(true));
        let stopper = {
            let running = Arc::clone(&running);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                running.store(false, Ordering::SeqCst);
            })
        };
        monitor_loop(&mut mctx, dir.path(), &running);
        stopper.join().unwrap();

        // First tick sees the read burst; later ticks see it idle again.
        assert!(bus.writes_to(LedId::disk(1).unwrap()) > 0);
        assert_eq!(bus.sim(LedId::disk(1).unwrap()).color, Rgb::new(0, 0, 255));
    }

    #[test]
    fn cleared_flag_skips_loop() {
        let dir = tempfile::tempdir().unwrap();
        write_proc(dir.path(), 10);
        let (mut mctx, bus) = setup(dir.path());
        monitor_loop(&mut mctx, dir.path(), &AtomicBool::new(false));
        assert_eq!(bus.write_count(), 0);
    }

    #[test]
    fn teardown_switches_activity_leds_off() {
        let dir = tempfile::tempdir().unwrap();
        write_proc(dir.path(), 10);
        let (mctx, bus) = setup(dir.path());
        mctx.controller
            .set_mode(LedId::NETWORK, nasled_lib::led::LedMode::On, &[])
            .unwrap();
        assert_eq!(bus.sim(LedId::NETWORK).mode, MODE_ON);

        assert_eq!(monitor_teardown(&mctx), 0);
        assert_eq!(bus.sim(LedId::NETWORK).mode, MODE_OFF);
        assert_eq!(bus.sim(LedId::POWER).mode, MODE_OFF);
        assert_eq!(bus.writes_to(LedId::POWER), 0);
    }

    #[test]
    fn unchanged_config_is_not_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        write_proc(dir.path(), 10);
        let (mut mctx, _bus, _path) = setup_watched(dir.path());
        assert!(!reload_if_changed(&mut mctx));
        assert_eq!(mctx.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn unwatched_config_is_not_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        write_proc(dir.path(), 10);
        let (mut mctx, _bus) = setup(dir.path());
        assert!(!reload_if_changed(&mut mctx));
    }

    #[test]
    fn edited_config_applies_settings() {
        let dir = tempfile::tempdir().unwrap();
        write_proc(dir.path(), 10);
        let (mut mctx, bus, path) = setup_watched(dir.path());
        mctx.controller
            .set_mode(LedId::NETWORK, nasled_lib::led::LedMode::On, &[])
            .unwrap();

        edit_config(&path, EDITED_CONFIG);
        assert!(reload_if_changed(&mut mctx));
        assert_eq!(mctx.poll_interval, Duration::from_millis(20));
        assert!(!mctx.monitor.settings().network_led);
        assert!(mctx.monitor.settings().disk_leds);
        // The network LED is no longer driven, so it is switched off.
        assert_eq!(bus.sim(LedId::NETWORK).mode, MODE_OFF);
        assert!(!reload_if_changed(&mut mctx));
    }

    #[test]
    fn edited_config_is_clamped_on_reload() {
        let dir = tempfile::tempdir().unwrap();
        write_proc(dir.path(), 10);
        let (mut mctx, _bus, path) = setup_watched(dir.path());
        edit_config(&path, "poll_interval_ms = 99999\n");
        assert!(reload_if_changed(&mut mctx));
        assert_eq!(mctx.poll_interval, Duration::from_millis(5000));
    }

    #[test]
    fn loop_picks_up_config_edit() {
        let dir = tempfile::tempdir().unwrap();
        write_proc(dir.path(), 10);
        let (mut mctx, _bus, path) = setup_watched(dir.path());

        let running = Arc::new(AtomicBool::new(true));
        let editor = {
            let running = Arc::clone(&running);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                edit_config(&path, EDITED_CONFIG);
                std::thread::sleep(Duration::from_millis(100));
                running.store(false, Ordering::SeqCst);
            })
        };
        monitor_loop(&mut mctx, dir.path(), &running);
        editor.join().unwrap();

        assert_eq!(mctx.poll_interval, Duration::from_millis(20));
        assert!(!mctx.monitor.settings().network_led);
    }

    #[test]
    fn missing_sysfs_yields_no_disks() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_disks(dir.path()).is_empty());
    }
}
