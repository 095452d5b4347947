//! Integration tests: LED state changes end to end against the simulated controller.
//!
//! These drive the public controller and monitor API over `MockBus` and check
//! the bus traffic the simulated hardware sees.

use std::sync::Arc;
use std::time::Duration;

use nasled_lib::LedController;
use nasled_lib::activity::{ActivitySample, DiskCounters, NetCounters};
use nasled_lib::codec::{self, StatusReply, checksum, decode_status, encode_command, verify_checksum};
use nasled_lib::device::mock::MockBus;
use nasled_lib::disks::DiskInfo;
use nasled_lib::led::{LedError, LedId, LedMode, ModeParams, OpMode, Rgb};
use nasled_lib::monitor::{ActivityMonitor, MonitorSettings};
use nasled_lib::protocol::*;
use nasled_lib::retry::RetryPolicy;

fn controller() -> (LedController<MockBus>, MockBus) {
    let bus = MockBus::new();
    (
        LedController::new(bus.clone(), RetryPolicy::immediate()),
        bus,
    )
}

fn bay(n: u8) -> LedId {
    LedId::disk(n).unwrap()
}

// ── Codec ──

#[test]
fn checksum_definition_holds_for_varied_inputs() {
    let mut seed: u32 = 0x1234_5678;
    for len in 2..40usize {
        let mut data: Vec<u8> = (0..len)
            .map(|_| {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (seed >> 16) as u8
            })
            .collect();
        let sum = data[..len - 2]
            .iter()
            .fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
        let [hi, lo] = sum.to_be_bytes();
        data[len - 2] = hi;
        data[len - 1] = lo;
        assert_eq!(verify_checksum(&data), sum != 0, "len {len}");
        data[len - 1] = lo.wrapping_add(1);
        assert!(!verify_checksum(&data), "len {len} corrupted");
    }
}

#[test]
fn bad_replies_decode_as_not_present() {
    assert_eq!(decode_status(&[]), StatusReply::NotPresent);
    assert_eq!(decode_status(&[0u8; 11]), StatusReply::NotPresent);
    assert_eq!(decode_status(&[1u8; 12]), StatusReply::NotPresent);
    let status = StatusReply::NotPresent.status();
    assert!(!status.available);
    assert_eq!(status, codec::LedStatus::default());
}

#[test]
fn frame_checksum_covers_zeroed_identity() {
    let frame = encode_command(LedId::new(3).unwrap(), CMD_COLOR, &[10, 20, 30]).unwrap();
    let bytes = frame.as_bytes();
    assert_eq!(bytes[0], 3);
    let mut covered = bytes[..FRAME_CHECKSUM_SPAN].to_vec();
    covered[0] = 0;
    assert_eq!(
        checksum(&covered),
        u16::from_be_bytes([bytes[FRAME_LEN - 2], bytes[FRAME_LEN - 1]])
    );
}

// ── Controller ──

#[test]
fn identical_colors_cost_one_write() {
    let (ctl, bus) = controller();
    ctl.set_color(LedId::POWER, Rgb::new(255, 0, 0)).unwrap();
    ctl.set_color(LedId::POWER, Rgb::new(255, 0, 0)).unwrap();
    assert_eq!(bus.write_count(), 1);
    assert_eq!(bus.state().rejected_frames, 0);
}

#[test]
fn transient_failures_are_retried() {
    for k in 0..5 {
        let (ctl, bus) = controller();
        bus.fail_next_writes(k);
        ctl.set_brightness(bay(2), 200).unwrap();
        assert_eq!(bus.write_count(), k as usize + 1, "k = {k}");
        assert_eq!(bus.sim(bay(2)).brightness, 200);
    }
}

#[test]
fn exhausted_retries_report_led_and_cause() {
    let (ctl, bus) = controller();
    bus.fail_next_writes(5);
    let err = ctl.set_color(bay(3), Rgb::new(0, 255, 0)).unwrap_err();
    let LedError::CommandFailed {
        led,
        attempts,
        cause,
    } = err
    else {
        panic!("expected CommandFailed");
    };
    assert_eq!(led, bay(3));
    assert_eq!(attempts, 5);
    assert!(cause.is_some());
}

#[test]
fn blink_round_trip_through_status() {
    let (ctl, _bus) = controller();
    let timing = ModeParams::new(200, 100).unwrap();
    ctl.set_mode(bay(1), LedMode::Blink, &timing.to_bytes())
        .unwrap();

    let status = ctl.query_status(bay(1));
    assert!(status.available);
    assert_eq!(status.op_mode, OpMode::Blink);
    assert_eq!(status.on_duration_ms, 100);
    assert_eq!(status.cycle_duration_ms, 200);
    assert_eq!(status.off_duration_ms(), 100);
}

#[test]
fn on_off_confirm_reported_mode() {
    let (ctl, bus) = controller();
    ctl.set_mode(LedId::NETWORK, LedMode::On, &[]).unwrap();
    assert_eq!(ctl.query_status(LedId::NETWORK).op_mode, OpMode::On);
    ctl.set_mode(LedId::NETWORK, LedMode::Off, &[]).unwrap();
    assert_eq!(ctl.query_status(LedId::NETWORK).op_mode, OpMode::Off);
    assert_eq!(bus.write_count(), 2);
}

#[test]
fn power_change_ignored_by_device_fails() {
    let (ctl, bus) = controller();
    bus.state().ignore_writes = true;
    let err = ctl.set_mode(bay(6), LedMode::On, &[]).unwrap_err();
    assert!(matches!(err, LedError::CommandFailed { cause: None, .. }));
    assert_eq!(ctl.cached_state(bay(6)), None);
}

#[test]
fn leds_are_independent() {
    let (ctl, bus) = controller();
    bus.set_absent(bay(4));
    assert!(ctl.set_color(bay(4), Rgb::new(1, 2, 3)).is_err());
    ctl.set_color(bay(5), Rgb::new(1, 2, 3)).unwrap();
    assert_eq!(bus.sim(bay(5)).color, Rgb::new(1, 2, 3));
}

#[test]
fn shared_handle_serializes_callers() {
    let bus = MockBus::new();
    let ctl = Arc::new(LedController::new(bus.clone(), RetryPolicy::immediate()));
    let threads: Vec<_> = LedId::all()
        .map(|led| {
            let ctl = Arc::clone(&ctl);
            std::thread::spawn(move || {
                for _ in 0..3 {
                    ctl.set_color(led, Rgb::new(led.raw(), 0, 0)).unwrap();
                    ctl.set_mode(led, LedMode::On, &[]).unwrap();
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }
    assert_eq!(bus.write_count(), 2 * LED_COUNT as usize);
    for led in LedId::all() {
        assert_eq!(bus.sim(led).color, Rgb::new(led.raw(), 0, 0));
    }
}

// ── Monitor ──

fn bay_disk(name: &str, port: u32) -> DiskInfo {
    DiskInfo {
        name: name.into(),
        hctl: String::new(),
        serial: String::new(),
        path: format!("pci-0000:59:00.0-ata-{port}"),
        pci_bus: "0000:59:00.0".into(),
        port,
    }
}

fn sample(sda: (u64, u64), net: (u64, u64)) -> ActivitySample {
    ActivitySample {
        disks: Some(
            [(
                "sda".to_string(),
                DiskCounters {
                    reads: sda.0,
                    writes: sda.1,
                },
            )]
            .into_iter()
            .collect(),
        ),
        net: Some(NetCounters {
            rx: net.0,
            tx: net.1,
        }),
    }
}

#[test]
fn monitor_reflects_activity_on_panel() {
    let (ctl, bus) = controller();
    let mut monitor = ActivityMonitor::new(MonitorSettings::default(), &[bay_disk("sda", 1)]);
    monitor.prime(&sample((0, 0), (0, 0)));

    let failures = monitor.step(&ctl, &sample((64, 0), (500, 0)), Duration::from_millis(100));
    assert_eq!(failures, 0);

    assert_eq!(bus.sim(bay(1)).color, Rgb::new(0, 0, 255));
    assert_eq!(bus.sim(bay(1)).mode, MODE_ON);
    assert_eq!(bus.sim(bay(2)).mode, MODE_OFF);

    let lan = bus.sim(LedId::NETWORK);
    assert_eq!(lan.mode, MODE_BLINK);
    assert_eq!((lan.cycle_ms, lan.on_ms), (200, 100));

    let power = bus.sim(LedId::POWER);
    assert_eq!(power.mode, MODE_ON);
    assert_eq!(power.brightness, 48);
    assert!(!power.color.is_black());

    // Idle interval: activity LEDs go dark.
    monitor.step(&ctl, &sample((64, 0), (500, 0)), Duration::from_millis(200));
    assert_eq!(bus.sim(bay(1)).mode, MODE_OFF);
    assert_eq!(bus.sim(LedId::NETWORK).mode, MODE_OFF);

    let shutdown = monitor.shutdown_commands();
    assert_eq!(ActivityMonitor::apply(&ctl, &shutdown), 0);
}
