//! LED controller handle: bus ownership, state cache and status cache.
//!
//! One lock owns the bus together with the per-LED state cache, so a modify
//! cycle (cache check, write, confirm, cache update) is atomic with respect
//! to every other caller. The status cache has its own lock and never waits
//! on the bus.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::codec::{LedStatus, StatusReply};
use crate::device::{self, BusInfo, LedBus};
use crate::engine::{self, Confirm};
use crate::led::{self, LedId, LedMode, ModeParams, Rgb};
use crate::protocol::{CMD_BRIGHTNESS, CMD_COLOR, MAX_PARAMS};
use crate::retry::RetryPolicy;

/// Last state confirmed by the device for one LED.
///
/// `None` means unknown: nothing has been applied through this handle yet,
/// so the next request for that attribute always reaches the bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedState {
    pub color: Option<Rgb>,
    pub brightness: Option<u8>,
    pub mode: Option<LedMode>,
    /// Timing bytes of the last blink/breath mode; zero otherwise.
    pub params: [u8; MAX_PARAMS],
}

struct Inner<B> {
    bus: B,
    policy: RetryPolicy,
    states: HashMap<LedId, LedState>,
}

/// Shared handle to the LED controller. Methods take `&self`; wrap in an
/// `Arc` to drive LEDs from several threads.
pub struct LedController<B: LedBus> {
    inner: Mutex<Inner<B>>,
    statuses: Mutex<HashMap<LedId, LedStatus>>,
    info: BusInfo,
}

impl<B: LedBus> LedController<B> {
    pub fn new(bus: B, policy: RetryPolicy) -> Self {
        let info = bus.info().clone();
        LedController {
            inner: Mutex::new(Inner {
                bus,
                policy,
                states: HashMap::new(),
            }),
            statuses: Mutex::new(HashMap::new()),
            info,
        }
    }

    /// Open the bus at `path` and wrap it in a controller.
    pub fn open(path: &str, address: u16, policy: RetryPolicy) -> device::Result<Self> {
        Ok(Self::new(B::open(path, address)?, policy))
    }

    pub fn bus_info(&self) -> &BusInfo {
        &self.info
    }

    pub fn policy(&self) -> RetryPolicy {
        self.lock().policy.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<B>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_statuses(&self) -> MutexGuard<'_, HashMap<LedId, LedStatus>> {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Best-effort status refresh after a confirmed write.
    fn refresh(&self, bus: &mut B, led: LedId) {
        match engine::read_status(bus, led) {
            Ok(reply) => {
                self.lock_statuses().insert(led, reply.status());
            }
            Err(e) => log::debug!("{led}: status refresh failed: {e}"),
        }
    }

    /// Set the color of `led`. No bus traffic if the color is already applied.
    pub fn set_color(&self, led: LedId, color: Rgb) -> led::Result<()> {
        let mut inner = self.lock();
        if inner.states.get(&led).and_then(|s| s.color) == Some(color) {
            log::debug!("{led}: color {color} already applied");
            return Ok(());
        }
        let Inner { bus, policy, .. } = &mut *inner;
        engine::modify_with_retry(
            bus,
            policy,
            led,
            CMD_COLOR,
            &color.to_bytes(),
            Confirm::Responds,
        )?;
        inner.states.entry(led).or_default().color = Some(color);
        self.refresh(&mut inner.bus, led);
        Ok(())
    }

    /// Set the brightness of `led`. No bus traffic if already applied.
    pub fn set_brightness(&self, led: LedId, brightness: u8) -> led::Result<()> {
        let mut inner = self.lock();
        if inner.states.get(&led).and_then(|s| s.brightness) == Some(brightness) {
            log::debug!("{led}: brightness {brightness} already applied");
            return Ok(());
        }
        let Inner { bus, policy, .. } = &mut *inner;
        engine::modify_with_retry(
            bus,
            policy,
            led,
            CMD_BRIGHTNESS,
            &[brightness],
            Confirm::Responds,
        )?;
        inner.states.entry(led).or_default().brightness = Some(brightness);
        self.refresh(&mut inner.bus, led);
        Ok(())
    }

    /// Set the mode of `led`.
    ///
    /// `params` is ignored for `off` and `on`, which are elided whenever the
    /// cache already holds that mode. Blink and breath take the four timing
    /// bytes (`cycle` then `on`, big-endian) and are elided only when both
    /// the mode and the timing match.
    pub fn set_mode(&self, led: LedId, mode: LedMode, params: &[u8]) -> led::Result<()> {
        let params = if mode.is_timed() {
            ModeParams::from_bytes(params)?.to_bytes()
        } else {
            [0; MAX_PARAMS]
        };

        let mut inner = self.lock();
        let cached = inner.states.get(&led).copied().unwrap_or_default();
        if cached.mode == Some(mode) && (!mode.is_timed() || cached.params == params) {
            log::debug!("{led}: mode {mode} already applied");
            return Ok(());
        }

        let payload: &[u8] = match mode {
            LedMode::Off => &[0],
            LedMode::On => &[1],
            LedMode::Blink | LedMode::Breath => &params,
        };
        let confirm = match mode {
            LedMode::Off => Confirm::Power(false),
            LedMode::On => Confirm::Power(true),
            LedMode::Blink | LedMode::Breath => Confirm::Responds,
        };
        let Inner { bus, policy, .. } = &mut *inner;
        engine::modify_with_retry(bus, policy, led, mode.command(), payload, confirm)?;

        let state = inner.states.entry(led).or_default();
        state.mode = Some(mode);
        state.params = params;
        self.refresh(&mut inner.bus, led);
        Ok(())
    }

    pub fn set_blink(&self, led: LedId, timing: ModeParams) -> led::Result<()> {
        self.set_mode(led, LedMode::Blink, &timing.to_bytes())
    }

    pub fn set_breath(&self, led: LedId, timing: ModeParams) -> led::Result<()> {
        self.set_mode(led, LedMode::Breath, &timing.to_bytes())
    }

    /// Last status observed for `led`. Never touches the bus; an LED that has
    /// not been read yet reports `available = false`.
    pub fn query_status(&self, led: LedId) -> LedStatus {
        self.lock_statuses()
            .get(&led)
            .copied()
            .unwrap_or_default()
    }

    /// Fresh status read of `led`. Also updates the status cache.
    pub fn read_status(&self, led: LedId) -> device::Result<StatusReply> {
        let mut inner = self.lock();
        let reply = engine::read_status(&mut inner.bus, led)?;
        self.lock_statuses().insert(led, reply.status());
        Ok(reply)
    }

    /// Fresh status of every LED, in identity order. Transport failures
    /// abort the sweep.
    pub fn refresh_all(&self) -> device::Result<Vec<(LedId, LedStatus)>> {
        LedId::all()
            .map(|led| Ok((led, self.read_status(led)?.status())))
            .collect()
    }

    /// Cached confirmed state of `led`, if anything was applied to it.
    pub fn cached_state(&self, led: LedId) -> Option<LedState> {
        self.lock().states.get(&led).copied()
    }
}
