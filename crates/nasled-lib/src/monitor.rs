//! Activity monitor state machine: LED logic decoupled from I/O.
//!
//! [`ActivityMonitor`] turns successive activity samples into LED commands.
//! The CLI owns the loop, the clock and the controller; this module only
//! decides what each LED should show.

use std::collections::HashMap;
use std::time::Duration;

use crate::activity::{
    self, ActivitySample, DiskCounters, NetCounters, brightness_for_activity, color_for_activity,
};
use crate::config::Config;
use crate::controller::LedController;
use crate::device::LedBus;
use crate::disks::{DiskInfo, bay_assignments};
use crate::led::{self, LedId, LedMode, ModeParams, Rgb};

/// Network LED blink timing while traffic flows: 100 ms on, 100 ms off.
pub const NETWORK_BLINK: ModeParams = ModeParams {
    cycle_ms: 200,
    on_ms: 100,
};

/// One state change for one LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommand {
    Color { led: LedId, color: Rgb },
    Brightness { led: LedId, value: u8 },
    Mode {
        led: LedId,
        mode: LedMode,
        timing: Option<ModeParams>,
    },
}

impl LedCommand {
    pub fn led(&self) -> LedId {
        match *self {
            LedCommand::Color { led, .. }
            | LedCommand::Brightness { led, .. }
            | LedCommand::Mode { led, .. } => led,
        }
    }

    fn off(led: LedId) -> Self {
        LedCommand::Mode {
            led,
            mode: LedMode::Off,
            timing: None,
        }
    }

    /// Execute through the controller. Already-applied state costs no bus traffic.
    pub fn apply<B: LedBus>(&self, controller: &LedController<B>) -> led::Result<()> {
        match *self {
            LedCommand::Color { led, color } => controller.set_color(led, color),
            LedCommand::Brightness { led, value } => controller.set_brightness(led, value),
            LedCommand::Mode { led, mode, timing } => {
                let params = timing.map(|t| t.to_bytes()).unwrap_or_default();
                controller.set_mode(led, mode, &params)
            }
        }
    }
}

/// Which LEDs the monitor drives, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub disk_leds: bool,
    pub network_led: bool,
    pub enable_rainbow: bool,
    pub rainbow_cycle: Duration,
    pub rainbow_brightness: u8,
}

impl From<&Config> for MonitorSettings {
    fn from(config: &Config) -> Self {
        MonitorSettings {
            disk_leds: config.disk_leds,
            network_led: config.network_led,
            enable_rainbow: config.enable_rainbow,
            rainbow_cycle: config.rainbow_cycle(),
            rainbow_brightness: config.rainbow_brightness,
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        MonitorSettings::from(&Config::default())
    }
}

/// Activity monitor state: previous counters and the busiest interval seen.
pub struct ActivityMonitor {
    settings: MonitorSettings,
    /// Bay LED → block device name. Bays without a disk are absent.
    bays: HashMap<LedId, String>,
    prev_disks: HashMap<String, DiskCounters>,
    prev_net: Option<NetCounters>,
    max_disk_activity: u64,
    max_net_activity: u64,
}

impl ActivityMonitor {
    pub fn new(settings: MonitorSettings, disks: &[DiskInfo]) -> Self {
        let bays = bay_assignments(disks)
            .into_iter()
            .map(|(led, disk)| (led, disk.name.clone()))
            .collect();
        ActivityMonitor {
            settings,
            bays,
            prev_disks: HashMap::new(),
            prev_net: None,
            max_disk_activity: 0,
            max_net_activity: 0,
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Swap in new settings while running. Returns off commands for the
    /// activity LEDs the new settings no longer drive. A group that is
    /// switched back on starts from a fresh baseline.
    pub fn update_settings(&mut self, settings: MonitorSettings) -> Vec<LedCommand> {
        let mut commands = Vec::new();
        if self.settings.disk_leds && !settings.disk_leds {
            commands.extend(LedId::disks().map(LedCommand::off));
        }
        if !self.settings.disk_leds && settings.disk_leds {
            self.prev_disks.clear();
        }
        if self.settings.network_led && !settings.network_led {
            commands.push(LedCommand::off(LedId::NETWORK));
        }
        if !self.settings.network_led && settings.network_led {
            self.prev_net = None;
        }
        if settings != self.settings {
            log::info!("[monitor] settings updated: {settings:?}");
        }
        self.settings = settings;
        commands
    }

    /// Block devices to sample, in bay order.
    pub fn devices(&self) -> Vec<String> {
        LedId::disks()
            .filter_map(|led| self.bays.get(&led).cloned())
            .collect()
    }

    /// Device driving bay LED `led`, if any.
    pub fn device_for(&self, led: LedId) -> Option<&str> {
        self.bays.get(&led).map(String::as_str)
    }

    /// Record a baseline without producing commands.
    pub fn prime(&mut self, sample: &ActivitySample) {
        if let Some(disks) = &sample.disks {
            self.prev_disks = disks.clone();
        }
        if let Some(net) = sample.net {
            self.prev_net = Some(net);
        }
    }

    /// Commands for the next sample. `elapsed` is the time since the monitor started.
    pub fn plan(&mut self, sample: &ActivitySample, elapsed: Duration) -> Vec<LedCommand> {
        let mut commands = Vec::new();
        if self.settings.disk_leds {
            self.plan_disks(sample, &mut commands);
        }
        if self.settings.network_led {
            self.plan_network(sample, &mut commands);
        }
        if self.settings.enable_rainbow {
            self.plan_rainbow(elapsed, &mut commands);
        }
        commands
    }

    fn plan_disks(&mut self, sample: &ActivitySample, commands: &mut Vec<LedCommand>) {
        let Some(current) = &sample.disks else {
            return;
        };

        let deltas: HashMap<LedId, DiskCounters> = self
            .bays
            .iter()
            .filter_map(|(led, dev)| {
                let curr = current.get(dev)?;
                let prev = self.prev_disks.get(dev)?;
                Some((*led, curr.delta(prev)))
            })
            .collect();
        if let Some(busiest) = deltas.values().map(DiskCounters::total).max() {
            self.max_disk_activity = self.max_disk_activity.max(busiest);
        }

        for led in LedId::disks() {
            let delta = deltas.get(&led).copied().unwrap_or_default();
            let color = color_for_activity(delta.reads, delta.writes);
            if color.is_black() {
                commands.push(LedCommand::off(led));
            } else {
                let value = brightness_for_activity(delta.total(), self.max_disk_activity);
                commands.push(LedCommand::Color { led, color });
                commands.push(LedCommand::Brightness { led, value });
                commands.push(LedCommand::Mode {
                    led,
                    mode: LedMode::On,
                    timing: None,
                });
            }
        }
        self.prev_disks = current.clone();
    }

    fn plan_network(&mut self, sample: &ActivitySample, commands: &mut Vec<LedCommand>) {
        let Some(current) = sample.net else {
            return;
        };
        let delta = self
            .prev_net
            .map(|prev| current.delta(&prev))
            .unwrap_or_default();
        self.prev_net = Some(current);
        self.max_net_activity = self.max_net_activity.max(delta.total());

        let led = LedId::NETWORK;
        let color = color_for_activity(delta.rx, delta.tx);
        if color.is_black() {
            commands.push(LedCommand::off(led));
            return;
        }
        let value = brightness_for_activity(delta.total(), self.max_net_activity);
        commands.push(LedCommand::Color { led, color });
        commands.push(LedCommand::Brightness { led, value });
        commands.push(LedCommand::Mode {
            led,
            mode: LedMode::Blink,
            timing: Some(NETWORK_BLINK),
        });
    }

    fn plan_rainbow(&self, elapsed: Duration, commands: &mut Vec<LedCommand>) {
        let led = LedId::POWER;
        commands.push(LedCommand::Color {
            led,
            color: activity::rainbow_color(elapsed, self.settings.rainbow_cycle),
        });
        commands.push(LedCommand::Brightness {
            led,
            value: self.settings.rainbow_brightness,
        });
        commands.push(LedCommand::Mode {
            led,
            mode: LedMode::On,
            timing: None,
        });
    }

    /// Commands that switch off every activity LED the monitor drives.
    pub fn shutdown_commands(&self) -> Vec<LedCommand> {
        let mut commands = Vec::new();
        if self.settings.disk_leds {
            commands.extend(LedId::disks().map(LedCommand::off));
        }
        if self.settings.network_led {
            commands.push(LedCommand::off(LedId::NETWORK));
        }
        commands
    }

    /// Execute `commands` in order. A failing LED is logged and skipped; the
    /// rest still run. Returns the number of failed commands.
    pub fn apply<B: LedBus>(controller: &LedController<B>, commands: &[LedCommand]) -> usize {
        let mut failures = 0;
        for cmd in commands {
            if let Err(e) = cmd.apply(controller) {
                log::warn!("{e}");
                failures += 1;
            }
        }
        failures
    }

    /// Plan and apply one sample. Returns the number of failed commands.
    pub fn step<B: LedBus>(
        &mut self,
        controller: &LedController<B>,
        sample: &ActivitySample,
        elapsed: Duration,
    ) -> usize {
        let commands = self.plan(sample, elapsed);
        Self::apply(controller, &commands)
    }
}
