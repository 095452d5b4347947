//! Bus transport trait and the Linux I2C backend.
//!
//! A transport performs raw I2C block transactions against the LED controller.
//! It never caches or retries; the write-confirm engine decides what to do
//! when a transaction fails.

use std::fmt;

use serde::Serialize;

use crate::protocol::MAX_BLOCK_LEN;

// ── Error type ──

/// Transport errors.
///
/// String payloads follow the convention **"context: details"** where *context*
/// identifies the operation (e.g. `"block read 0x83"`, `"/dev/i2c-0"`) and
/// *details* describes what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The bus device node does not exist.
    NotFound(String),
    /// The node exists but could not be opened or the slave address bind failed.
    OpenFailed(String),
    /// A single bus transaction failed.
    TransactFailed(String),
    /// No transport backend for this platform.
    Unsupported(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NotFound(path) => write!(f, "I2C bus not found: {path}"),
            DeviceError::OpenFailed(e) => write!(f, "Failed to open I2C bus: {e}"),
            DeviceError::TransactFailed(e) => write!(f, "Transaction failed: {e}"),
            DeviceError::Unsupported(e) => write!(f, "Unsupported platform: {e}"),
        }
    }
}

impl std::error::Error for DeviceError {}

pub type Result<T> = std::result::Result<T, DeviceError>;

// ── Bus info ──

#[derive(Debug, Clone, Serialize)]
pub struct BusInfo {
    /// Adapter device node, e.g. `/dev/i2c-0`.
    pub path: String,
    /// 7-bit slave address of the LED controller.
    pub address: u16,
}

impl fmt::Display for BusInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ 0x{:02X}", self.path, self.address)
    }
}

// ── Trait ──

pub trait LedBus {
    /// Open the adapter and bind the controller's slave address.
    fn open(path: &str, address: u16) -> Result<Self>
    where
        Self: Sized;
    fn info(&self) -> &BusInfo;
    /// I2C block read of up to `len` bytes from `register`.
    fn block_read(&mut self, register: u8, len: u8) -> Result<Vec<u8>>;
    /// I2C block write of `data` (length-prefixed on the wire) to `register`.
    fn block_write(&mut self, register: u8, data: &[u8]) -> Result<()>;
}

fn check_block_len(op: &str, register: u8, len: usize) -> Result<()> {
    if len > MAX_BLOCK_LEN {
        return Err(DeviceError::TransactFailed(format!(
            "{op} 0x{register:02X}: {len} bytes exceeds block limit of {MAX_BLOCK_LEN}"
        )));
    }
    Ok(())
}

// ── Linux implementation ──

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use std::path::Path;

    use i2cdev::core::I2CDevice;
    use i2cdev::linux::LinuxI2CDevice;

    pub struct I2cBus {
        device: LinuxI2CDevice,
        info: BusInfo,
    }

    impl LedBus for I2cBus {
        fn open(path: &str, address: u16) -> Result<Self> {
            if !Path::new(path).exists() {
                return Err(DeviceError::NotFound(path.to_string()));
            }
            // Opens the node and issues the I2C_SLAVE bind.
            let device = LinuxI2CDevice::new(path, address)
                .map_err(|e| DeviceError::OpenFailed(format!("{path} @ 0x{address:02X}: {e}")))?;
            log::debug!("opened {path}, controller at 0x{address:02X}");
            Ok(I2cBus {
                device,
                info: BusInfo {
                    path: path.to_string(),
                    address,
                },
            })
        }

        fn info(&self) -> &BusInfo {
            &self.info
        }

        fn block_read(&mut self, register: u8, len: u8) -> Result<Vec<u8>> {
            check_block_len("block read", register, len as usize)?;
            self.device
                .smbus_read_i2c_block_data(register, len)
                .map_err(|e| DeviceError::TransactFailed(format!("block read 0x{register:02X}: {e}")))
        }

        fn block_write(&mut self, register: u8, data: &[u8]) -> Result<()> {
            check_block_len("block write", register, data.len())?;
            self.device
                .smbus_write_i2c_block_data(register, data)
                .map_err(|e| DeviceError::TransactFailed(format!("block write 0x{register:02X}: {e}")))
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux_impl::I2cBus;

// ── Stub for unsupported platforms ──

/// Placeholder transport that never opens.
/// Enables compilation and `cargo test` on non-Linux hosts.
#[cfg(not(target_os = "linux"))]
pub struct StubBus {
    info: BusInfo,
}

#[cfg(not(target_os = "linux"))]
impl LedBus for StubBus {
    fn open(path: &str, _address: u16) -> Result<Self> {
        Err(DeviceError::Unsupported(format!(
            "{path}: I2C access is only available on Linux"
        )))
    }
    fn info(&self) -> &BusInfo {
        &self.info
    }
    fn block_read(&mut self, _register: u8, _len: u8) -> Result<Vec<u8>> {
        Err(DeviceError::Unsupported("block read".into()))
    }
    fn block_write(&mut self, _register: u8, _data: &[u8]) -> Result<()> {
        Err(DeviceError::Unsupported("block write".into()))
    }
}

/// Platform transport type.
#[cfg(target_os = "linux")]
pub type PlatformBus = I2cBus;
#[cfg(not(target_os = "linux"))]
pub type PlatformBus = StubBus;

// ── Mock bus for testing ──

/// Simulated LED controller for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    use crate::codec::{LedStatus, checksum, encode_status};
    use crate::led::{LedId, OpMode, Rgb};
    use crate::protocol::{
        CMD_BLINK, CMD_BREATH, CMD_BRIGHTNESS, CMD_COLOR, CMD_POWER, FRAME_CHECKSUM_SPAN,
        FRAME_LEN, LED_COUNT, MODE_BLINK, MODE_BREATH, MODE_OFF, MODE_ON, STATUS_REGISTER_BASE,
    };

    /// Brightness the simulated controller powers up with. A populated LED
    /// never answers with an all-zero status.
    pub const POWER_ON_BRIGHTNESS: u8 = 0xFF;

    /// Hardware-side state of one simulated LED.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SimLed {
        pub mode: u8,
        pub brightness: u8,
        pub color: Rgb,
        pub cycle_ms: u16,
        pub on_ms: u16,
    }

    impl Default for SimLed {
        fn default() -> Self {
            SimLed {
                mode: MODE_OFF,
                brightness: POWER_ON_BRIGHTNESS,
                color: Rgb::BLACK,
                cycle_ms: 0,
                on_ms: 0,
            }
        }
    }

    impl SimLed {
        pub fn status(&self) -> LedStatus {
            LedStatus {
                available: true,
                op_mode: OpMode::from_raw(self.mode),
                brightness: self.brightness,
                color: self.color,
                on_duration_ms: self.on_ms,
                cycle_duration_ms: self.cycle_ms,
            }
        }
    }

    #[derive(Debug, Default)]
    pub struct MockState {
        /// Simulated LEDs keyed by identity.
        pub leds: HashMap<u8, SimLed>,
        /// LEDs that never answer (unpopulated bays).
        pub absent: HashSet<u8>,
        /// Recorded writes: (register, payload).
        pub writes: Vec<(u8, Vec<u8>)>,
        /// Recorded read registers.
        pub reads: Vec<u8>,
        /// Number of upcoming writes that fail at the transport level.
        pub fail_writes: u32,
        /// Number of upcoming reads that fail at the transport level.
        pub fail_reads: u32,
        /// Every read from this index on (0-based, counting all reads) fails.
        pub fail_reads_from: Option<usize>,
        /// Accept writes on the bus but never apply them.
        pub ignore_writes: bool,
        /// Frames rejected because of a bad checksum or identity mismatch.
        pub rejected_frames: u32,
    }

    #[derive(Clone)]
    pub struct MockBus {
        state: Arc<Mutex<MockState>>,
        info: BusInfo,
    }

    impl Default for MockBus {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockBus {
        pub fn new() -> Self {
            MockBus {
                state: Arc::new(Mutex::new(MockState::default())),
                info: BusInfo {
                    path: "mock://i2c-0".into(),
                    address: crate::protocol::LED_CONTROLLER_ADDR,
                },
            }
        }

        /// Shared state. Clones of a `MockBus` observe the same state.
        pub fn state(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }

        pub fn set_absent(&self, led: LedId) {
            self.state().absent.insert(led.raw());
        }

        pub fn fail_next_writes(&self, n: u32) {
            self.state().fail_writes = n;
        }

        pub fn fail_next_reads(&self, n: u32) {
            self.state().fail_reads = n;
        }

        pub fn write_count(&self) -> usize {
            self.state().writes.len()
        }

        pub fn writes_to(&self, led: LedId) -> usize {
            self.state()
                .writes
                .iter()
                .filter(|(reg, _)| *reg == led.write_register())
                .count()
        }

        pub fn read_count(&self) -> usize {
            self.state().reads.len()
        }

        /// Simulated hardware state of `led`.
        pub fn sim(&self, led: LedId) -> SimLed {
            self.state()
                .leds
                .get(&led.raw())
                .copied()
                .unwrap_or_default()
        }

        fn apply_frame(state: &mut MockState, register: u8, data: &[u8]) {
            if data.len() != FRAME_LEN || data[0] != register || register >= LED_COUNT {
                state.rejected_frames += 1;
                return;
            }
            // The controller checks the sum with the identity byte zeroed.
            let mut covered = [0u8; FRAME_CHECKSUM_SPAN];
            covered.copy_from_slice(&data[..FRAME_CHECKSUM_SPAN]);
            covered[0] = 0;
            let want = u16::from_be_bytes([data[FRAME_LEN - 2], data[FRAME_LEN - 1]]);
            if checksum(&covered) != want {
                state.rejected_frames += 1;
                return;
            }

            let p = &data[6..10];
            let led = state.leds.entry(register).or_default();
            match data[5] {
                CMD_BRIGHTNESS => led.brightness = p[0],
                CMD_COLOR => led.color = Rgb::new(p[0], p[1], p[2]),
                CMD_POWER => led.mode = if p[0] == 0 { MODE_OFF } else { MODE_ON },
                cmd @ (CMD_BLINK | CMD_BREATH) => {
                    led.mode = if cmd == CMD_BLINK {
                        MODE_BLINK
                    } else {
                        MODE_BREATH
                    };
                    led.cycle_ms = u16::from_be_bytes([p[0], p[1]]);
                    led.on_ms = u16::from_be_bytes([p[2], p[3]]);
                }
                _ => state.rejected_frames += 1,
            }
        }
    }

    impl LedBus for MockBus {
        fn open(_path: &str, _address: u16) -> Result<Self> {
            Ok(Self::new())
        }

        fn info(&self) -> &BusInfo {
            &self.info
        }

        fn block_read(&mut self, register: u8, len: u8) -> Result<Vec<u8>> {
            check_block_len("block read", register, len as usize)?;
            let mut state = self.state();
            let index = state.reads.len();
            state.reads.push(register);
            let past_limit = state.fail_reads_from.is_some_and(|from| index >= from);
            if state.fail_reads > 0 || past_limit {
                state.fail_reads = state.fail_reads.saturating_sub(1);
                return Err(DeviceError::TransactFailed(format!(
                    "block read 0x{register:02X}: mock failure injected"
                )));
            }
            let id = register.wrapping_sub(STATUS_REGISTER_BASE);
            if id >= LED_COUNT || state.absent.contains(&id) {
                return Ok(vec![0; len as usize]);
            }
            let sim = state.leds.get(&id).copied().unwrap_or_default();
            let mut reply = encode_status(sim.mode, &sim.status()).to_vec();
            reply.truncate(len as usize);
            Ok(reply)
        }

        fn block_write(&mut self, register: u8, data: &[u8]) -> Result<()> {
            check_block_len("block write", register, data.len())?;
            let mut state = self.state();
            state.writes.push((register, data.to_vec()));
            if state.fail_writes > 0 {
                state.fail_writes -= 1;
                return Err(DeviceError::TransactFailed(format!(
                    "block write 0x{register:02X}: mock failure injected"
                )));
            }
            if state.ignore_writes || state.absent.contains(&register) {
                return Ok(());
            }
            Self::apply_frame(&mut state, register, data);
            Ok(())
        }
    }
}
