//! Protocol constants for the front-panel LED controller.
//!
//! The controller sits on the SMBus at a fixed 7-bit address and speaks an
//! I2C-block convention: each transaction carries a one-byte register selector
//! and a length-prefixed payload of at most 32 bytes.
//!
//! ## Frame layout (write)
//!
//! ```text
//! [led, 0xA0, 0x01, 0x00, 0x00, cmd, p0, p1, p2, p3, csum_hi, csum_lo]
//! ```
//!
//! The checksum is the 16-bit byte sum of the first 10 bytes, computed while
//! byte 0 still holds zero. The LED identity is patched into byte 0 only after
//! the checksum has been appended, so the checksum never covers it.
//!
//! ## Status reply (read)
//!
//! ```text
//! [mode, brightness, r, g, b, cycle_hi, cycle_lo, on_hi, on_lo, csum_hi, csum_lo]
//! ```

// ── Bus addressing ──

/// Default I2C adapter device node.
pub const DEFAULT_I2C_BUS: &str = "/dev/i2c-0";

/// 7-bit slave address of the LED controller.
pub const LED_CONTROLLER_ADDR: u16 = 0x3A;

/// Largest payload a single I2C block transaction can carry.
pub const MAX_BLOCK_LEN: usize = 32;

/// Status registers start here; the register for LED `n` is `BASE + n`.
pub const STATUS_REGISTER_BASE: u8 = 0x81;

// ── Frame geometry ──

/// Length of an encoded command frame (excluding the block length prefix).
pub const FRAME_LEN: usize = 12;

/// Number of frame bytes covered by the checksum.
pub const FRAME_CHECKSUM_SPAN: usize = 10;

/// Fixed header bytes following the identity byte.
pub const FRAME_HEADER: [u8; 4] = [0xA0, 0x01, 0x00, 0x00];

/// Offset of the command byte inside a frame.
pub const FRAME_CMD_OFFSET: usize = 5;

/// Offset of the first parameter byte inside a frame.
pub const FRAME_PARAMS_OFFSET: usize = 6;

/// Maximum number of parameter bytes per command.
pub const MAX_PARAMS: usize = 4;

/// Length of a status reply.
pub const STATUS_LEN: usize = 11;

/// Number of status bytes covered by the checksum.
pub const STATUS_CHECKSUM_SPAN: usize = 9;

// ── Command codes ──

/// Set brightness: `[level]`.
pub const CMD_BRIGHTNESS: u8 = 0x01;

/// Set RGB color: `[r, g, b]`.
pub const CMD_COLOR: u8 = 0x02;

/// Power on/off: `[0]` = off, `[1]` = on.
pub const CMD_POWER: u8 = 0x03;

/// Blink: `[cycle_hi, cycle_lo, on_hi, on_lo]`.
pub const CMD_BLINK: u8 = 0x04;

/// Breath: `[cycle_hi, cycle_lo, on_hi, on_lo]`.
pub const CMD_BREATH: u8 = 0x05;

// ── Reported operating modes (status byte 0) ──

pub const MODE_OFF: u8 = 0;
pub const MODE_ON: u8 = 1;
pub const MODE_BLINK: u8 = 2;
pub const MODE_BREATH: u8 = 3;

// ── LED inventory ──

/// Number of addressable LEDs: power, network and six disk bays.
pub const LED_COUNT: u8 = 8;

/// Number of disk bay LEDs.
pub const DISK_LED_COUNT: u8 = 6;

/// Identity of the first disk bay LED.
pub const FIRST_DISK_LED: u8 = 2;

/// Human-readable LED names, indexed by identity.
pub const LED_NAMES: [&str; LED_COUNT as usize] = [
    "power", "lan", "disk1", "disk2", "disk3", "disk4", "disk5", "disk6",
];
