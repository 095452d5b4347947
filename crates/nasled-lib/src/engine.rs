//! Status reader and write-confirm engine.
//!
//! The bus is unreliable and the controller gives no acknowledgement for a
//! written frame, so every state change is verified by reading the LED's
//! status back. A modify operation re-writes the frame up to
//! `max_attempts` times and polls for confirmation after each write.

use crate::codec::{StatusReply, decode_status, encode_command};
use crate::device::{self, DeviceError, LedBus};
use crate::led::{LedError, LedId, OpMode, Result};
use crate::protocol::STATUS_LEN;
use crate::retry::{RetryPolicy, pause};

/// What a status reply must show for a write to count as applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    /// The LED answers at all. Used for color, brightness, blink and breath.
    Responds,
    /// The LED answers and reports `on` (`true`) or `off` (`false`).
    Power(bool),
}

impl Confirm {
    pub fn is_met(&self, reply: &StatusReply) -> bool {
        let StatusReply::Responding(status) = reply else {
            return false;
        };
        match self {
            Confirm::Responds => true,
            Confirm::Power(true) => status.op_mode == OpMode::On,
            Confirm::Power(false) => status.op_mode == OpMode::Off,
        }
    }
}

/// Read and decode the status of one LED. Transport errors propagate; a
/// garbled or missing reply is `NotPresent`.
pub fn read_status(bus: &mut impl LedBus, led: LedId) -> device::Result<StatusReply> {
    let raw = bus.block_read(led.status_register(), STATUS_LEN as u8)?;
    Ok(decode_status(&raw))
}

/// Poll until `confirm` holds or the poll budget runs out.
fn await_confirmation(
    bus: &mut impl LedBus,
    policy: &RetryPolicy,
    led: LedId,
    confirm: Confirm,
    last_err: &mut Option<DeviceError>,
) -> bool {
    for poll in 0..policy.max_attempts {
        if poll > 0 {
            pause(policy.poll_retry);
        }
        pause(policy.poll);
        match read_status(bus, led) {
            Ok(reply) if confirm.is_met(&reply) => return true,
            Ok(_) => {}
            Err(e) => {
                log::debug!("{led}: status read failed: {e}");
                *last_err = Some(e);
            }
        }
    }
    false
}

/// Write `command` to `led` and wait until the device confirms it.
///
/// Fails with [`LedError::InvalidParams`] before touching the bus if the
/// parameters do not fit a frame, and with [`LedError::CommandFailed`] once
/// every attempt has gone unconfirmed.
pub fn modify_with_retry(
    bus: &mut impl LedBus,
    policy: &RetryPolicy,
    led: LedId,
    command: u8,
    params: &[u8],
    confirm: Confirm,
) -> Result<()> {
    let frame = encode_command(led, command, params)?;
    let mut last_err = None;

    for attempt in 0..policy.max_attempts {
        pause(policy.settle_before(attempt));
        match bus.block_write(led.write_register(), frame.as_bytes()) {
            Ok(()) => {
                if await_confirmation(bus, policy, led, confirm, &mut last_err) {
                    pause(policy.post_confirm);
                    if attempt > 0 {
                        log::debug!(
                            "{led}: command 0x{command:02X} confirmed on attempt {}",
                            attempt + 1
                        );
                    }
                    return Ok(());
                }
                log::debug!(
                    "{led}: command 0x{command:02X} unconfirmed (attempt {}/{})",
                    attempt + 1,
                    policy.max_attempts
                );
            }
            Err(e) => {
                log::debug!("{led}: write failed (attempt {}): {e}", attempt + 1);
                last_err = Some(e);
            }
        }
    }

    Err(LedError::CommandFailed {
        led,
        attempts: policy.max_attempts,
        cause: last_err,
    })
}
