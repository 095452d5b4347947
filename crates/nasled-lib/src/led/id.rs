//! LED identities, one per physical front-panel LED, fixed at compile time.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::protocol::{DISK_LED_COUNT, FIRST_DISK_LED, LED_COUNT, LED_NAMES, STATUS_REGISTER_BASE};

/// Identity of a front-panel LED.
///
/// `0` = power, `1` = network, `2..` = disk bays in positional order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LedId(u8);

impl LedId {
    pub const POWER: LedId = LedId(0);
    pub const NETWORK: LedId = LedId(1);

    /// Identity from a raw index, if it addresses an existing LED.
    pub fn new(raw: u8) -> Option<Self> {
        (raw < LED_COUNT).then_some(LedId(raw))
    }

    /// Disk bay LED by 1-based bay number.
    pub fn disk(bay: u8) -> Option<Self> {
        if bay == 0 || bay > DISK_LED_COUNT {
            return None;
        }
        Some(LedId(FIRST_DISK_LED + bay - 1))
    }

    /// All LEDs in identity order.
    pub fn all() -> impl Iterator<Item = LedId> {
        (0..LED_COUNT).map(LedId)
    }

    /// Disk bay LEDs in positional order.
    pub fn disks() -> impl Iterator<Item = LedId> {
        (FIRST_DISK_LED..LED_COUNT).map(LedId)
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        LED_NAMES[self.0 as usize]
    }

    /// Look up an LED by its name (`"power"`, `"lan"`, `"disk1"`...).
    pub fn from_name(name: &str) -> Option<Self> {
        LED_NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(|i| LedId(i as u8))
    }

    /// 1-based bay number for disk LEDs.
    pub fn disk_bay(self) -> Option<u8> {
        (self.0 >= FIRST_DISK_LED).then(|| self.0 - FIRST_DISK_LED + 1)
    }

    /// Register the status of this LED is read from.
    pub fn status_register(self) -> u8 {
        STATUS_REGISTER_BASE + self.0
    }

    /// Register command frames for this LED are written to.
    pub fn write_register(self) -> u8 {
        self.0
    }
}

impl fmt::Display for LedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts a name (`"disk3"`, `"network"` as an alias of `"lan"`) or a raw index.
impl FromStr for LedId {
    type Err = crate::NasledError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("network") {
            return Ok(LedId::NETWORK);
        }
        if let Some(id) = LedId::from_name(s) {
            return Ok(id);
        }
        s.parse::<u8>()
            .ok()
            .and_then(LedId::new)
            .ok_or_else(|| {
                crate::NasledError::Parse(format!(
                    "unknown LED: {s} (use {} or 0-{})",
                    LED_NAMES.join(", "),
                    LED_COUNT - 1
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_assignments() {
        assert_eq!(LedId::POWER.raw(), 0);
        assert_eq!(LedId::NETWORK.raw(), 1);
        assert_eq!(LedId::disk(1).unwrap().raw(), 2);
        assert_eq!(LedId::disk(6).unwrap().raw(), 7);
    }

    #[test]
    fn disk_out_of_range() {
        assert!(LedId::disk(0).is_none());
        assert!(LedId::disk(7).is_none());
    }

    #[test]
    fn new_rejects_unknown_index() {
        assert!(LedId::new(7).is_some());
        assert!(LedId::new(8).is_none());
    }

    #[test]
    fn names() {
        assert_eq!(LedId::POWER.name(), "power");
        assert_eq!(LedId::NETWORK.name(), "lan");
        assert_eq!(LedId::disk(3).unwrap().to_string(), "disk3");
    }

    #[test]
    fn from_name_case_insensitive() {
        assert_eq!(LedId::from_name("DISK2"), LedId::disk(2));
        assert_eq!(LedId::from_name("nope"), None);
    }

    #[test]
    fn parse_name_alias_or_number() {
        assert_eq!("lan".parse::<LedId>().unwrap(), LedId::NETWORK);
        assert_eq!("network".parse::<LedId>().unwrap(), LedId::NETWORK);
        assert_eq!(" 4 ".parse::<LedId>().unwrap(), LedId::disk(3).unwrap());
        assert!("8".parse::<LedId>().is_err());
        assert!("fan".parse::<LedId>().is_err());
    }

    #[test]
    fn disk_bay_roundtrip() {
        for (i, id) in LedId::disks().enumerate() {
            assert_eq!(id.disk_bay(), Some(i as u8 + 1));
            assert_eq!(LedId::disk(i as u8 + 1), Some(id));
        }
        assert_eq!(LedId::POWER.disk_bay(), None);
        assert_eq!(LedId::NETWORK.disk_bay(), None);
    }

    #[test]
    fn registers() {
        assert_eq!(LedId::POWER.status_register(), 0x81);
        assert_eq!(LedId::disk(1).unwrap().status_register(), 0x83);
        assert_eq!(LedId::disk(1).unwrap().write_register(), 2);
    }

    #[test]
    fn all_covers_every_led() {
        assert_eq!(LedId::all().count(), LED_COUNT as usize);
        assert_eq!(LedId::disks().count(), DISK_LED_COUNT as usize);
    }

    #[test]
    fn serializes_as_number() {
        let json = serde_json::to_string(&LedId::NETWORK).unwrap();
        assert_eq!(json, "1");
    }
}
