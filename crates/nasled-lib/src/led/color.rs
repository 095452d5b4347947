//! RGB colors, parsed from and formatted for CLI and config values.

use std::fmt;

use serde::Serialize;

/// 8-bit-per-channel color as sent to the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    pub fn is_black(&self) -> bool {
        *self == Rgb::BLACK
    }

    pub fn to_bytes(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_color(*self))
    }
}

/// Parse a color string.
///
/// Accepts:
/// - Hex: `"#FF0000"`, `"FF0000"`, `"#ff0000"`
/// - Named: `"red"`, `"green"`, `"blue"`, `"white"`, `"orange"`, `"yellow"`, `"purple"`, `"cyan"`
pub fn parse_color(s: &str) -> crate::error::Result<Rgb> {
    let s = s.trim();

    match s.to_lowercase().as_str() {
        "red" => return Ok(Rgb::new(0xFF, 0x00, 0x00)),
        "green" => return Ok(Rgb::new(0x00, 0xFF, 0x00)),
        "blue" => return Ok(Rgb::new(0x00, 0x00, 0xFF)),
        "white" => return Ok(Rgb::new(0xFF, 0xFF, 0xFF)),
        "orange" => return Ok(Rgb::new(0xFF, 0x80, 0x00)),
        "yellow" => return Ok(Rgb::new(0xFF, 0xFF, 0x00)),
        "purple" => return Ok(Rgb::new(0x80, 0x00, 0xFF)),
        "cyan" => return Ok(Rgb::new(0x00, 0xFF, 0xFF)),
        "off" | "black" => return Ok(Rgb::BLACK),
        _ => {}
    }

    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 {
        return Err(crate::NasledError::Parse(format!(
            "Invalid color: {s} (use #RRGGBB or a color name)"
        )));
    }
    let val = u32::from_str_radix(hex, 16)
        .map_err(|_| crate::NasledError::Parse(format!("Invalid hex color: {s}")))?;
    let [_, r, g, b] = val.to_be_bytes();
    Ok(Rgb::new(r, g, b))
}

/// Format a color as `#RRGGBB`.
pub fn format_color(c: Rgb) -> String {
    format!("#{:02X}{:02X}{:02X}", c.r, c.g, c.b)
}
