//! LED identities, modes, colors and operation errors.

mod color;
mod error;
mod id;
mod mode;

pub use color::{Rgb, format_color, parse_color};
pub use error::{LedError, Result};
pub use id::LedId;
pub use mode::{LedMode, ModeParams, OpMode};
