//! nasled: front-panel LED control for NAS appliances over I2C.

pub mod activity;
pub mod codec;
pub mod config;
pub mod controller;
pub mod device;
pub mod disks;
pub mod engine;
pub mod error;
pub mod led;
pub mod monitor;
pub mod protocol;
pub mod retry;

pub use controller::LedController;
pub use error::NasledError;
