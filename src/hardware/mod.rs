//! Device drivers and platform definitions.

pub mod platform;
pub mod uart;
