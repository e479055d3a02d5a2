//! GrowPod sensor firmware library.
//!
//! Exposes the arbiter and the pure-logic modules for integration testing
//! and external inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod arbiter;
pub mod config;
pub mod error;
pub mod history;
pub mod ports;
pub mod reading;
pub mod sensors;

mod esp_link_shims;
pub mod pins;

pub use arbiter::SensorArbiter;
pub use config::SystemConfig;
pub use error::{ArbiterError, DriverError, Error, Result};
pub use reading::{Priority, Reading, SensorType};
