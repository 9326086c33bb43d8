//! Dutycycle Core - shared building blocks for the duty-cycle simulator
//!
//! This crate holds the pieces every other crate agrees on: device identity,
//! the supercycle time base, protocol and device configuration, and the
//! tracing setup used by the command-line driver.

pub mod config;
pub mod tracing_setup;
pub mod types;

// Re-export main types for convenient access
pub use config::{ConfigError, DeviceConfig, ProtocolConfig, Scenario, SimulationConfig};
pub use types::{DeviceId, SUPERCYCLE_LENGTH, Tick};
