//! TachoSim Sensor Framework
//!
//! Common abstractions for the sensor simulator binaries that feed readings
//! to the control unit over its line-oriented TCP protocol.
//!
//! # Overview
//!
//! This framework provides:
//! - [`SimulatorConfig`] trait for configuration loading and validation
//! - [`SimulatorRunner`] for managing simulator lifecycle (startup, shutdown,
//!   signal handling)
//! - [`RequestLink`] for the persistent request/response exchange with the
//!   control unit (also used by the route generator toward the feed listeners)
//! - [`RouteFeed`] for receiving route segments from the route generator
//! - [`SensorArgs`] for common CLI argument parsing
//!
//! Sensors never talk to Zenoh: their only outward channel is the control
//! unit connection, and rate changes reach them through the frequency echoed
//! back on every exchange.

mod args;
mod config;
mod error;
mod feed;
mod link;
mod runner;

pub use args::SensorArgs;
pub use config::SimulatorConfig;
pub use error::{Result, SensorError};
pub use feed::RouteFeed;
pub use link::RequestLink;
pub use runner::SimulatorRunner;

// Re-export commonly used types from tachosim-common
pub use tachosim_common::{LogFormat, LoggingConfig, Reading, SensorKind};
