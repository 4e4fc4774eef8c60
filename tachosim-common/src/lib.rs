//! TachoSim Common Library
//!
//! This crate provides shared types and utilities for the TachoSim vehicular
//! telemetry simulation:
//!
//! - [`telemetry`] - Vehicle state, telemetry snapshots, and compliance events
//! - [`reading`] - Sensor wire protocol (readings, replies, route-feed segments)
//! - [`backend`] - Monitoring-backend message types (authorization, remote config)
//! - [`keyexpr`] - Per-unit key expression builder
//! - [`serialization`] - JSON/CBOR encoding and decoding
//! - [`config`] - Configuration loading (JSON5 format)
//! - [`session`] - Zenoh session management
//! - [`error`] - Error types

pub mod backend;
pub mod config;
pub mod error;
pub mod keyexpr;
pub mod reading;
pub mod serialization;
pub mod session;
pub mod telemetry;

// Re-export commonly used types at the crate root
pub use backend::{AccessRequest, ConfigItem, ConfigMessage, ConfigFrequencyMessage, SessionStatus};
pub use config::{LogFormat, LoggingConfig, ZenohConfig, load_config, parse_config};
pub use error::{Error, Result};
pub use keyexpr::{KEY_PREFIX, UnitTopics};
pub use reading::{
    GnssFrequencyUpdate, OdometerFrequencyUpdate, PositionSegment, Reading, SensorKind,
    SpeedSegment, ack_token,
};
pub use serialization::{Format, decode, decode_auto, encode};
pub use session::connect;
pub use telemetry::{
    ComplianceEvent, EventKind, GeoPosition, NO_DRIVER, TelemetrySnapshot, VehicleState,
    current_timestamp_millis,
};

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}
