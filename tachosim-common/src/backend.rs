//! Monitoring-backend message types.
//!
//! The unit and the backend exchange JSON payloads over per-unit scoped key
//! expressions (see [`crate::keyexpr::UnitTopics`]). The unit publishes an
//! access request on connect and session status on disconnect; the backend
//! answers on the `config` and `config_frequency` keys.

use serde::{Deserialize, Serialize};

use crate::telemetry::current_timestamp_millis;

/// First message published by a unit after connecting to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    #[serde(rename = "tachograph_id")]
    pub unit_id: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: i64,
}

impl AccessRequest {
    pub fn new(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            timestamp: current_timestamp_millis(),
        }
    }
}

/// Authorization verdict published by the backend on the `config` key.
///
/// The authorization flag is the literal string `"True"` or `"False"` on the
/// wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMessage {
    #[serde(rename = "tachograph_id")]
    pub unit_id: String,
    #[serde(rename = "Authorization")]
    pub authorization: String,
}

impl ConfigMessage {
    /// Whether this message authorizes the given unit.
    pub fn grants_access(&self, unit_id: &str) -> bool {
        self.unit_id == unit_id && self.authorization == "True"
    }
}

/// Which process-wide interval a `config_frequency` message updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigItem {
    /// Interval between telemetry publish cycles.
    #[serde(rename = "telemetry_frequency")]
    TelemetryFrequency,
    /// Sampling interval echoed to the odometer and GNSS sensors.
    #[serde(rename = "odometer_GNSS_frequency")]
    SensorSamplingFrequency,
}

/// Remote configuration update published by the backend on the
/// `config_frequency` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFrequencyMessage {
    #[serde(rename = "tachograph_id")]
    pub unit_id: String,
    #[serde(rename = "Config_item")]
    pub item: ConfigItem,
    /// New interval value in seconds.
    #[serde(rename = "Config_Value")]
    pub value: f64,
}

/// Session status announcement published on the unit's `session` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    #[serde(rename = "tachograph_id")]
    pub unit_id: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: i64,
}

impl SessionStatus {
    /// Status published on clean shutdown, after delivery is awaited.
    pub fn regulated_disconnection(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            status: "Off - Regulate Disconnection".to_string(),
            timestamp: current_timestamp_millis(),
        }
    }

    /// Status announcing an ungraceful disconnect (the last-will analogue).
    pub fn unregulated_disconnection(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            status: "Off - Unregulate Disconnection".to_string(),
            timestamp: current_timestamp_millis(),
        }
    }
}
