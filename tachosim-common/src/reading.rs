//! Sensor wire protocol: readings, aggregator replies, and route-feed segments.
//!
//! All sensor traffic is newline-delimited JSON over a persistent TCP
//! connection. Each reading line is answered with exactly one reply line:
//! an opaque `ok-<secs>` token for the card reader, a frequency update for
//! the positioning receiver and the odometer.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::telemetry::GeoPosition;

/// The three sensor kinds feeding the control unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    CardReader,
    Gnss,
    Odometer,
}

impl SensorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::CardReader => "card_reader",
            SensorKind::Gnss => "gnss",
            SensorKind::Odometer => "odometer",
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One raw measurement sent by a sensor, tagged by its `Type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum Reading {
    CardReader {
        /// 1 when a card is inserted, 0 otherwise.
        #[serde(default)]
        is_driver: u8,
        /// Driver identifier, or `"None"`.
        driver_present: String,
        #[serde(rename = "Timestamp")]
        timestamp: i64,
    },
    #[serde(rename = "GPS")]
    Gnss {
        #[serde(rename = "Position")]
        position: GeoPosition,
        #[serde(rename = "Speed")]
        speed: f64,
        #[serde(rename = "Timestamp")]
        timestamp: i64,
    },
    Odometer {
        #[serde(rename = "Speed")]
        speed: f64,
        #[serde(rename = "Timestamp")]
        timestamp: i64,
    },
}

impl Reading {
    /// The sensor kind that produced this reading.
    pub fn kind(&self) -> SensorKind {
        match self {
            Reading::CardReader { .. } => SensorKind::CardReader,
            Reading::Gnss { .. } => SensorKind::Gnss,
            Reading::Odometer { .. } => SensorKind::Odometer,
        }
    }
}

/// Reply sent to the positioning receiver after each reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GnssFrequencyUpdate {
    /// Sampling interval the sensor must adopt, in seconds.
    pub new_gnss_frequency: f64,
    /// Unix epoch milliseconds at reply time.
    pub timestamp: i64,
}

/// Reply sent to the odometer after each reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdometerFrequencyUpdate {
    /// Sampling interval the sensor must adopt, in seconds.
    pub new_odometer_frequency: f64,
    /// Unix epoch milliseconds at reply time.
    pub timestamp: i64,
}

/// Opaque acknowledgment token, `ok-<unix_seconds>`.
///
/// Sent to the card reader for each reading and by the route-feed listeners
/// for each accepted segment.
pub fn ack_token() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("ok-{}", secs)
}

/// One position segment fed by the route generator to the GNSS simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSegment {
    #[serde(rename = "Origin")]
    pub origin: GeoPosition,
    #[serde(rename = "Destination")]
    pub destination: GeoPosition,
    /// Segment speed in km/h.
    #[serde(rename = "Speed")]
    pub speed: f64,
    /// Segment traversal time in seconds.
    #[serde(rename = "Time")]
    pub duration_secs: f64,
}

/// One speed segment fed by the route generator to the odometer simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedSegment {
    /// Segment speed in km/h.
    #[serde(rename = "Speed")]
    pub speed: f64,
    /// Segment traversal time in seconds.
    #[serde(rename = "Time")]
    pub duration_secs: f64,
}
