use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Driver identifier used when no card is inserted.
///
/// The card reader reports driver presence as a plain string; the absence of
/// a driver is the literal `"None"` on the wire, not a JSON null.
pub const NO_DRIVER: &str = "None";

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

/// The fused vehicle state owned by the control unit.
///
/// Each field is updated only by the reading kind that owns it: positioning
/// updates `position` and `gps_speed`, the odometer updates `odometer_speed`,
/// and the card reader updates `driver_present`. `last_update` advances on
/// every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Stable identifier generated once per process lifetime.
    #[serde(rename = "tachograph_id")]
    pub unit_id: String,

    /// Last known position, if any reading carried one yet.
    #[serde(rename = "Position")]
    pub position: Option<GeoPosition>,

    /// Last speed reported by the positioning receiver (km/h).
    #[serde(rename = "GPSSpeed")]
    pub gps_speed: f64,

    /// Last speed reported by the odometer (km/h).
    #[serde(rename = "Speed")]
    pub odometer_speed: f64,

    /// Driver identifier, or [`NO_DRIVER`].
    pub driver_present: String,

    /// Unix epoch milliseconds of the most recent mutation.
    #[serde(rename = "Timestamp")]
    pub last_update: i64,
}

impl VehicleState {
    /// Create the initial state for a unit: no position, zero speeds, no driver.
    pub fn new(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            position: None,
            gps_speed: 0.0,
            odometer_speed: 0.0,
            driver_present: NO_DRIVER.to_string(),
            last_update: 0,
        }
    }

    /// Whether a driver card is currently inserted.
    pub fn has_driver(&self) -> bool {
        self.driver_present != NO_DRIVER
    }
}

/// An immutable copy of [`VehicleState`] taken at update time.
pub type TelemetrySnapshot = VehicleState;

/// Compliance violation kinds derived by the rule evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "Movement Without Driver")]
    MovementWithoutDriver,
    #[serde(rename = "Overspeed")]
    Overspeed,
    #[serde(rename = "Speed Discrepancy")]
    SpeedDiscrepancy,
}

impl EventKind {
    /// Wire/display name of the event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MovementWithoutDriver => "Movement Without Driver",
            EventKind::Overspeed => "Overspeed",
            EventKind::SpeedDiscrepancy => "Speed Discrepancy",
        }
    }

    /// Canonical human-readable description published with the event.
    pub fn description(&self) -> &'static str {
        match self {
            EventKind::MovementWithoutDriver => "Vehicle moving without driver.",
            EventKind::Overspeed => "Speed above limit (90 km/h).",
            EventKind::SpeedDiscrepancy => "Difference > 5% between GPS and odometer.",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detected compliance violation, buffered until the next publish cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceEvent {
    #[serde(rename = "tachograph_id")]
    pub unit_id: String,

    /// Human-readable detection time, `YYYY-MM-DD HH:MM:SS` (UTC).
    #[serde(rename = "Timestamp")]
    pub timestamp: String,

    /// Vehicle position at detection time, if known.
    #[serde(rename = "Position")]
    pub position: Option<GeoPosition>,

    #[serde(rename = "Event")]
    pub kind: EventKind,

    #[serde(rename = "Description")]
    pub description: String,
}

impl ComplianceEvent {
    /// Create an event stamped with the current time.
    pub fn new(unit_id: impl Into<String>, position: Option<GeoPosition>, kind: EventKind) -> Self {
        Self {
            unit_id: unit_id.into(),
            timestamp: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            position,
            kind,
            description: kind.description().to_string(),
        }
    }
}

/// Get the current timestamp in milliseconds since Unix epoch.
///
/// Returns 0 if system time is before Unix epoch (should never happen in practice).
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = VehicleState::new("unit-1");
        assert_eq!(state.unit_id, "unit-1");
        assert!(state.position.is_none());
        assert_eq!(state.gps_speed, 0.0);
        assert_eq!(state.odometer_speed, 0.0);
        assert!(!state.has_driver());
        assert_eq!(state.last_update, 0);
    }

    #[test]
    fn test_state_wire_field_names() {
        let mut state = VehicleState::new("unit-1");
        state.position = Some(GeoPosition {
            latitude: 40.33,
            longitude: -3.77,
        });
        state.gps_speed = 52.5;
        state.odometer_speed = 54.0;
        state.last_update = 1_700_000_000_000;

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["tachograph_id"], "unit-1");
        assert_eq!(json["Position"]["latitude"], 40.33);
        assert_eq!(json["GPSSpeed"], 52.5);
        assert_eq!(json["Speed"], 54.0);
        assert_eq!(json["driver_present"], "None");
        assert_eq!(json["Timestamp"], 1_700_000_000_000i64);
    }

    #[test]
    fn test_absent_position_serializes_as_null() {
        let state = VehicleState::new("unit-1");
        let json = serde_json::to_value(&state).unwrap();
        assert!(json["Position"].is_null());
    }

    #[test]
    fn test_event_wire_format() {
        let event = ComplianceEvent::new("unit-1", None, EventKind::Overspeed);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["tachograph_id"], "unit-1");
        assert_eq!(json["Event"], "Overspeed");
        assert_eq!(json["Description"], "Speed above limit (90 km/h).");
        assert!(json["Position"].is_null());

        // Timestamp is the formatted wall-clock form, not epoch millis.
        let ts = json["Timestamp"].as_str().unwrap();
        assert_eq!(ts.len(), "2024-01-01 00:00:00".len());
    }

    #[test]
    fn test_event_kind_names() {
        assert_eq!(
            EventKind::MovementWithoutDriver.as_str(),
            "Movement Without Driver"
        );
        assert_eq!(EventKind::SpeedDiscrepancy.as_str(), "Speed Discrepancy");
    }

    #[test]
    fn test_timestamp_is_positive() {
        assert!(current_timestamp_millis() > 0);
    }
}
