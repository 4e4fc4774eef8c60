/// Default key expression prefix for all TachoSim traffic.
pub const KEY_PREFIX: &str = "tachosim";

/// Builder for the per-unit key expressions.
///
/// Key expressions follow the pattern:
/// `tachosim/units/<unit>/<channel>`
///
/// where `<unit>` is the unit's host identity and `<channel>` is one of
/// `request_access`, `config`, `config_frequency`, `telemetry`, `event`,
/// `session`.
#[derive(Debug, Clone)]
pub struct UnitTopics {
    prefix: String,
    unit: String,
}

impl UnitTopics {
    /// Create a builder for a unit under the default prefix.
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            prefix: KEY_PREFIX.to_string(),
            unit: unit.into(),
        }
    }

    /// Create a builder with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            unit: unit.into(),
        }
    }

    fn channel(&self, channel: &str) -> String {
        format!("{}/units/{}/{}", self.prefix, self.unit, channel)
    }

    /// Key the unit publishes its access request on.
    pub fn request_access(&self) -> String {
        self.channel("request_access")
    }

    /// Key the backend publishes authorization verdicts on.
    pub fn config(&self) -> String {
        self.channel("config")
    }

    /// Key the backend publishes sampling-rate updates on.
    pub fn config_frequency(&self) -> String {
        self.channel("config_frequency")
    }

    /// Key the unit publishes telemetry snapshots on.
    pub fn telemetry(&self) -> String {
        self.channel("telemetry")
    }

    /// Key the unit publishes compliance events on.
    pub fn event(&self) -> String {
        self.channel("event")
    }

    /// Key the unit publishes session status on.
    pub fn session(&self) -> String {
        self.channel("session")
    }

    /// Liveliness token key; its DELETE signals an ungraceful disconnect.
    pub fn session_liveliness(&self) -> String {
        format!("{}/alive", self.channel("session"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_topics() {
        let topics = UnitTopics::new("truck-07");

        assert_eq!(
            topics.request_access(),
            "tachosim/units/truck-07/request_access"
        );
        assert_eq!(topics.config(), "tachosim/units/truck-07/config");
        assert_eq!(
            topics.config_frequency(),
            "tachosim/units/truck-07/config_frequency"
        );
        assert_eq!(topics.telemetry(), "tachosim/units/truck-07/telemetry");
        assert_eq!(topics.event(), "tachosim/units/truck-07/event");
        assert_eq!(topics.session(), "tachosim/units/truck-07/session");
        assert_eq!(
            topics.session_liveliness(),
            "tachosim/units/truck-07/session/alive"
        );
    }

    #[test]
    fn test_custom_prefix() {
        let topics = UnitTopics::with_prefix("fleet/test", "truck-07");
        assert_eq!(topics.telemetry(), "fleet/test/units/truck-07/telemetry");
    }
}
