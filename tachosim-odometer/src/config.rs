//! Odometer simulator configuration.

use serde::{Deserialize, Serialize};

use tachosim_sensor_framework::{LoggingConfig, Result, SensorError, SimulatorConfig};

/// Complete odometer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdometerConfig {
    /// Control unit sensor listener address, `host:port`.
    pub control_unit: String,

    /// Route feed listener bind address.
    #[serde(default = "default_feed_listen")]
    pub feed_listen: String,

    /// Odometer-specific settings.
    #[serde(default)]
    pub odometer: OdometerSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdometerSettings {
    /// Sampling interval used until the control unit echoes one, in seconds.
    #[serde(default = "default_initial_frequency_secs")]
    pub initial_frequency_secs: f64,

    /// Half-width of the uniform speed jitter applied per reading, km/h.
    #[serde(default = "default_speed_jitter_kmh")]
    pub speed_jitter_kmh: f64,
}

fn default_feed_listen() -> String {
    "0.0.0.0:9291".to_string()
}

fn default_initial_frequency_secs() -> f64 {
    1.0
}

fn default_speed_jitter_kmh() -> f64 {
    5.0
}

impl Default for OdometerSettings {
    fn default() -> Self {
        Self {
            initial_frequency_secs: default_initial_frequency_secs(),
            speed_jitter_kmh: default_speed_jitter_kmh(),
        }
    }
}

impl SimulatorConfig for OdometerConfig {
    fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    fn control_unit_addr(&self) -> &str {
        &self.control_unit
    }

    fn validate(&self) -> Result<()> {
        if self.control_unit.is_empty() {
            return Err(SensorError::validation("control_unit address is empty"));
        }
        if !self.feed_listen.contains(':') {
            return Err(SensorError::validation(
                "feed_listen must include a port (e.g., '0.0.0.0:9291')",
            ));
        }
        if !self.odometer.initial_frequency_secs.is_finite()
            || self.odometer.initial_frequency_secs <= 0.0
        {
            return Err(SensorError::validation(
                "odometer.initial_frequency_secs must be positive",
            ));
        }
        if self.odometer.speed_jitter_kmh < 0.0 {
            return Err(SensorError::validation(
                "odometer.speed_jitter_kmh must not be negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config: OdometerConfig =
            json5::from_str(r#"{ control_unit: "control-unit:9290" }"#).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.feed_listen, "0.0.0.0:9291");
        assert_eq!(config.odometer.initial_frequency_secs, 1.0);
        assert_eq!(config.odometer.speed_jitter_kmh, 5.0);
    }

    #[test]
    fn test_validate_rejects_feed_listen_without_port() {
        let config: OdometerConfig =
            json5::from_str(r#"{ control_unit: "cu:9290", feed_listen: "0.0.0.0" }"#).unwrap();
        assert!(config.validate().is_err());
    }
}
