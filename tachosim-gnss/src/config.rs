//! GNSS simulator configuration.

use serde::{Deserialize, Serialize};

use tachosim_sensor_framework::{LoggingConfig, Result, SensorError, SimulatorConfig};

/// Complete GNSS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GnssConfig {
    /// Control unit sensor listener address, `host:port`.
    pub control_unit: String,

    /// Route feed listener bind address.
    #[serde(default = "default_feed_listen")]
    pub feed_listen: String,

    /// GNSS-specific settings.
    #[serde(default)]
    pub gnss: GnssSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GnssSettings {
    /// Sampling interval used until the control unit echoes one, in seconds.
    #[serde(default = "default_initial_frequency_secs")]
    pub initial_frequency_secs: f64,
}

fn default_feed_listen() -> String {
    "0.0.0.0:9292".to_string()
}

fn default_initial_frequency_secs() -> f64 {
    1.0
}

impl Default for GnssSettings {
    fn default() -> Self {
        Self {
            initial_frequency_secs: default_initial_frequency_secs(),
        }
    }
}

impl SimulatorConfig for GnssConfig {
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
                "feed_listen must include a port (e.g., '0.0.0.0:9292')",
            ));
        }
        if !self.gnss.initial_frequency_secs.is_finite() || self.gnss.initial_frequency_secs <= 0.0
        {
            return Err(SensorError::validation(
                "gnss.initial_frequency_secs must be positive",
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
        let config: GnssConfig =
            json5::from_str(r#"{ control_unit: "control-unit:9290" }"#).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.feed_listen, "0.0.0.0:9292");
        assert_eq!(config.gnss.initial_frequency_secs, 1.0);
    }

    #[test]
    fn test_validate_rejects_nonpositive_frequency() {
        let config: GnssConfig = json5::from_str(
            r#"{ control_unit: "cu:9290", gnss: { initial_frequency_secs: 0 } }"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
