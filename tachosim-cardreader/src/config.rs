//! Card reader simulator configuration.

use serde::{Deserialize, Serialize};

use tachosim_sensor_framework::{LoggingConfig, Result, SensorError, SimulatorConfig};

/// Complete card reader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardReaderConfig {
    /// Control unit sensor listener address, `host:port`.
    pub control_unit: String,

    /// Card-reader specific settings.
    #[serde(default)]
    pub card_reader: CardReaderSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardReaderSettings {
    /// Upper bound for the random pause between updates, in seconds.
    #[serde(default = "default_max_pause_secs")]
    pub max_pause_secs: f64,

    /// Number of distinct driver identities to draw from.
    #[serde(default = "default_driver_count")]
    pub driver_count: u32,
}

fn default_max_pause_secs() -> f64 {
    60.0
}

fn default_driver_count() -> u32 {
    3
}

impl Default for CardReaderSettings {
    fn default() -> Self {
        Self {
            max_pause_secs: default_max_pause_secs(),
            driver_count: default_driver_count(),
        }
    }
}

impl SimulatorConfig for CardReaderConfig {
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
        if self.card_reader.max_pause_secs <= 0.0 || !self.card_reader.max_pause_secs.is_finite() {
            return Err(SensorError::validation(
                "card_reader.max_pause_secs must be positive",
            ));
        }
        if self.card_reader.driver_count == 0 {
            return Err(SensorError::validation(
                "card_reader.driver_count must be at least 1",
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
        let config: CardReaderConfig =
            json5::from_str(r#"{ control_unit: "control-unit:9290" }"#).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.card_reader.max_pause_secs, 60.0);
        assert_eq!(config.card_reader.driver_count, 3);
    }

    #[test]
    fn test_validate_rejects_zero_drivers() {
        let config: CardReaderConfig = json5::from_str(
            r#"{ control_unit: "cu:9290", card_reader: { driver_count: 0 } }"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
