//! Configuration traits and utilities.

use std::path::Path;

use serde::de::DeserializeOwned;

use tachosim_common::LoggingConfig;

use crate::error::{Result, SensorError};

/// Trait for sensor simulator configuration types.
///
/// Implement this trait for your simulator's configuration struct to get
/// automatic loading, validation, and access to common config fields.
///
/// # Example
///
/// ```ignore
/// use serde::Deserialize;
/// use tachosim_sensor_framework::{LoggingConfig, SimulatorConfig};
///
/// #[derive(Debug, Deserialize)]
/// pub struct OdometerConfig {
///     pub control_unit: String,
///     pub logging: LoggingConfig,
/// }
///
/// impl SimulatorConfig for OdometerConfig {
///     fn logging(&self) -> &LoggingConfig {
///         &self.logging
///     }
///
///     fn control_unit_addr(&self) -> &str {
///         &self.control_unit
///     }
/// }
/// ```
pub trait SimulatorConfig: Sized + DeserializeOwned {
    /// Get the logging configuration.
    fn logging(&self) -> &LoggingConfig;

    /// Address of the control unit's sensor listener, `host:port`.
    fn control_unit_addr(&self) -> &str;

    /// Validate the configuration.
    ///
    /// Called automatically after loading. Override to add custom validation.
    fn validate(&self) -> Result<()> {
        if self.control_unit_addr().is_empty() {
            return Err(SensorError::validation("control_unit address is empty"));
        }
        Ok(())
    }

    /// Load configuration from a file path.
    ///
    /// Supports JSON5 format. Calls [`validate`](Self::validate) after loading.
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SensorError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }
}
