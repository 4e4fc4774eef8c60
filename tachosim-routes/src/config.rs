//! Route generator configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use tachosim_sensor_framework::LoggingConfig;

/// Complete route generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesConfig {
    /// GNSS simulator feed listener address, `host:port`.
    pub gnss_feed: String,

    /// Odometer simulator feed listener address, `host:port`.
    pub odometer_feed: String,

    /// Routing API settings.
    pub api: RoutingApiConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// External routing API settings (Google Routes shaped).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingApiConfig {
    /// Compute-routes endpoint.
    #[serde(default = "default_api_url")]
    pub url: String,

    /// API key sent in the `X-Goog-Api-Key` header.
    pub api_key: String,

    /// Route origin address.
    pub origin: String,

    /// Route destination address.
    pub destination: String,

    /// Language code for the request body.
    #[serde(default = "default_language_code")]
    pub language_code: String,
}

fn default_api_url() -> String {
    "https://routes.googleapis.com/directions/v2:computeRoutes".to_string()
}

fn default_language_code() -> String {
    "es-ES".to_string()
}

impl RoutesConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, addr) in [
            ("gnss_feed", &self.gnss_feed),
            ("odometer_feed", &self.odometer_feed),
        ] {
            if !addr.contains(':') {
                anyhow::bail!("{} must include a port (e.g., 'gnss-sim:9292'), got '{}'", name, addr);
            }
        }
        if self.api.origin.is_empty() || self.api.destination.is_empty() {
            anyhow::bail!("api.origin and api.destination must be set");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            gnss_feed: "gnss-sim:9292",
            odometer_feed: "odometer-sim:9291",
            api: {
                api_key: "test-key",
                origin: "Ayuntamiento de Leganes",
                destination: "Ayuntamiento de Getafe",
            },
        }"#;

        let config: RoutesConfig = json5::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.api.url,
            "https://routes.googleapis.com/directions/v2:computeRoutes"
        );
        assert_eq!(config.api.language_code, "es-ES");
    }

    #[test]
    fn test_validate_rejects_missing_port() {
        let json = r#"{
            gnss_feed: "gnss-sim",
            odometer_feed: "odometer-sim:9291",
            api: { api_key: "k", origin: "a", destination: "b" },
        }"#;

        let config: RoutesConfig = json5::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }
}
