//! Control unit configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use tachosim_common::{Format, LoggingConfig, SensorKind, ZenohConfig};

/// CLI arguments for the control unit.
#[derive(Parser, Debug, Clone)]
#[command(about = "TachoSim control unit")]
pub struct UnitArgs {
    /// Path to configuration file.
    #[arg(short, long, default_value = "control-unit.json5")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl UnitArgs {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

/// Complete control unit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlUnitConfig {
    /// Zenoh connection settings (the monitoring backend).
    pub zenoh: ZenohConfig,

    /// Unit-specific settings.
    #[serde(default)]
    pub unit: UnitConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Unit-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitConfig {
    /// Sensor listener bind address.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Key expression prefix for backend traffic.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Serialization format for published telemetry and events.
    #[serde(default)]
    pub serialization: Format,

    /// Rule evaluator period in seconds.
    #[serde(default = "default_evaluation_interval")]
    pub evaluation_interval_secs: f64,

    /// Initial telemetry publish interval in seconds (remotely configurable).
    #[serde(default = "default_frequency")]
    pub telemetry_frequency_secs: f64,

    /// Initial sensor sampling interval in seconds (remotely configurable).
    #[serde(default = "default_frequency")]
    pub sampling_frequency_secs: f64,

    /// Poll interval while awaiting authorization, in seconds.
    #[serde(default = "default_idle_poll")]
    pub idle_poll_secs: f64,

    /// Expected sensor peers.
    #[serde(default)]
    pub sensors: PeersConfig,
}

/// Expected sensor peer identities.
///
/// `odometer`, `gnss`, and `card_reader` take a host name or IP literal that
/// is resolved at startup; `aliases` pins individual IPs to a kind directly
/// (useful in containerized setups where reverse resolution is unreliable).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeersConfig {
    #[serde(default)]
    pub odometer: Option<String>,

    #[serde(default)]
    pub gnss: Option<String>,

    #[serde(default)]
    pub card_reader: Option<String>,

    #[serde(default)]
    pub aliases: HashMap<String, SensorKind>,
}

fn default_listen() -> String {
    "0.0.0.0:9290".to_string()
}

fn default_key_prefix() -> String {
    "tachosim".to_string()
}

fn default_evaluation_interval() -> f64 {
    1.0
}

fn default_frequency() -> f64 {
    1.0
}

fn default_idle_poll() -> f64 {
    10.0
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            key_prefix: default_key_prefix(),
            serialization: Format::default(),
            evaluation_interval_secs: default_evaluation_interval(),
            telemetry_frequency_secs: default_frequency(),
            sampling_frequency_secs: default_frequency(),
            idle_poll_secs: default_idle_poll(),
            sensors: PeersConfig::default(),
        }
    }
}

impl ControlUnitConfig {
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
        if !self.unit.listen.contains(':') {
            anyhow::bail!(
                "unit.listen must include a port (e.g., '0.0.0.0:9290'), got '{}'",
                self.unit.listen
            );
        }

        for (name, value) in [
            ("evaluation_interval_secs", self.unit.evaluation_interval_secs),
            ("telemetry_frequency_secs", self.unit.telemetry_frequency_secs),
            ("sampling_frequency_secs", self.unit.sampling_frequency_secs),
            ("idle_poll_secs", self.unit.idle_poll_secs),
        ] {
            if !value.is_finite() || value <= 0.0 {
                anyhow::bail!("unit.{} must be a positive number, got {}", name, value);
            }
        }

        let sensors = &self.unit.sensors;
        if sensors.odometer.is_none()
            && sensors.gnss.is_none()
            && sensors.card_reader.is_none()
            && sensors.aliases.is_empty()
        {
            anyhow::bail!("unit.sensors must name at least one expected sensor peer");
        }

        Ok(())
    }
}
