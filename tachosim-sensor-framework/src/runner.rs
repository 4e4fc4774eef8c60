//! Simulator runner for lifecycle management.

use std::future::Future;

use tokio::signal;
use tokio::task::JoinHandle;

use tachosim_common::{LoggingConfig, init_tracing};

use crate::SensorArgs;
use crate::config::SimulatorConfig;
use crate::error::{Result, SensorError};

/// Runner that manages the lifecycle of a sensor simulator.
///
/// Handles:
/// - Logging initialization (with optional CLI override)
/// - Task spawning and management
/// - Graceful shutdown on Ctrl+C
///
/// # Example
///
/// ```ignore
/// use tachosim_sensor_framework::{SensorArgs, SimulatorConfig, SimulatorRunner};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let args = SensorArgs::parse_with_default("odometer.json5");
///     let config = OdometerConfig::load(&args.config)?;
///
///     let mut runner = SimulatorRunner::new("odometer", &config, Some(&args))?;
///     runner.spawn(async move {
///         // Simulator loop here
///     });
///
///     runner.run().await
/// }
/// ```
pub struct SimulatorRunner {
    /// Simulator name for logging.
    name: String,
    /// Spawned tasks.
    tasks: Vec<JoinHandle<()>>,
}

impl SimulatorRunner {
    /// Create a new runner and initialize logging.
    pub fn new<C: SimulatorConfig>(
        name: impl Into<String>,
        config: &C,
        args: Option<&SensorArgs>,
    ) -> Result<Self> {
        let name = name.into();

        // Initialize logging with optional CLI override
        let log_config = match args.and_then(|a| a.log_level.clone()) {
            Some(level) => LoggingConfig {
                level,
                format: config.logging().format,
            },
            None => config.logging().clone(),
        };

        init_tracing(&log_config).map_err(|e| SensorError::config(e.to_string()))?;

        tracing::info!(
            simulator = %name,
            version = env!("CARGO_PKG_VERSION"),
            control_unit = %config.control_unit_addr(),
            "Starting simulator"
        );

        Ok(Self {
            name,
            tasks: Vec::new(),
        })
    }

    /// Get the simulator name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn a worker task.
    ///
    /// The task will be tracked and aborted on shutdown.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        self.tasks.push(handle);
    }

    /// Spawn a worker task that returns a Result.
    ///
    /// Errors are logged automatically.
    pub fn spawn_with_error<F, E>(&mut self, name: String, future: F)
    where
        F: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            if let Err(e) = future.await {
                tracing::error!(worker = %name, error = %e, "Worker failed");
            }
        });
        self.tasks.push(handle);
    }

    /// Run the simulator until Ctrl+C is received, then abort all tasks.
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            simulator = %self.name,
            tasks = self.tasks.len(),
            "Simulator running. Press Ctrl+C to stop."
        );

        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }

        tracing::info!(simulator = %self.name, "Received shutdown signal");

        for task in &self.tasks {
            task.abort();
        }

        // Wait briefly for tasks to clean up
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        tracing::info!(simulator = %self.name, "Goodbye!");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // The runner blocks on Ctrl+C, which cannot be raised portably in unit
    // tests. The simulator binaries exercise it end to end.
}
