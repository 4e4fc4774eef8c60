//! TachoSim control unit binary.
//!
//! Wires the aggregation core to its collaborators: the sensor listener, the
//! periodic rule evaluator, and the backend session over Zenoh. Shuts down
//! on Ctrl+C or when the backend rejects the authorization request.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use uuid::Uuid;

use tachosim_common::{LoggingConfig, UnitTopics, connect, init_tracing};
use tachosim_control_unit::aggregator::{self, Aggregator};
use tachosim_control_unit::backend::SessionManager;
use tachosim_control_unit::config::{ControlUnitConfig, UnitArgs};
use tachosim_control_unit::server::{self, SensorPeers};
use tachosim_control_unit::state::SamplingControl;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = UnitArgs::parse();
    let config = ControlUnitConfig::load_from_file(&args.config)?;

    let log_config = match args.log_level {
        Some(level) => LoggingConfig {
            level,
            format: config.logging.format,
        },
        None => config.logging.clone(),
    };
    init_tracing(&log_config).map_err(|e| anyhow::anyhow!("{}", e))?;

    let host = hostname::get()
        .context("cannot determine hostname")?
        .to_string_lossy()
        .into_owned();
    let unit_id = format!("unit-{}", Uuid::new_v4());

    tracing::info!(
        unit_id = %unit_id,
        host = %host,
        version = env!("CARGO_PKG_VERSION"),
        "Starting control unit"
    );

    let sampling = SamplingControl::new(
        config.unit.telemetry_frequency_secs,
        config.unit.sampling_frequency_secs,
    );
    let aggregator = Arc::new(Aggregator::new(unit_id, sampling));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Broker connect failure is fatal at startup: no reconnect, no backoff.
    let session = Arc::new(connect(&config.zenoh).await?);
    let topics = UnitTopics::with_prefix(config.unit.key_prefix.clone(), &host);
    let manager = SessionManager::connect(
        session,
        topics,
        aggregator.clone(),
        config.unit.serialization,
        Duration::from_secs_f64(config.unit.idle_poll_secs),
        shutdown_tx.clone(),
    )
    .await
    .map_err(|e| anyhow::anyhow!("backend session setup failed: {}", e))?;

    let peers = SensorPeers::resolve(&config.unit.sensors)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let listener = TcpListener::bind(&config.unit.listen)
        .await
        .with_context(|| format!("failed to bind sensor listener to {}", config.unit.listen))?;

    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(server::run_server(
        listener,
        aggregator.clone(),
        peers,
        shutdown_rx.clone(),
    )));
    tasks.push(tokio::spawn(aggregator::run_evaluator(
        aggregator.clone(),
        Duration::from_secs_f64(config.unit.evaluation_interval_secs),
        shutdown_rx.clone(),
    )));
    {
        let manager = manager.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = manager.run_config_listener().await {
                tracing::error!(error = %e, "Config listener failed");
            }
        }));
    }
    tasks.push(tokio::spawn(
        manager.clone().run_publish_loop(shutdown_rx.clone()),
    ));

    // Two ways out: the operator, or a rejection signalled by the session
    // manager from the subscriber task.
    let mut rejection_rx = shutdown_rx.clone();
    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
        }
        _ = rejection_rx.changed() => {
            tracing::info!("Backend rejected the session, shutting down");
        }
    }

    let _ = shutdown_tx.send(true);

    // Let every loop reach its next polling point, then stop stragglers.
    tokio::time::sleep(Duration::from_millis(100)).await;
    for task in &tasks {
        task.abort();
    }

    if let Err(e) = manager.shutdown().await {
        tracing::warn!(error = %e, "Error closing backend session");
    }

    tracing::info!("Goodbye!");

    Ok(())
}
