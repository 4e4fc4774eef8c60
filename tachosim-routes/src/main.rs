//! TachoSim route generator binary.
//!
//! Computes the route, delivers both feeds, exits.

use anyhow::Result;

use tachosim_common::{LoggingConfig, init_tracing};
use tachosim_sensor_framework::SensorArgs;

use tachosim_routes::config::RoutesConfig;
use tachosim_routes::feeder::feed_segments;
use tachosim_routes::route::{build_plan, fetch_route_steps};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = SensorArgs::parse_with_default("routes.json5");

    // Load configuration
    let config = RoutesConfig::load_from_file(&args.config)?;

    let log_config = match args.log_level {
        Some(level) => LoggingConfig {
            level,
            format: config.logging.format,
        },
        None => config.logging.clone(),
    };
    init_tracing(&log_config).map_err(|e| anyhow::anyhow!("{}", e))?;

    // Compute the route and expand it into feed segments
    let steps = fetch_route_steps(&config.api).await?;
    let plan = build_plan(&steps);

    tracing::info!(
        steps = steps.len(),
        position_segments = plan.positions.len(),
        speed_segments = plan.speeds.len(),
        "Route plan ready"
    );

    if plan.positions.is_empty() {
        anyhow::bail!("route produced no usable segments");
    }

    // Deliver both feeds concurrently; each paces itself by segment time.
    let gnss = tokio::spawn(feed_segments(config.gnss_feed.clone(), "gnss", plan.positions));
    let odometer = tokio::spawn(feed_segments(
        config.odometer_feed.clone(),
        "odometer",
        plan.speeds,
    ));

    let (gnss_result, odometer_result) = tokio::join!(gnss, odometer);
    gnss_result?.map_err(|e| anyhow::anyhow!("gnss feed failed: {}", e))?;
    odometer_result?.map_err(|e| anyhow::anyhow!("odometer feed failed: {}", e))?;

    tracing::info!("All segments delivered, route generator done");

    Ok(())
}
