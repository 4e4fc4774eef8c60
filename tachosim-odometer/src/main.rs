//! TachoSim odometer simulator binary.

use anyhow::Result;
use tachosim_common::SpeedSegment;
use tachosim_sensor_framework::{
    RequestLink, RouteFeed, SensorArgs, SimulatorConfig, SimulatorRunner,
};

use tachosim_odometer::config::OdometerConfig;
use tachosim_odometer::simulator::OdometerSimulator;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = SensorArgs::parse_with_default("odometer.json5");

    // Load configuration
    let config = OdometerConfig::load(&args.config).map_err(|e| anyhow::anyhow!("{}", e))?;

    // Create the runner (initializes logging)
    let mut runner = SimulatorRunner::new("odometer", &config, Some(&args))
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    // Route feed from the route generator
    let feed: RouteFeed<SpeedSegment> = RouteFeed::new();
    {
        let feed = feed.clone();
        let bind = config.feed_listen.clone();
        runner.spawn_with_error(
            "route-feed".to_string(),
            async move { feed.listen(&bind).await },
        );
    }

    // Connect to the control unit and start the simulation loop
    let link = RequestLink::connect(config.control_unit_addr())
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let simulator = OdometerSimulator::new(link, feed, config.odometer.clone());

    runner.spawn_with_error("odometer".to_string(), simulator.run());

    // Run until Ctrl+C
    runner.run().await.map_err(|e| anyhow::anyhow!("{}", e))
}
