//! TachoSim card reader simulator binary.

use anyhow::Result;
use tachosim_sensor_framework::{RequestLink, SensorArgs, SimulatorConfig, SimulatorRunner};

use tachosim_cardreader::config::CardReaderConfig;
use tachosim_cardreader::simulator::CardReaderSimulator;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = SensorArgs::parse_with_default("cardreader.json5");

    // Load configuration
    let config = CardReaderConfig::load(&args.config).map_err(|e| anyhow::anyhow!("{}", e))?;

    // Create the runner (initializes logging)
    let mut runner = SimulatorRunner::new("cardreader", &config, Some(&args))
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    // Connect to the control unit and start the simulation loop
    let link = RequestLink::connect(config.control_unit_addr())
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let simulator = CardReaderSimulator::new(link, config.card_reader.clone());

    runner.spawn_with_error("card-reader".to_string(), simulator.run());

    // Run until Ctrl+C
    runner.run().await.map_err(|e| anyhow::anyhow!("{}", e))
}
