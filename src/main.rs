use anyhow::Result;
use plumbum::clock::{SharedClock, SystemClock};
use plumbum::config::Config;
use plumbum::driver::{ChargerDriver, DriverCommand};
use plumbum::psu::SimulatedSupply;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    plumbum::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Plumbum charger controller {} starting up",
        env!("APP_VERSION")
    );

    let clock: SharedClock = Arc::new(SystemClock);
    let psu = SimulatedSupply::new(&config.simulation, clock.clone());
    let auto_start = config.charging.auto_start;

    let mut driver = ChargerDriver::new(config, Box::new(psu), clock)
        .map_err(|e| anyhow::anyhow!("Failed to create driver: {}", e))?;

    if auto_start {
        driver.command_sender().send(DriverCommand::Start).ok();
    }

    let shutdown = driver.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, stopping"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        shutdown.send(()).ok();
    });

    match driver.run().await {
        Ok(()) => {
            info!("Driver shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Driver failed with error: {}", e);
            Err(anyhow::anyhow!("Driver error: {}", e))
        }
    }
}
