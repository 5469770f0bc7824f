use wallet_host::error::HostError;
use wallet_host::host::WalletHost;
use wallet_host::logger::initialize as LoggerInitialize;

use bridge_core::config::{BridgeConfig, default_config_dir};

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::process::ExitCode;

use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            match serde_json::to_string(&e) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{e}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), HostError> {
    dotenvy::dotenv().ok();

    let config_dir = default_config_dir().ok_or_else(|| HostError::Host {
        message: "No config directory on this platform".to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;
    let log_dir = config_dir.join("logs");
    create_dir_all(&log_dir)?;

    // Logger first so config errors are recorded
    LoggerInitialize(&log_dir)?;

    info!("Wallet host starting");
    info!("Config directory: {}", config_dir.display());

    let mut config = BridgeConfig::load(&config_dir)?;
    config.apply_env_overrides()?;

    let host = WalletHost::start(&config).await?;
    let connection = host.connection_info();
    info!("IPC address: ws://{}", connection.address);
    info!("IPC auth token: {}", connection.auth_token);

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");
    host.shutdown();

    Ok(())
}
