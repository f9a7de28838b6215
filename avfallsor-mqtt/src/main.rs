//! One-shot bridge that fetches the Avfall Sør pickup calendar for a
//! configured address and publishes the next date per waste fraction as
//! Home Assistant MQTT sensors.

mod config;
mod publish;

use std::process::ExitCode;

use anyhow::Result;
use chrono::Local;
use dotenv::dotenv;
use log::{LevelFilter, error, info};
use reqwest::Client;

use crate::config::Config;

const USER_AGENT: &str = concat!("avfallsor-mqtt/", env!("CARGO_PKG_VERSION"));

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Application error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    // Configuration is validated before any network activity.
    let config = Config::from_env()?;

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.http_timeout)
        .build()?;
    let service = avfallsor_provider::service(client);

    let now = Local::now().naive_local();
    let pickups = service.next_pickups(&config.address, now).await?;
    info!("Found next dates for {} waste fractions", pickups.len());

    info!("Publishing waste collection dates to MQTT");
    publish::publish(&config.mqtt, &pickups).await?;

    info!("Process completed successfully");
    Ok(())
}
