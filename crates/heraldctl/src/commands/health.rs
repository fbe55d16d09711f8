//! Health command implementation.

use anyhow::{Context, Result};
use herald::client::{ConnectConfig, HeraldClient};

use crate::OutputFormat;

pub async fn run(config: ConnectConfig, format: OutputFormat) -> Result<()> {
    let client = HeraldClient::connect(config)?;
    let health = client.health().await.context("health check failed")?;

    match format {
        OutputFormat::Text => {
            println!("Status:           {}", health.status);
            println!("Subscriptions:    {}", health.subscriptions);
            println!(
                "VAPID configured: {}",
                if health.vapid_configured { "yes" } else { "no" }
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
    }

    Ok(())
}
