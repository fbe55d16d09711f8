//! Unsubscribe command implementation.

use anyhow::{Context, Result};
use herald::client::{ConnectConfig, HeraldClient};
use serde::Serialize;

use crate::OutputFormat;

#[derive(Serialize)]
struct UnsubscribeOutput<'a> {
    endpoint: &'a str,
    status: String,
}

pub async fn run(config: ConnectConfig, endpoint: &str, format: OutputFormat) -> Result<()> {
    let client = HeraldClient::connect(config)?;
    let response = client
        .unsubscribe(endpoint)
        .await
        .context("unsubscribe failed")?;

    let output = UnsubscribeOutput {
        endpoint,
        status: response.status,
    };

    match format {
        OutputFormat::Text => {
            println!("Unsubscribed {}", output.endpoint);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
