//! VAPID key commands.

use anyhow::{Context, Result};
use herald::client::{ConnectConfig, HeraldClient};
use herald::push::VapidKeys;
use serde::Serialize;

use crate::OutputFormat;

#[derive(Serialize)]
struct KeypairOutput {
    public_key: String,
    private_key: String,
}

/// Print the public key the server hands to browsers.
pub async fn public_key(config: ConnectConfig, format: OutputFormat) -> Result<()> {
    let client = HeraldClient::connect(config)?;
    let key = client
        .vapid_public_key()
        .await
        .context("failed to fetch VAPID public key")?;

    match format {
        OutputFormat::Text => println!("{key}"),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "publicKey": key }))?);
        }
    }

    Ok(())
}

/// Generate a fresh keypair without contacting the server.
pub fn keygen(format: OutputFormat) -> Result<()> {
    let keys = VapidKeys::generate();
    let output = KeypairOutput {
        public_key: keys.public_key_base64url().to_string(),
        private_key: keys.private_key_base64url().to_string(),
    };

    match format {
        OutputFormat::Text => {
            println!("VAPID_PUBLIC_KEY={}", output.public_key);
            println!("VAPID_PRIVATE_KEY={}", output.private_key);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
