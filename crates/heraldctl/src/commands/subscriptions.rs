//! Subscriptions command implementation.

use anyhow::{Context, Result};
use herald::api::types::SubscriptionsResponse;
use herald::client::{ConnectConfig, HeraldClient};
use herald::registry::Subscription;

use crate::OutputFormat;

pub async fn list(config: ConnectConfig, format: OutputFormat) -> Result<()> {
    let client = HeraldClient::connect(config)?;
    let output = client
        .subscriptions()
        .await
        .context("failed to list subscriptions")?;

    match format {
        OutputFormat::Text => print!("{}", render_list(&output)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
    }

    Ok(())
}

pub async fn show(config: ConnectConfig, endpoint: &str, format: OutputFormat) -> Result<()> {
    let client = HeraldClient::connect(config)?;
    let output = client
        .subscription(endpoint)
        .await
        .context("failed to look up subscription")?;

    match format {
        OutputFormat::Text => print!("{}", render_one(&output.subscription)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
    }

    Ok(())
}

fn render_list(output: &SubscriptionsResponse) -> String {
    if output.subscriptions.is_empty() {
        return "No subscriptions.\n".to_string();
    }

    let mut text = format!("{:<4} {}\n{}\n", "#", "ENDPOINT", "-".repeat(72));
    for (index, subscription) in output.subscriptions.iter().enumerate() {
        text.push_str(&format!("{:<4} {}\n", index + 1, subscription.endpoint));
    }
    text.push_str(&format!("\nTotal: {} subscription(s)\n", output.count));
    text
}

fn render_one(subscription: &Subscription) -> String {
    let mut text = format!(
        "Endpoint: {}\n  p256dh: {}\n  auth:   {}\n",
        subscription.endpoint, subscription.keys.p256dh, subscription.keys.auth
    );
    for (key, value) in &subscription.extra {
        text.push_str(&format!("  {key}: {value}\n"));
    }
    text
}
