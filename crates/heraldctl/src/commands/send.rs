//! Send and test commands.

use anyhow::{Context, Result};
use herald::api::types::{SendResponse, TestNotificationRequest};
use herald::client::{ConnectConfig, HeraldClient};
use herald::push::{DeliveryStatus, NotificationRequest};

use crate::OutputFormat;

pub async fn run(
    config: ConnectConfig,
    request: NotificationRequest,
    format: OutputFormat,
) -> Result<()> {
    let client = HeraldClient::connect(config)?;
    let report = client.send(&request).await.context("broadcast failed")?;

    match format {
        OutputFormat::Text => print!("{}", render_report(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

pub async fn test(
    config: ConnectConfig,
    request: TestNotificationRequest,
    format: OutputFormat,
) -> Result<()> {
    let client = HeraldClient::connect(config)?;
    let response = client
        .send_test(&request)
        .await
        .context("test notification failed")?;

    match format {
        OutputFormat::Text => {
            println!("Test notification {} {}", response.notification_id, response.outcome);
            println!("  Endpoint: {}", response.endpoint);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
    }

    Ok(())
}

/// Summary line plus one line per subscriber that was not delivered to.
fn render_report(report: &SendResponse) -> String {
    let mut text = format!(
        "Broadcast {}\n  Sent: {}  Failed: {}  Expired: {}  Pruned: {}  Subscribers: {}\n",
        report.broadcast_id,
        report.sent,
        report.failed,
        report.expired,
        report.pruned,
        report.total_subscribers
    );
    for result in report
        .results
        .iter()
        .filter(|r| r.outcome != DeliveryStatus::Delivered)
    {
        match &result.error {
            Some(error) => text.push_str(&format!(
                "  {:<9} {} ({})\n",
                result.outcome.as_str(),
                result.endpoint,
                error
            )),
            None => text.push_str(&format!(
                "  {:<9} {}\n",
                result.outcome.as_str(),
                result.endpoint
            )),
        }
    }
    text
}
