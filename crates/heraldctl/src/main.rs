//! heraldctl: Command-line interface for the Herald Web Push backend.
//!
//! Inspects subscriptions, triggers broadcasts and manages VAPID keys
//! from the terminal.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use herald::client::ConnectConfig;

/// Command-line interface for the Herald Web Push backend.
#[derive(Parser)]
#[command(name = "heraldctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Herald server endpoint (e.g., http://localhost:5000)
    #[arg(short, long, env = "HERALD_ENDPOINT", default_value = "http://localhost:5000")]
    endpoint: String,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show server health
    Health,
    /// List registered subscriptions
    Subscriptions,
    /// Broadcast a notification to every subscriber
    Send {
        /// Notification title
        #[arg(short, long)]
        title: Option<String>,
        /// Notification body
        #[arg(short, long)]
        body: Option<String>,
        /// Icon URL
        #[arg(long)]
        icon: Option<String>,
        /// URL opened when the notification is clicked
        #[arg(long)]
        url: Option<String>,
    },
    /// Show one subscription by endpoint
    Subscription {
        /// Push service endpoint URL
        endpoint: String,
    },
    /// Push a test notification to one subscriber
    Test {
        /// Push service endpoint URL
        endpoint: String,
        /// Notification title
        #[arg(short, long)]
        title: Option<String>,
        /// Notification body
        #[arg(short, long)]
        body: Option<String>,
    },
    /// Remove a subscription by endpoint
    Unsubscribe {
        /// Push service endpoint URL
        endpoint: String,
    },
    /// Print the server's VAPID public key
    VapidKey,
    /// Generate a new VAPID keypair locally
    Keygen,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConnectConfig::new(cli.endpoint);

    match cli.command {
        Commands::Health => commands::health::run(config, cli.output).await?,
        Commands::Subscriptions => commands::subscriptions::list(config, cli.output).await?,
        Commands::Send {
            title,
            body,
            icon,
            url,
        } => {
            let request = herald::push::NotificationRequest {
                title,
                body,
                icon,
                url,
            };
            commands::send::run(config, request, cli.output).await?;
        }
        Commands::Subscription { endpoint } => {
            commands::subscriptions::show(config, &endpoint, cli.output).await?;
        }
        Commands::Test {
            endpoint,
            title,
            body,
        } => {
            let request = herald::api::types::TestNotificationRequest {
                endpoint,
                notification: herald::push::NotificationRequest {
                    title,
                    body,
                    ..Default::default()
                },
            };
            commands::send::test(config, request, cli.output).await?;
        }
        Commands::Unsubscribe { endpoint } => {
            commands::unsubscribe::run(config, &endpoint, cli.output).await?;
        }
        Commands::VapidKey => commands::vapid::public_key(config, cli.output).await?,
        Commands::Keygen => commands::vapid::keygen(cli.output)?,
    }

    Ok(())
}
