//! Herald: a Web Push fan-out backend.
//!
//! # Usage
//!
//! ```bash
//! herald --port 5000 --log-level info
//! ```
//!
//! Environment variables can also be used:
//! - `PORT`: Port to listen on
//! - `VAPID_PUBLIC_KEY` / `VAPID_PRIVATE_KEY`: VAPID keypair (base64url)
//! - `VAPID_SUBJECT`: Contact URI for the VAPID `sub` claim
//! - `ALLOWED_ORIGINS`: Comma-separated CORS allow-list
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use herald::config::Config;
use herald::observability::metrics::init_metrics;
use herald::observability::tracing::init_tracing;
use herald::server::run_server;
use tokio::sync::watch;

/// Print startup banner with version and configuration.
fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    let vapid = match (&config.vapid_public_key, &config.vapid_private_key) {
        (Some(_), Some(_)) => "Configured",
        _ => "Not configured",
    };
    let metrics = if config.metrics_enabled {
        format!("{}:{}/metrics", config.host, config.metrics_port)
    } else {
        "disabled".to_string()
    };
    eprintln!(
        r#"
  Herald v{} - Web Push Fan-out

  Configuration:
    Address:    {}:{}
    VAPID:      {}
    Origins:    {}
    Metrics:    {}
    Log Level:  {}

  Press Ctrl+C to shutdown gracefully.
"#,
        version,
        config.host,
        config.port,
        vapid,
        config.allowed_origins.join(", "),
        metrics,
        config.log_level
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from CLI arguments and environment
    let config = Config::parse_args();

    // Initialize tracing/logging
    init_tracing(&config.log_level, config.log_format);

    // Initialize metrics
    init_metrics();

    // Print startup banner
    print_banner(&config);

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn signal handler task
    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(true);
    });

    // Run the server
    run_server(config, shutdown_rx).await?;

    tracing::info!("Herald shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn wait_for_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {
                        tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
                    }
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM, initiating shutdown...");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler, listening for Ctrl+C only");
                let _ = ctrl_c.await;
                tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = ctrl_c.await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, initiating shutdown...");
    }
}
