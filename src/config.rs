//! Configuration parsing for the Herald server.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides (`PORT`, `VAPID_*`, `ALLOWED_ORIGINS`, `HERALD_*`)
//! - Sensible defaults for quick start

use clap::{Parser, ValueEnum};
use std::time::Duration;

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Herald: a Web Push fan-out backend.
#[derive(Parser, Debug, Clone)]
#[command(name = "herald")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "HERALD_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "HERALD_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// VAPID public key (base64url, uncompressed P-256 point)
    #[arg(long, env = "VAPID_PUBLIC_KEY", hide_env_values = true)]
    pub vapid_public_key: Option<String>,

    /// VAPID private key (base64url raw scalar, SEC1 DER or PKCS#8 DER)
    #[arg(long, env = "VAPID_PRIVATE_KEY", hide_env_values = true)]
    pub vapid_private_key: Option<String>,

    /// VAPID subject claim (mailto: address or https: URL)
    #[arg(long, env = "VAPID_SUBJECT", default_value = "mailto:admin@localhost")]
    pub vapid_subject: String,

    /// Comma-separated list of origins allowed by CORS (`*` mirrors any origin)
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000,http://127.0.0.1:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// Timeout for a single push delivery, in seconds
    #[arg(long, env = "HERALD_PUSH_TIMEOUT_SECS", default_value_t = 10)]
    pub push_timeout_secs: u64,

    /// TTL the push service should retain undelivered messages for, in seconds
    #[arg(long, env = "HERALD_PUSH_TTL", default_value_t = 2_419_200)]
    pub push_ttl: u32,

    /// Remove subscriptions the push service reports as gone (404/410)
    #[arg(long, env = "HERALD_PRUNE_EXPIRED", default_value_t = false)]
    pub prune_expired: bool,

    /// Maximum accepted request body size, in bytes
    #[arg(long, env = "HERALD_BODY_LIMIT", default_value_t = 10 * 1024 * 1024)]
    pub body_limit: usize,

    /// Requests per client IP allowed on `/api/*` within one window (0 disables)
    #[arg(long, env = "HERALD_API_RATE_LIMIT", default_value_t = 100)]
    pub api_rate_limit: u32,

    /// Window for `--api-rate-limit`, in seconds
    #[arg(long, env = "HERALD_API_RATE_WINDOW_SECS", default_value_t = 900)]
    pub api_rate_window_secs: u64,

    /// Subscribe requests per client IP allowed within one window (0 disables)
    #[arg(long, env = "HERALD_SUBSCRIBE_RATE_LIMIT", default_value_t = 10)]
    pub subscribe_rate_limit: u32,

    /// Window for `--subscribe-rate-limit`, in seconds
    #[arg(long, env = "HERALD_SUBSCRIBE_RATE_WINDOW_SECS", default_value_t = 3600)]
    pub subscribe_rate_window_secs: u64,

    /// Take the client IP from `X-Forwarded-For` (set when behind a proxy)
    #[arg(long, env = "HERALD_TRUST_PROXY", default_value_t = false)]
    pub trust_proxy: bool,

    /// Enable the Prometheus metrics endpoint
    #[arg(long, env = "HERALD_METRICS_ENABLED", default_value_t = false)]
    pub metrics_enabled: bool,

    /// Port for the Prometheus metrics endpoint
    #[arg(long, env = "HERALD_METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Per-delivery timeout as a [`Duration`].
    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }

    /// VAPID subject normalised to a URI; a bare e-mail becomes `mailto:`.
    pub fn vapid_subject_uri(&self) -> String {
        let subject = self.vapid_subject.trim();
        if subject.starts_with("mailto:") || subject.starts_with("https://") {
            subject.to_string()
        } else {
            format!("mailto:{subject}")
        }
    }

    /// General `/api/*` quota, or `None` when disabled.
    pub fn api_rate_policy(&self) -> Option<RatePolicy> {
        RatePolicy::new(self.api_rate_limit, self.api_rate_window_secs)
    }

    /// Subscribe quota, or `None` when disabled.
    pub fn subscribe_rate_policy(&self) -> Option<RatePolicy> {
        RatePolicy::new(self.subscribe_rate_limit, self.subscribe_rate_window_secs)
    }

    /// Create a configuration for testing, with no VAPID credentials and
    /// rate limiting off.
    pub fn test_config() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0, // Random port
            log_level: "debug".into(),
            api_rate_limit: 0,
            subscribe_rate_limit: 0,
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            log_level: "info".into(),
            log_format: LogFormat::Text,
            vapid_public_key: None,
            vapid_private_key: None,
            vapid_subject: "mailto:admin@localhost".into(),
            allowed_origins: vec![
                "http://localhost:3000".into(),
                "http://127.0.0.1:3000".into(),
            ],
            push_timeout_secs: 10,
            push_ttl: 2_419_200,
            prune_expired: false,
            body_limit: 10 * 1024 * 1024,
            api_rate_limit: 100,
            api_rate_window_secs: 900,
            subscribe_rate_limit: 10,
            subscribe_rate_window_secs: 3600,
            trust_proxy: false,
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}

/// A fixed-window request quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl RatePolicy {
    /// `None` when either value is zero.
    pub fn new(max_requests: u32, window_secs: u64) -> Option<Self> {
        (max_requests > 0 && window_secs > 0).then(|| Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        })
    }
}
