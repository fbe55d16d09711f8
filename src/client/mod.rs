//! HTTP client for a running Herald server.
//!
//! Used by the `heraldctl` CLI. Responses are decoded into the same wire
//! types the server serializes, see [`crate::api::types`].

mod connection;

pub use connection::{ClientError, ConnectConfig, HeraldClient};
