//! Per-IP fixed-window rate limiting.
//!
//! Two quotas apply: a general one for every `/api/*` request and a tighter
//! one for `/api/subscribe`. Requests whose client IP cannot be determined
//! are not limited.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::config::RatePolicy;
use crate::error::ApiError;

/// Tracked clients above which expired windows are swept on insert.
const SWEEP_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window counter keyed by client IP.
#[derive(Debug)]
pub struct RateLimiter {
    policy: RatePolicy,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(policy: RatePolicy) -> Self {
        Self {
            policy,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count a request from `ip`; `false` once the quota is spent.
    pub fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let window = self.policy.window;

        if windows.len() >= SWEEP_THRESHOLD && !windows.contains_key(&ip) {
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.policy.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }
}

/// Limiters and client-IP policy shared by the middleware.
#[derive(Debug, Clone, Default)]
pub struct RateLimits {
    pub api: Option<Arc<RateLimiter>>,
    pub subscribe: Option<Arc<RateLimiter>>,
    /// Honour `X-Forwarded-For`.
    pub trust_proxy: bool,
}

impl RateLimits {
    pub fn new(api: Option<RatePolicy>, subscribe: Option<RatePolicy>, trust_proxy: bool) -> Self {
        Self {
            api: api.map(|p| Arc::new(RateLimiter::new(p))),
            subscribe: subscribe.map(|p| Arc::new(RateLimiter::new(p))),
            trust_proxy,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.api.is_some() || self.subscribe.is_some()
    }
}

/// Middleware enforcing [`RateLimits`].
pub async fn limit_requests(
    State(limits): State<RateLimits>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if path.starts_with("/api/") {
        if let Some(ip) = client_ip(&request, limits.trust_proxy) {
            if let Some(limiter) = &limits.api {
                if !limiter.check(ip) {
                    tracing::warn!(%ip, path, "API rate limit exceeded");
                    return ApiError::RateLimited(
                        "Too many requests from this IP, please try again later.".to_string(),
                    )
                    .into_response();
                }
            }
            if path == "/api/subscribe" {
                if let Some(limiter) = &limits.subscribe {
                    if !limiter.check(ip) {
                        tracing::warn!(%ip, "Subscribe rate limit exceeded");
                        return ApiError::RateLimited(
                            "Too many subscription attempts, please try again later.".to_string(),
                        )
                        .into_response();
                    }
                }
            }
        }
    }

    next.run(request).await
}

fn client_ip(request: &Request, trust_proxy: bool) -> Option<IpAddr> {
    if trust_proxy {
        if let Some(ip) = forwarded_for(request.headers()) {
            return Some(ip);
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// First address in `X-Forwarded-For`.
fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}
