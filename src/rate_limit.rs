//! Fixed-window, per-client request limits.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::Instant};

use crate::error::AppError;

/// Window shared by both limiters.
pub const WINDOW: Duration = Duration::from_secs(15 * 60);
pub const RPC_LIMIT: u32 = 200;
pub const AUTH_LIMIT: u32 = 20;
/// Hard cap on clients tracked at once.
pub const MAX_TRACKED_CLIENTS: usize = 10_000;

struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    limit: u32,
    window: Duration,
    max_clients: usize,
    trust_proxy: bool,
    hits: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            max_clients: MAX_TRACKED_CLIENTS,
            trust_proxy: false,
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub fn rpc() -> Self {
        Self::new(RPC_LIMIT, WINDOW)
    }

    pub fn auth() -> Self {
        Self::new(AUTH_LIMIT, WINDOW)
    }

    /// Key clients by `x-forwarded-for` instead of the socket peer.
    pub fn trusting_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    /// Count a request from `client`; `false` once the window's budget is
    /// spent, or when the table is full of live windows and `client` is new.
    pub async fn check(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;

        if !hits.contains_key(client) && hits.len() >= self.max_clients {
            hits.retain(|_, w| now.duration_since(w.started) < self.window);
            if hits.len() >= self.max_clients {
                tracing::warn!(
                    tracked = hits.len(),
                    max = self.max_clients,
                    "rate limiter full; rejecting new client"
                );
                return false;
            }
        }

        let window = hits.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.count = 0;
        }
        if window.count >= self.limit {
            return false;
        }
        window.count += 1;
        true
    }

    pub async fn tracked(&self) -> usize {
        self.hits.lock().await.len()
    }
}

/// The peer address; the first `x-forwarded-for` hop only when the proxy in
/// front is trusted to set it.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    let forwarded = trust_proxy
        .then(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(|ip| ip.trim().to_string())
                .filter(|ip| !ip.is_empty())
        })
        .flatten();
    forwarded
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer, limiter.trust_proxy);

    if !limiter.check(&key).await {
        tracing::warn!(client = %key, path = %request.uri().path(), "rate limit exceeded");
        return Err(AppError::TooManyRequests);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limit_is_enforced_per_client() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("a").await);
        assert!(limiter.check("a").await);
        assert!(!limiter.check("a").await);
        assert!(limiter.check("b").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("a").await);
        assert!(!limiter.check("a").await);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.check("a").await);
    }

    #[test]
    fn test_client_key_forwarded_for_only_behind_trusted_proxy() {
        let mut headers = HeaderMap::new();
        let peer = Some(SocketAddr::from(([10, 0, 0, 1], 4000)));
        assert_eq!(client_key(&headers, peer, true), "10.0.0.1");

        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_key(&headers, peer, true), "203.0.113.7");
        assert_eq!(client_key(&headers, peer, false), "10.0.0.1");
        assert_eq!(client_key(&headers, None, false), "unknown");
        assert_eq!(client_key(&HeaderMap::new(), None, true), "unknown");
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracked_clients_are_capped() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60)).with_max_clients(3);
        for client in ["a", "b", "c"] {
            assert!(limiter.check(client).await);
        }
        assert!(!limiter.check("d").await);
        assert!(limiter.check("a").await);
        assert_eq!(limiter.tracked().await, 3);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.check("d").await);
        assert_eq!(limiter.tracked().await, 1);
    }
}
