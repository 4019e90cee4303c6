// Middleware for rate limiting and request accounting

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::Instant;

use super::error::ApiError;
use super::AppState;

// ---------------------------------------------------------------------------
// Rate limiter: one token bucket shared by every route
// ---------------------------------------------------------------------------

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Shared rate limiter state, cheap to clone
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    bucket: Mutex<Bucket>,
    /// Maximum tokens (burst capacity)
    capacity: f64,
    /// Tokens added per second (sustained rate)
    refill_rate: f64,
}

impl RateLimiter {
    /// Create a rate limiter that starts full.
    ///
    /// - `requests_per_second`: sustained rate
    /// - `burst`: bucket capacity
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        let capacity = f64::from(burst);
        Self {
            inner: Arc::new(RateLimiterInner {
                bucket: Mutex::new(Bucket {
                    tokens: capacity,
                    last_refill: Instant::now(),
                }),
                capacity,
                refill_rate: requests_per_second,
            }),
        }
    }

    /// Returns true if a request is admitted. Consumes one token.
    pub fn check(&self) -> bool {
        let now = Instant::now();
        let mut bucket = self.inner.bucket.lock();

        // Refill tokens based on elapsed time
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.inner.refill_rate).min(self.inner.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently available, after refill.
    #[cfg(test)]
    pub(crate) fn available(&self) -> f64 {
        let now = Instant::now();
        let bucket = self.inner.bucket.lock();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        (bucket.tokens + elapsed * self.inner.refill_rate).min(self.inner.capacity)
    }
}

/// Rejects requests with 429 once the shared bucket is empty, before they
/// reach any handler.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.limiter.check() {
        return next.run(request).await;
    }

    state.service.metrics().rate_limited();
    tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
    ApiError::RateLimited.into_response()
}

/// Logs each request and counts it by matched route and status.
///
/// Health checks are counted but not logged.
pub async fn track_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    if route != "/api/health" {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        tracing::info!(
            method = %request.method(),
            path = %request.uri().path(),
            peer = %peer,
            "Request"
        );
    }

    let response = next.run(request).await;
    state
        .service
        .metrics()
        .request_completed(&route, response.status().as_u16());
    response
}
