//! Rate limiting middleware using token bucket algorithm

use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rkive_common::errors::{AppError, Result};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Process-wide limiter; every caller shares one bucket
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Limiter plus the rate it was built with, for the error payload
pub struct RequestLimiter {
    limiter: GlobalRateLimiter,
    requests_per_second: u32,
}

impl RequestLimiter {
    pub fn check(&self) -> Result<()> {
        self.limiter.check().map_err(|_| AppError::RateLimited {
            limit: self.requests_per_second,
        })
    }
}

/// Create a limiter refilling `requests_per_second`, holding at most `burst`.
/// Zero values are raised to one.
pub fn create_rate_limiter(requests_per_second: u32, burst: u32) -> Arc<RequestLimiter> {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(rate);

    Arc::new(RequestLimiter {
        limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
        requests_per_second: rate.get(),
    })
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RequestLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response> {
    if let Err(e) = limiter.check() {
        tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
        return Err(e);
    }

    Ok(next.run(request).await)
}
