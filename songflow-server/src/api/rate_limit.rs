//! Per-client request limiting
//!
//! Three keyed limiters, one per route class, keyed by client IP. Requests
//! over the limit get HTTP 429 before reaching the handler.
//!
//! Submissions also pass a softer limiter first: past a small free allowance
//! each one is held until the allowance replenishes, up to a maximum delay.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use songflow_common::config::RateLimitConfig;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{ApiError, ApiResult, AppState};

const LOGIN_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Keyed limiters for the three route classes
pub struct RateLimiters {
    /// Song and ballot submissions
    pub submissions: DefaultKeyedRateLimiter<IpAddr>,
    /// Polling reads (song list, own ballot, results)
    pub reads: DefaultKeyedRateLimiter<IpAddr>,
    /// Admin login attempts
    pub logins: DefaultKeyedRateLimiter<IpAddr>,
    /// Free submission allowance before delays start
    pub submission_allowance: DefaultKeyedRateLimiter<IpAddr>,
    max_slow_down: Duration,
}

impl RateLimiters {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            submissions: RateLimiter::keyed(Quota::per_minute(non_zero(
                config.submissions_per_minute,
            ))),
            reads: RateLimiter::keyed(Quota::per_minute(non_zero(config.reads_per_minute))),
            logins: RateLimiter::keyed(window_quota(
                LOGIN_WINDOW,
                non_zero(config.logins_per_15_minutes),
            )),
            submission_allowance: RateLimiter::keyed(Quota::per_minute(non_zero(
                config.slow_down_after_per_minute,
            ))),
            max_slow_down: Duration::from_millis(config.slow_down_max_delay_ms),
        }
    }

    /// Delay a submission once the client has used its free allowance
    ///
    /// Returns whether the request was held back.
    pub async fn slow_down(&self, ip: IpAddr) -> bool {
        if self.submission_allowance.check_key(&ip).is_ok() {
            return false;
        }

        debug!("Slowing down submissions from {}", ip);
        let ready = self.submission_allowance.until_key_ready(&ip);
        let _ = tokio::time::timeout(self.max_slow_down, ready).await;
        true
    }
}

fn non_zero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

/// `burst` requests per `window`, replenished evenly
fn window_quota(window: Duration, burst: NonZeroU32) -> Quota {
    Quota::with_period(window / burst.get())
        .map(|quota| quota.allow_burst(burst))
        .unwrap_or_else(|| Quota::per_minute(burst))
}

/// Client address from the connection, localhost when unknown (tests)
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn check(
    limiter: Option<&DefaultKeyedRateLimiter<IpAddr>>,
    class: &str,
    request: &Request,
) -> ApiResult<()> {
    let Some(limiter) = limiter else {
        return Ok(());
    };

    let ip = client_ip(request);
    if limiter.check_key(&ip).is_err() {
        warn!("Rate limit ({}) exceeded by {} on {}", class, ip, request.uri().path());
        return Err(ApiError::RateLimited);
    }

    Ok(())
}

pub async fn limit_submissions(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if let Some(limits) = state.rate_limits.as_deref() {
        limits.slow_down(client_ip(&request)).await;
    }

    let limiter = state.rate_limits.as_ref().map(|l| &l.submissions);
    check(limiter, "submissions", &request)?;
    Ok(next.run(request).await)
}

pub async fn limit_reads(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let limiter = state.rate_limits.as_ref().map(|l| &l.reads);
    check(limiter, "reads", &request)?;
    Ok(next.run(request).await)
}

pub async fn limit_logins(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let limiter = state.rate_limits.as_ref().map(|l| &l.logins);
    check(limiter, "logins", &request)?;
    Ok(next.run(request).await)
}
