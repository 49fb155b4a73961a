//! Per-client request quotas (a daily and an hourly bucket per IP).

use crate::config::LimitsConfig;
use crate::server::router::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use governor::{
    DefaultKeyedRateLimiter, Quota,
    clock::{Clock, DefaultClock},
};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    time::Duration,
};
use tracing::warn;

use crate::server::pages;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

pub struct ClientRateLimiter {
    daily: DefaultKeyedRateLimiter<IpAddr>,
    hourly: DefaultKeyedRateLimiter<IpAddr>,
    clock: DefaultClock,
}

impl ClientRateLimiter {
    /// Builds the limiter, or `None` when limiting is disabled or a quota is zero.
    pub fn from_config(cfg: &LimitsConfig) -> Option<Self> {
        if !cfg.enabled {
            return None;
        }
        let per_day = NonZeroU32::new(cfg.per_day)?;
        let per_hour = NonZeroU32::new(cfg.per_hour)?;

        let daily = Quota::with_period(DAY / per_day.get())?.allow_burst(per_day);
        let hourly = Quota::per_hour(per_hour);

        Some(Self {
            daily: DefaultKeyedRateLimiter::keyed(daily),
            hourly: DefaultKeyedRateLimiter::keyed(hourly),
            clock: DefaultClock::default(),
        })
    }

    /// Takes one request from both buckets, or returns how long to wait.
    ///
    /// The hourly bucket goes first: a request it rejects leaves the daily
    /// bucket untouched, while one rejected by the daily bucket has still spent
    /// an hourly cell. Governor has no non-consuming probe, and an hourly cell
    /// refills far sooner than a daily one.
    pub fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        let now = self.clock.now();
        self.hourly
            .check_key(&ip)
            .map_err(|not_until| not_until.wait_time_from(now))?;
        self.daily
            .check_key(&ip)
            .map_err(|not_until| not_until.wait_time_from(now))?;
        Ok(())
    }

    /// Drops state for clients whose buckets have fully refilled.
    pub fn retain_recent(&self) {
        self.daily.retain_recent();
        self.hourly.retain_recent();
    }

    pub fn tracked_clients(&self) -> usize {
        self.daily.len()
    }
}

fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(limiter) = state.limiter.as_deref() else {
        return next.run(req).await;
    };
    if req.uri().path().starts_with("/static/") {
        return next.run(req).await;
    }

    let ip = client_ip(&req);
    match limiter.check(ip) {
        Ok(()) => next.run(req).await,
        Err(wait) => {
            warn!(client = %ip, retry_after_secs = wait.as_secs(), "Rate limit exceeded");
            let mut resp = (
                StatusCode::TOO_MANY_REQUESTS,
                Html(pages::error_page(
                    &state.config.site,
                    StatusCode::TOO_MANY_REQUESTS,
                    "Too many requests. Please try again later.",
                )),
            )
                .into_response();
            let secs = wait.as_secs().max(1).to_string();
            if let Ok(value) = HeaderValue::from_str(&secs) {
                resp.headers_mut().insert(RETRY_AFTER, value);
            }
            resp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hourly_quota_is_enforced_per_client() {
        let limiter = ClientRateLimiter::from_config(&LimitsConfig {
            enabled: true,
            per_day: 200,
            per_hour: 3,
        })
        .expect("limiter should be enabled");

        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        for _ in 0..3 {
            assert!(limiter.check(a).is_ok());
        }
        assert!(limiter.check(a).is_err());
        assert!(limiter.check(b).is_ok());
    }

    #[test]
    fn daily_quota_caps_bursts() {
        let limiter = ClientRateLimiter::from_config(&LimitsConfig {
            enabled: true,
            per_day: 2,
            per_hour: 50,
        })
        .expect("limiter should be enabled");

        let ip: IpAddr = "10.0.0.3".parse().unwrap();
        assert!(limiter.check(ip).is_ok());
        assert!(limiter.check(ip).is_ok());
        let wait = limiter.check(ip).expect_err("third request must be limited");
        assert!(wait > Duration::from_secs(60));
    }

    #[test]
    fn disabled_limits_build_nothing() {
        let cfg = LimitsConfig {
            enabled: false,
            ..LimitsConfig::default()
        };
        assert!(ClientRateLimiter::from_config(&cfg).is_none());
    }

    #[test]
    fn hourly_rejections_do_not_spend_the_daily_quota() {
        let limiter = ClientRateLimiter::from_config(&LimitsConfig {
            enabled: true,
            per_day: 2,
            per_hour: 1,
        })
        .expect("limiter should be enabled");

        let ip: IpAddr = "10.0.0.4".parse().unwrap();
        assert!(limiter.check(ip).is_ok());
        for _ in 0..5 {
            assert!(limiter.check(ip).is_err());
        }
        assert!(
            limiter.daily.check_key(&ip).is_ok(),
            "daily bucket should still hold its second cell"
        );
        assert!(limiter.daily.check_key(&ip).is_err());
    }
}
