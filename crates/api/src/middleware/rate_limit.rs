//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Two limiters, both keyed by client IP:
//! - `auth_rate_limiter`: strict, for registration and login (~10/min)
//! - `api_rate_limiter`: relaxed, for everything else (~60/min sustained)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Key extractor that trusts reverse-proxy headers, then falls back to the
/// peer address.
///
/// The peer address is only available when the server is started with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();

        // First hop of X-Forwarded-For
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        if let Some(ip) = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for registration and login: ~10 requests per minute
/// per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(6)` and `burst_size(5)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Create rate limiter for the rest of the API: 1 request per second
/// sustained per IP, burst of 50.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(1)` and `burst_size(50)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(1)
        .burst_size(50)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(50) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    #[test]
    fn test_forwarded_for_wins() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "198.51.100.2")
            .body(())
            .unwrap();
        let ip = ClientIpKeyExtractor.extract(&req).unwrap();
        assert_eq!(ip, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let mut req = Request::builder().body(()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("192.0.2.9:5000".parse::<SocketAddr>().unwrap()));
        let ip = ClientIpKeyExtractor.extract(&req).unwrap();
        assert_eq!(ip, "192.0.2.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_no_key() {
        let req = Request::builder().body(()).unwrap();
        assert!(ClientIpKeyExtractor.extract(&req).is_err());
    }
}
