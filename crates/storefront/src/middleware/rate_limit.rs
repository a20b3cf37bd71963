//! Per-IP rate limiting for credential endpoints (login, signup, password
//! recovery), using governor and `tower_governor`.
//!
//! The client is the socket peer unless the deployment opts into trusting
//! forwarding headers set by its reverse proxy.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Keys requests by client IP.
#[derive(Clone, Copy, Debug)]
pub struct ClientIpKeyExtractor {
    trust_proxy_headers: bool,
}

impl ClientIpKeyExtractor {
    /// Only the socket peer address counts; forwarding headers are ignored.
    #[must_use]
    pub const fn peer_only() -> Self {
        Self {
            trust_proxy_headers: false,
        }
    }

    /// Proxy headers first, then the socket peer address.
    #[must_use]
    pub const fn behind_proxy() -> Self {
        Self {
            trust_proxy_headers: true,
        }
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let forwarded = if self.trust_proxy_headers {
            ip_from_headers(req.headers())
        } else {
            None
        };

        forwarded
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

fn ip_from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    let header_ip = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };

    header_ip("cf-connecting-ip")
        .or_else(|| {
            // First hop of X-Forwarded-For is the original client.
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
        .or_else(|| header_ip("x-real-ip"))
        .or_else(|| header_ip("fly-client-ip"))
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Rate limiter for credential endpoints: ~10 requests per minute per IP.
///
/// One token every 6 seconds, burst of 5. With `trust_proxy_headers` unset
/// the key is the socket peer, so rotating `X-Forwarded-For` does not earn
/// a fresh bucket.
///
/// # Panics
///
/// Never in practice: `per_second(6)` and `burst_size(5)` are valid positive
/// values for `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter(trust_proxy_headers: bool) -> RateLimiterLayer {
    let extractor = if trust_proxy_headers {
        ClientIpKeyExtractor::behind_proxy()
    } else {
        ClientIpKeyExtractor::peer_only()
    };
    let config = GovernorConfigBuilder::default()
        .key_extractor(extractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    const PEER: &str = "192.0.2.9:51000";

    fn request(headers: &[(&'static str, &'static str)]) -> Request<()> {
        let mut req = Request::new(());
        for (name, value) in headers {
            req.headers_mut()
                .insert(*name, HeaderValue::from_static(value));
        }
        req
    }

    fn from_peer(headers: &[(&'static str, &'static str)]) -> Request<()> {
        let mut req = request(headers);
        let addr: SocketAddr = PEER.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    #[test]
    fn test_headers_ignored_by_default() {
        let req = from_peer(&[
            ("x-forwarded-for", "198.51.100.4"),
            ("cf-connecting-ip", "203.0.113.7"),
            ("x-real-ip", "203.0.113.8"),
        ]);
        let ip = ClientIpKeyExtractor::peer_only().extract(&req).unwrap();
        assert_eq!(ip, "192.0.2.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_headers_alone_are_not_a_key_by_default() {
        let req = request(&[("x-forwarded-for", "198.51.100.4")]);
        assert!(ClientIpKeyExtractor::peer_only().extract(&req).is_err());
    }

    #[test]
    fn test_cloudflare_header_wins_behind_proxy() {
        let req = from_peer(&[
            ("x-forwarded-for", "10.0.0.1, 10.0.0.2"),
            ("cf-connecting-ip", "203.0.113.7"),
        ]);
        let ip = ClientIpKeyExtractor::behind_proxy().extract(&req).unwrap();
        assert_eq!(ip, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_forwarded_for_first_hop_behind_proxy() {
        let req = from_peer(&[("x-forwarded-for", "198.51.100.4, 10.0.0.2")]);
        let ip = ClientIpKeyExtractor::behind_proxy().extract(&req).unwrap();
        assert_eq!(ip, "198.51.100.4".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_unparseable_header_falls_back_to_peer() {
        let req = from_peer(&[("x-forwarded-for", "unknown")]);
        let ip = ClientIpKeyExtractor::behind_proxy().extract(&req).unwrap();
        assert_eq!(ip, "192.0.2.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_no_source_is_an_error() {
        for extractor in [
            ClientIpKeyExtractor::peer_only(),
            ClientIpKeyExtractor::behind_proxy(),
        ] {
            assert!(extractor.extract(&request(&[])).is_err());
        }
    }
}
