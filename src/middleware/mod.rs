//! IP-CIDR gating middleware.
//!
//! The gateway has no passwords; access control is purely network-layer.
//! The plain-HTTP listener admits loopback clients only, the TLS listener
//! admits the private RFC-1918 ranges. Both allowed ranges are IPv4-only,
//! so IPv6 peers are rejected outright.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use ipnet::IpNet;
use tracing::warn;

/// Which address ranges a listener admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePolicy {
    /// 127.0.0.0/8.
    Loopback,
    /// 192.168.0.0/16 and 10.0.0.0/8.
    PrivateNets,
}

fn loopback_net() -> IpNet {
    "127.0.0.0/8".parse().unwrap()
}

fn private_nets() -> [IpNet; 2] {
    ["192.168.0.0/16".parse().unwrap(), "10.0.0.0/8".parse().unwrap()]
}

/// Pure admission check for one peer address.
pub fn ip_allowed(policy: GatePolicy, ip: IpAddr) -> bool {
    // The allowed ranges are IPv4-only; no IPv6 peer ever matches.
    if matches!(ip, IpAddr::V6(_)) {
        return false;
    }

    match policy {
        GatePolicy::Loopback => loopback_net().contains(&ip),
        GatePolicy::PrivateNets => private_nets().iter().any(|net| net.contains(&ip)),
    }
}

/// Axum middleware enforcing [`ip_allowed`] on the connecting address.
pub async fn ip_gate(
    State(policy): State<GatePolicy>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    if !ip_allowed(policy, addr.ip()) {
        warn!(ip = %addr, path = %req.uri().path(), "connection blocked by IP gate");
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_loopback_policy() {
        assert!(ip_allowed(GatePolicy::Loopback, ip("127.0.0.1")));
        assert!(ip_allowed(GatePolicy::Loopback, ip("127.1.2.3")));

        assert!(!ip_allowed(GatePolicy::Loopback, ip("192.168.1.10")));
        assert!(!ip_allowed(GatePolicy::Loopback, ip("8.8.8.8")));
    }

    #[test]
    fn test_private_nets_policy() {
        assert!(ip_allowed(GatePolicy::PrivateNets, ip("192.168.1.10")));
        assert!(ip_allowed(GatePolicy::PrivateNets, ip("10.0.0.5")));
        assert!(ip_allowed(GatePolicy::PrivateNets, ip("10.255.255.254")));

        assert!(!ip_allowed(GatePolicy::PrivateNets, ip("127.0.0.1")));
        assert!(!ip_allowed(GatePolicy::PrivateNets, ip("172.16.0.1")));
        assert!(!ip_allowed(GatePolicy::PrivateNets, ip("8.8.8.8")));
    }

    #[test]
    fn test_ipv6_blocked_including_loopback() {
        assert!(!ip_allowed(GatePolicy::Loopback, ip("2001:db8::1")));
        assert!(!ip_allowed(GatePolicy::PrivateNets, ip("2001:db8::1")));
        assert!(!ip_allowed(GatePolicy::Loopback, ip("::1")));
        assert!(!ip_allowed(GatePolicy::PrivateNets, ip("::1")));
    }
}
