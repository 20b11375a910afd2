//! Destination and source address resolution
//!
//! Turns a host, a service and an optional source into the single
//! `(SourceBinding, Endpoint)` pair every probe of a run uses. Host names go
//! through the system resolver (`tokio::net::lookup_host`); the source is
//! chosen by connecting a throwaway UDP socket, which asks the kernel for a
//! route without sending anything.

pub mod service;

use crate::config::FinderConfig;
use crate::error::FinderError;
use crate::socket::{AddressFamily, Endpoint, SourceBinding};
use serde::{Deserialize, Serialize};
use socket2::{Domain, SockAddr, Socket, Type};
use std::io;
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

pub use service::resolve_port;

/// Addresses a run probes between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRoute {
    /// Local address probes bind to
    pub source: SourceBinding,
    /// Destination probes connect to
    pub destination: Endpoint,
}

/// Resolve the route for a configuration
pub async fn resolve_config(config: &FinderConfig) -> Result<ResolvedRoute, FinderError> {
    resolve_route(
        &config.host,
        &config.service,
        config.family,
        config.source.as_deref(),
    )
    .await
}

/// Resolve `host` and `service` into one routable source/destination pair
///
/// Destination candidates are tried in resolver order. Without `source`, the
/// first destination the kernel has a route for wins and the local address
/// it would use becomes the source. With `source`, only same-family pairs are
/// considered.
///
/// # Errors
///
/// * `FinderError::UnknownService` - bad service name
/// * `FinderError::ResolutionError` - host or source does not resolve, or
///   has no address of the forced family
/// * `FinderError::IncompatibleFamily` - no source and destination share a
///   family
/// * `FinderError::BindFailed` - no source address could be bound
/// * `FinderError::NoRoute` - no destination address is routable
pub async fn resolve_route(
    host: &str,
    service: &str,
    family: Option<AddressFamily>,
    source: Option<&str>,
) -> Result<ResolvedRoute, FinderError> {
    let port = resolve_port(service)?;
    let destinations = lookup_addrs(host, port, family).await?;
    debug!(
        "{} resolved to {} address(es): {:?}",
        host,
        destinations.len(),
        destinations
    );

    match source {
        None => select_route(host, &destinations),
        Some(source) => {
            let sources = lookup_addrs(source, 0, family).await?;
            select_route_from(host, source, &destinations, &sources)
        }
    }
}

/// Resolve a host or literal address, keeping only the forced family
async fn lookup_addrs(
    host: &str,
    port: u16,
    family: Option<AddressFamily>,
) -> Result<Vec<SocketAddr>, FinderError> {
    let resolved: Vec<SocketAddr> = match host.parse::<IpAddr>() {
        Ok(ip) => vec![SocketAddr::new(ip, port)],
        Err(_) => tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| FinderError::ResolutionError {
                host: host.to_string(),
                reason: e.to_string(),
            })?
            .collect(),
    };

    let mut addrs = Vec::with_capacity(resolved.len());
    for addr in resolved {
        let wanted = family.is_none_or(|f| f.matches(&addr));
        if wanted && !addrs.contains(&addr) {
            addrs.push(addr);
        }
    }

    if addrs.is_empty() {
        let reason = match family {
            Some(f) => format!("no {} address", f.description()),
            None => "no address".to_string(),
        };
        return Err(FinderError::ResolutionError {
            host: host.to_string(),
            reason,
        });
    }
    Ok(addrs)
}

/// Pick the first destination with a route, letting the kernel choose the source
fn select_route(host: &str, destinations: &[SocketAddr]) -> Result<ResolvedRoute, FinderError> {
    for destination in destinations {
        match kernel_source(None, destination) {
            Ok(local) => return Ok(route(local, *destination)),
            Err(e) => debug!("No route to {}: {}", destination, e),
        }
    }
    Err(FinderError::NoRoute {
        host: host.to_string(),
        source_addr: None,
    })
}

/// Pick the first same-family source and destination pair that binds and routes
fn select_route_from(
    host: &str,
    source: &str,
    destinations: &[SocketAddr],
    sources: &[SocketAddr],
) -> Result<ResolvedRoute, FinderError> {
    let mut tried = 0;
    let mut binds = 0;

    for destination in destinations {
        for candidate in sources
            .iter()
            .filter(|s| s.is_ipv4() == destination.is_ipv4())
        {
            tried += 1;
            match kernel_source(Some(candidate), destination) {
                Ok(local) => return Ok(route(local, *destination)),
                Err(e) if e.bound() => {
                    binds += 1;
                    debug!("No route from {} to {}: {}", candidate, destination, e);
                }
                Err(e) => debug!("Cannot bind to {}: {}", candidate, e),
            }
        }
    }

    if tried == 0 {
        Err(FinderError::IncompatibleFamily {
            host: host.to_string(),
            source_addr: source.to_string(),
        })
    } else if binds == 0 {
        Err(FinderError::BindFailed(source.to_string()))
    } else {
        Err(FinderError::NoRoute {
            host: host.to_string(),
            source_addr: Some(source.to_string()),
        })
    }
}

fn route(local: SocketAddr, destination: SocketAddr) -> ResolvedRoute {
    ResolvedRoute {
        source: SourceBinding::new(local),
        destination: Endpoint::new(destination),
    }
}

/// Which step of the route lookup failed
#[derive(Debug)]
enum RouteError {
    Socket(io::Error),
    Bind(io::Error),
    Connect(io::Error),
}

impl RouteError {
    /// Whether the source was bound before the failure
    fn bound(&self) -> bool {
        matches!(self, RouteError::Connect(_))
    }
}

impl std::fmt::Display for RouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteError::Socket(e) | RouteError::Bind(e) | RouteError::Connect(e) => {
                write!(f, "{}", e)
            }
        }
    }
}

/// Local address the kernel picks for traffic to `destination`
///
/// Connecting a UDP socket only performs a route lookup; no packet is sent.
fn kernel_source(
    bind: Option<&SocketAddr>,
    destination: &SocketAddr,
) -> Result<SocketAddr, RouteError> {
    let socket = Socket::new(Domain::for_address(*destination), Type::DGRAM, None)
        .map_err(RouteError::Socket)?;
    if let Some(bind) = bind {
        socket
            .bind(&SockAddr::from(*bind))
            .map_err(RouteError::Bind)?;
    }
    socket
        .connect(&SockAddr::from(*destination))
        .map_err(RouteError::Connect)?;
    socket
        .local_addr()
        .map_err(RouteError::Connect)?
        .as_socket()
        .ok_or_else(|| {
            RouteError::Connect(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "local address is not an IP socket address",
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_literal_ipv4_route() {
        let route = resolve_route("127.0.0.1", "8080", None, None).await.unwrap();
        assert_eq!(route.destination.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(route.destination.family, AddressFamily::V4);
        assert_eq!(route.source.addr, "127.0.0.1:0".parse().unwrap());
    }

    #[tokio::test]
    async fn test_explicit_source() {
        let route = resolve_route("127.0.0.1", "443", Some(AddressFamily::V4), Some("127.0.0.1"))
            .await
            .unwrap();
        assert_eq!(route.source.addr.port(), 0);
        assert_eq!(route.source.addr.ip(), "127.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(route.destination.addr.port(), 443);
    }

    #[tokio::test]
    async fn test_localhost_name_forced_v4() {
        let route = resolve_route("localhost", "22", Some(AddressFamily::V4), None)
            .await
            .unwrap();
        assert!(route.destination.addr.ip().is_loopback());
        assert_eq!(route.destination.family, AddressFamily::V4);
    }

    #[tokio::test]
    async fn test_forced_family_mismatch() {
        let err = resolve_route("127.0.0.1", "443", Some(AddressFamily::V6), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FinderError::ResolutionError { ref reason, .. } if reason == "no IPv6 address"));
    }

    #[tokio::test]
    async fn test_incompatible_source_family() {
        let err = resolve_route("::1", "443", None, Some("127.0.0.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, FinderError::IncompatibleFamily { .. }));
    }

    #[tokio::test]
    async fn test_unbindable_source() {
        // TEST-NET-1 is never a local address
        let err = resolve_route("127.0.0.1", "443", None, Some("192.0.2.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, FinderError::BindFailed(ref s) if s == "192.0.2.1"));
    }

    #[tokio::test]
    async fn test_unknown_service_reported_first() {
        let err = resolve_route("127.0.0.1", "no-such-service-fwhop", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FinderError::UnknownService(_)));
    }

    #[tokio::test]
    async fn test_unresolvable_host() {
        let err = resolve_route("nonexistent.invalid", "443", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FinderError::ResolutionError { ref host, .. } if host == "nonexistent.invalid"));
    }

    #[test]
    fn test_kernel_source_picks_loopback() {
        let local = kernel_source(None, &"127.0.0.1:9".parse().unwrap()).unwrap();
        assert!(local.ip().is_loopback());
        assert_ne!(local.port(), 0);
    }

    #[test]
    fn test_only_bound_failures_count_as_binds() {
        let err = || io::Error::from_raw_os_error(libc::EAFNOSUPPORT);
        assert!(!RouteError::Socket(err()).bound());
        assert!(!RouteError::Bind(err()).bound());
        assert!(RouteError::Connect(err()).bound());
    }

    #[test]
    fn test_unbindable_source_with_several_destinations() {
        // Neither candidate pair gets past bind, so the error names the source
        let destinations: Vec<SocketAddr> =
            vec!["127.0.0.1:443".parse().unwrap(), "127.0.0.2:443".parse().unwrap()];
        let sources: Vec<SocketAddr> = vec!["192.0.2.1:0".parse().unwrap()];
        let err = select_route_from("example.test", "192.0.2.1", &destinations, &sources)
            .unwrap_err();
        assert!(matches!(err, FinderError::BindFailed(ref s) if s == "192.0.2.1"));
    }
}
