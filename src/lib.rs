//! fwhop - find the hop where a TCP connection gets filtered
//!
//! This library locates the TTL at which a TCP connect attempt changes
//! behavior (for example from "timed out" to "connected"), which is where a
//! firewall sits on the path. It needs no raw sockets or elevated privileges:
//! every probe is an ordinary non-blocking `connect` with a per-socket hop
//! limit.

#[cfg(not(unix))]
compile_error!("fwhop needs a Unix socket API (poll, SO_ERROR, getservbyname)");

pub mod config;
pub mod error;
pub mod resolve;
pub mod search;
pub mod socket;
pub mod traceroute;

// Re-export core types for library users
pub use config::{FinderConfig, FinderConfigBuilder};
pub use error::FinderError;
pub use resolve::{resolve_config, resolve_route, ResolvedRoute};
pub use search::{search, BoundarySearch, ProbeRecord, SearchResult};
pub use socket::tcp::{probe, TcpConnectProber};
pub use socket::{AddressFamily, Endpoint, ErrorCode, ProbeOutcome, Prober, SourceBinding};
pub use traceroute::{TracerouteCommand, TracerouteError};

/// Find the boundary hop for a resolved route with real TCP probes
///
/// Blocks for the whole search; each probe waits at most `config.wait`.
pub fn find_boundary(
    config: &FinderConfig,
    route: &ResolvedRoute,
) -> Result<SearchResult, FinderError> {
    let prober = TcpConnectProber::new(route.source, route.destination, config.wait)?;
    search(prober, config.max_hops)
}
