//! Compile-time defaults for a boundary search

use std::time::Duration;

/// Default maximum hop count, also the TTL of the reference probe
pub const DEFAULT_MAX_HOPS: u8 = 30;

/// Default per-probe wait in seconds
///
/// Long enough to cover one SYN retransmission (1 s initial RTO) on most
/// stacks, so a lossy path is not mistaken for a filter.
pub const DEFAULT_WAIT_SECS: f64 = 3.0;

/// Default destination service
pub const DEFAULT_SERVICE: &str = "443";

/// Default traceroute program, looked up on `PATH`
pub const DEFAULT_TRACEROUTE_PROGRAM: &str = "traceroute";

/// Default per-probe wait as a `Duration`
pub fn default_wait() -> Duration {
    Duration::from_secs_f64(DEFAULT_WAIT_SECS)
}

/// Parse a wait time given in seconds
///
/// Rejects zero, negative and non-finite values.
pub fn parse_wait_secs(secs: f64) -> Result<Duration, String> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("wait time must be a positive number of seconds, got {}", secs));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid wait time {}: {}", secs, e))
}
