//! Result types for boundary searches

use crate::socket::{ErrorCode, ProbeOutcome};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One probe issued during a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeRecord {
    /// TTL the probe was sent with
    pub ttl: u8,
    /// What the probe observed
    pub outcome: ProbeOutcome,
}

/// Result of a boundary search
///
/// # Examples
///
/// ```
/// # use fwhop::{ErrorCode, ProbeOutcome, ProbeRecord, SearchResult};
/// # use std::time::Duration;
/// let reference = ProbeOutcome::new(ErrorCode::Success, Duration::from_millis(12));
/// let result = SearchResult {
///     boundary_ttl: 1,
///     final_outcome: reference,
///     max_hops: 1,
///     probes: vec![ProbeRecord { ttl: 1, outcome: reference }],
///     anomalies: 0,
///     total_duration: Duration::from_millis(12),
/// };
///
/// assert!(result.connected());
/// assert_eq!(result.probe_count(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Smallest TTL that reproduces the final outcome
    pub boundary_ttl: u8,
    /// Reference outcome the boundary was searched for
    pub final_outcome: ProbeOutcome,
    /// Hop count of the first, reference probe
    pub max_hops: u8,
    /// Every probe in the order it was sent
    pub probes: Vec<ProbeRecord>,
    /// How many times a closer hop connected and replaced the reference
    pub anomalies: u32,
    /// Wall-clock duration of the whole search
    pub total_duration: Duration,
}

impl SearchResult {
    /// Whether the final outcome is a completed connection
    pub fn connected(&self) -> bool {
        self.final_outcome.error_code.is_success()
    }

    /// Number of probes sent, including the reference probe
    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    /// Code of the final outcome
    pub fn error_code(&self) -> ErrorCode {
        self.final_outcome.error_code
    }

    /// Most recent probe sent at the boundary TTL
    pub fn boundary_probe(&self) -> Option<&ProbeRecord> {
        self.probes
            .iter()
            .rev()
            .find(|record| record.ttl == self.boundary_ttl)
    }

    /// Whether an external traceroute could identify the device at the boundary
    ///
    /// A completed connection has no filter to find, and a refusal is a
    /// definitive answer from whoever sent the RST.
    pub fn wants_traceroute(&self) -> bool {
        !matches!(
            self.final_outcome.error_code,
            ErrorCode::Success | ErrorCode::ConnectionRefused
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ttl: u8, code: ErrorCode) -> ProbeRecord {
        ProbeRecord {
            ttl,
            outcome: ProbeOutcome::new(code, Duration::from_millis(u64::from(ttl))),
        }
    }

    fn create_test_result(code: ErrorCode) -> SearchResult {
        SearchResult {
            boundary_ttl: 3,
            final_outcome: ProbeOutcome::new(code, Duration::from_millis(30)),
            max_hops: 10,
            probes: vec![
                record(10, code),
                record(3, code),
                record(2, ErrorCode::TimedOut),
            ],
            anomalies: 0,
            total_duration: Duration::from_millis(120),
        }
    }

    #[test]
    fn test_accessors() {
        let result = create_test_result(ErrorCode::ConnectionRefused);
        assert!(!result.connected());
        assert_eq!(result.probe_count(), 3);
        assert_eq!(result.error_code(), ErrorCode::ConnectionRefused);
        assert_eq!(result.boundary_probe().map(|r| r.ttl), Some(3));
    }

    #[test]
    fn test_traceroute_policy() {
        assert!(!create_test_result(ErrorCode::Success).wants_traceroute());
        assert!(!create_test_result(ErrorCode::ConnectionRefused).wants_traceroute());
        assert!(create_test_result(ErrorCode::TimedOut).wants_traceroute());
        assert!(create_test_result(ErrorCode::OtherOsError(101)).wants_traceroute());
    }

    #[test]
    fn test_serializes_to_json() {
        let result = create_test_result(ErrorCode::TimedOut);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["boundary_ttl"], 3);
        assert_eq!(json["final_outcome"]["error_code"], "TimedOut");
        assert_eq!(json["probes"].as_array().map(Vec::len), Some(3));
    }
}
