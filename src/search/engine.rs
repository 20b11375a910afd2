//! Boundary search engine

use super::result::{ProbeRecord, SearchResult};
use super::state::{SearchState, Step};
use crate::error::FinderError;
use crate::socket::{ErrorCode, ProbeOutcome, Prober};
use std::time::Instant;
use tracing::{debug, info};

/// Bisection over `[1, max_hops]` for the hop where connect behavior changes
///
/// The engine owns its prober and runs probes strictly one after another.
///
/// # Examples
///
/// ```
/// use fwhop::{BoundarySearch, ErrorCode, FinderError, ProbeOutcome, Prober};
/// use std::time::Duration;
///
/// /// Connects from hop 7 on, times out before that.
/// struct Filtered;
///
/// impl Prober for Filtered {
///     fn probe(&mut self, ttl: u8) -> Result<ProbeOutcome, FinderError> {
///         let code = if ttl >= 7 { ErrorCode::Success } else { ErrorCode::TimedOut };
///         Ok(ProbeOutcome::new(code, Duration::ZERO))
///     }
/// }
///
/// let result = BoundarySearch::new(Filtered, 30)?.run()?;
/// assert_eq!(result.boundary_ttl, 7);
/// assert!(result.connected());
/// # Ok::<(), FinderError>(())
/// ```
pub struct BoundarySearch<P> {
    prober: P,
    max_hops: u8,
}

impl<P: Prober> BoundarySearch<P> {
    /// Create a search engine
    ///
    /// # Errors
    ///
    /// * `FinderError::ConfigError` - if `max_hops` is 0
    pub fn new(prober: P, max_hops: u8) -> Result<Self, FinderError> {
        if max_hops == 0 {
            return Err(FinderError::ConfigError(
                "max_hops must be at least 1".to_string(),
            ));
        }
        Ok(Self { prober, max_hops })
    }

    /// Run the search to completion
    ///
    /// # Errors
    ///
    /// * `FinderError::HostUnreachable` - if the reference probe reports no
    ///   route to host; nothing else is probed
    /// * any fatal error returned by the prober
    pub fn run(mut self) -> Result<SearchResult, FinderError> {
        let start_time = Instant::now();
        let mut probes = Vec::new();

        info!("Probing at {} hops for the reference outcome", self.max_hops);
        let reference = self.probe(self.max_hops, &mut probes)?;
        if reference.error_code == ErrorCode::HostUnreachable {
            return Err(FinderError::HostUnreachable { ttl: self.max_hops });
        }
        info!(
            "Reference outcome at {} hops: {}",
            self.max_hops, reference.error_code
        );

        let mut state = SearchState::new(self.max_hops, reference);
        let mut anomalies = 0;

        while !state.is_converged() {
            let ttl = state.candidate();
            let outcome = self.probe(ttl, &mut probes)?;
            let previous = state.final_outcome.error_code;

            match state.apply(ttl, outcome) {
                Step::Anomaly => {
                    anomalies += 1;
                    info!(
                        "TTL {} connected although the reference failed with \"{}\"; using it as the new reference",
                        ttl, previous
                    );
                }
                step => {
                    debug!(
                        "TTL {}: {:?}, interval now [{}, {}]",
                        ttl, step, state.low, state.high
                    );
                }
            }
            debug_assert!(state.holds_invariant(self.max_hops));
        }

        Ok(SearchResult {
            boundary_ttl: state.high,
            final_outcome: state.final_outcome,
            max_hops: self.max_hops,
            probes,
            anomalies,
            total_duration: start_time.elapsed(),
        })
    }

    fn probe(
        &mut self,
        ttl: u8,
        probes: &mut Vec<ProbeRecord>,
    ) -> Result<ProbeOutcome, FinderError> {
        let outcome = self.prober.probe(ttl)?;
        probes.push(ProbeRecord { ttl, outcome });
        Ok(outcome)
    }
}

/// Find the boundary TTL with `prober`, see [`BoundarySearch`]
pub fn search<P: Prober>(prober: P, max_hops: u8) -> Result<SearchResult, FinderError> {
    BoundarySearch::new(prober, max_hops)?.run()
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod engine_tests;
