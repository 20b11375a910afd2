//! Mutable state of the boundary search loop

use crate::socket::ProbeOutcome;

/// What a probe did to the search interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The probe reproduced the reference outcome, `high` moved down
    Reproduced,
    /// A closer hop connected while the reference had failed; the probe
    /// became the new reference and `high` moved down
    Anomaly,
    /// The probe did not reproduce the reference, `low` moved up
    NotReproduced,
}

/// Search interval plus the reference outcome
///
/// `low` is one more than the largest TTL known not to reproduce the
/// reference class, `high` the smallest TTL seen reproducing it. The search
/// is done once they meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchState {
    /// Lower bound of the remaining interval
    pub low: u8,
    /// Upper bound of the remaining interval, always of the reference class
    pub high: u8,
    /// Reference ("final") outcome
    pub final_outcome: ProbeOutcome,
}

impl SearchState {
    /// Start a search over `[1, max_hops]` with the outcome seen at `max_hops`
    pub fn new(max_hops: u8, final_outcome: ProbeOutcome) -> Self {
        Self {
            low: 1,
            high: max_hops,
            final_outcome,
        }
    }

    /// Whether the interval has collapsed to a single TTL
    pub fn is_converged(&self) -> bool {
        self.low == self.high
    }

    /// TTL to probe next
    ///
    /// Only meaningful while the search has not converged.
    pub fn candidate(&self) -> u8 {
        next_probe_ttl(self.low, self.high)
    }

    /// Narrow the interval with the outcome of a probe at `ttl`
    pub fn apply(&mut self, ttl: u8, outcome: ProbeOutcome) -> Step {
        if outcome.same_class(&self.final_outcome) {
            self.high = ttl;
            Step::Reproduced
        } else if outcome.error_code.is_success() {
            // `low` is not reset.
            self.final_outcome = outcome;
            self.high = ttl;
            Step::Anomaly
        } else {
            self.low = ttl + 1;
            Step::NotReproduced
        }
    }

    /// Check `1 <= low <= high <= max_hops`
    pub fn holds_invariant(&self, max_hops: u8) -> bool {
        1 <= self.low && self.low <= self.high && self.high <= max_hops
    }
}

/// Next TTL to probe inside `[low, high - 1]`
///
/// `ceil(sqrt(low * (high - 1)))`, a geometric mean that leans toward the
/// near end of the interval where filters usually sit. Requires
/// `1 <= low < high`.
pub fn next_probe_ttl(low: u8, high: u8) -> u8 {
    debug_assert!(low >= 1 && low < high, "empty interval [{low}, {high}]");
    let product = u32::from(low) * u32::from(high - 1);
    f64::from(product).sqrt().ceil() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::ErrorCode;
    use std::time::Duration;

    fn outcome(code: ErrorCode) -> ProbeOutcome {
        ProbeOutcome::new(code, Duration::from_millis(10))
    }

    #[test]
    fn test_next_probe_ttl_values() {
        assert_eq!(next_probe_ttl(1, 64), 8);
        assert_eq!(next_probe_ttl(1, 30), 6);
        assert_eq!(next_probe_ttl(1, 2), 1);
        assert_eq!(next_probe_ttl(9, 64), 24);
        assert_eq!(next_probe_ttl(254, 255), 254);
        assert_eq!(next_probe_ttl(1, 255), 16);
    }

    #[test]
    fn test_next_probe_ttl_stays_inside_interval() {
        for high in 2..=255u8 {
            for low in 1..high {
                let ttl = next_probe_ttl(low, high);
                assert!(
                    ttl >= low && ttl < high,
                    "ttl {} outside [{}, {})",
                    ttl,
                    low,
                    high
                );
            }
        }
    }

    #[test]
    fn test_apply_reproduced() {
        let mut state = SearchState::new(30, outcome(ErrorCode::TimedOut));
        assert_eq!(state.apply(6, outcome(ErrorCode::TimedOut)), Step::Reproduced);
        assert_eq!((state.low, state.high), (1, 6));
    }

    #[test]
    fn test_apply_not_reproduced() {
        let mut state = SearchState::new(30, outcome(ErrorCode::Success));
        assert_eq!(
            state.apply(6, outcome(ErrorCode::TimedOut)),
            Step::NotReproduced
        );
        assert_eq!((state.low, state.high), (7, 30));
        assert_eq!(state.final_outcome.error_code, ErrorCode::Success);
    }

    #[test]
    fn test_apply_anomaly_keeps_low() {
        let mut state = SearchState::new(30, outcome(ErrorCode::TimedOut));
        state.low = 4;
        assert_eq!(state.apply(11, outcome(ErrorCode::Success)), Step::Anomaly);
        assert_eq!((state.low, state.high), (4, 11));
        assert_eq!(state.final_outcome.error_code, ErrorCode::Success);
    }

    #[test]
    fn test_refused_reference_is_not_an_anomaly_target() {
        // A different failure below a refused reference just raises `low`.
        let mut state = SearchState::new(10, outcome(ErrorCode::ConnectionRefused));
        assert_eq!(
            state.apply(3, outcome(ErrorCode::HostUnreachable)),
            Step::NotReproduced
        );
        assert_eq!(state.low, 4);
    }

    #[test]
    fn test_single_hop_is_converged() {
        let state = SearchState::new(1, outcome(ErrorCode::Success));
        assert!(state.is_converged());
        assert!(state.holds_invariant(1));
    }
}
