//! Adaptive TTL boundary search
//!
//! The search first probes at `max_hops` to learn the reference ("final")
//! outcome, then narrows `[1, max_hops]` until it finds the smallest TTL that
//! reproduces it. Candidates are picked with a geometric midpoint so that
//! short paths, where filters usually sit, are resolved with fewer probes.

pub mod engine;
pub mod result;
pub mod state;

pub use engine::{search, BoundarySearch};
pub use result::{ProbeRecord, SearchResult};
pub use state::{next_probe_ttl, SearchState, Step};
