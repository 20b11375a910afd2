//! Error types for the follow-up traceroute

use std::process::ExitStatus;
use thiserror::Error;

/// Errors from running the external traceroute program
///
/// None of these invalidate the boundary that was already found.
#[derive(Debug, Error)]
pub enum TracerouteError {
    /// The program could not be started
    #[error("Cannot run {program}: {source}")]
    Spawn {
        /// Program that was invoked
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The program ran but reported failure
    #[error("{program} failed: {status}")]
    Failed {
        /// Program that was invoked
        program: String,
        /// Exit status it returned
        status: ExitStatus,
    },
}
