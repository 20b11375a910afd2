//! Error types for boundary discovery
//!
//! Everything here means "could not measure". A probe that measured a
//! failure (timeout, refusal, ...) is a [`crate::ProbeOutcome`], never an
//! error.

use thiserror::Error;

/// Fatal errors that abort a run
///
/// # Examples
///
/// ```
/// # use fwhop::FinderError;
/// fn handle_error(err: FinderError) {
///     match err {
///         FinderError::HostUnreachable { ttl } => {
///             eprintln!("Unreachable even at {} hops", ttl);
///         }
///         FinderError::ResolutionError { host, reason } => {
///             eprintln!("DNS resolution of {} failed: {}", host, reason);
///         }
///         _ => eprintln!("Boundary search failed: {}", err),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum FinderError {
    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The service is neither a port number nor a known TCP service name
    #[error("Unknown TCP service '{0}'")]
    UnknownService(String),

    /// DNS resolution failed
    #[error("Cannot resolve '{host}': {reason}")]
    ResolutionError {
        /// Name that failed to resolve
        host: String,
        /// Resolver message
        reason: String,
    },

    /// No source address shares a family with any destination address
    #[error("Address family of '{host}' is incompatible with '{source_addr}'")]
    IncompatibleFamily {
        /// Destination host as given
        host: String,
        /// Source address as given
        source_addr: String,
    },

    /// Every candidate source address failed to bind
    #[error("Cannot bind to any address of '{0}'")]
    BindFailed(String),

    /// No destination address could be routed to
    #[error("Cannot connect to any address of '{host}'{}", from_source(.source_addr))]
    NoRoute {
        /// Destination host as given
        host: String,
        /// Source address as given, if any
        source_addr: Option<String>,
    },

    /// Socket setup failed before a connect could be attempted
    ///
    /// This covers socket creation, binding and the TTL option, all of which
    /// would invalidate every later measurement.
    #[error("Failed to {context}: {source}")]
    SocketError {
        /// What was being attempted
        context: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The reference probe was answered with "no route to host"
    ///
    /// Some networks return this code at every TTL, so no boundary can be
    /// located.
    #[error("Host unreachable at {ttl} hops, no boundary can be located")]
    HostUnreachable {
        /// Hop count of the reference probe
        ttl: u8,
    },
}

impl FinderError {
    /// Wrap an I/O error from socket setup
    pub fn socket(context: impl Into<String>, source: std::io::Error) -> Self {
        FinderError::SocketError {
            context: context.into(),
            source,
        }
    }
}

fn from_source(source_addr: &Option<String>) -> String {
    match source_addr {
        Some(source) => format!(" from any address of '{}'", source),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = FinderError::NoRoute {
            host: "example.com".to_string(),
            source_addr: None,
        };
        assert_eq!(err.to_string(), "Cannot connect to any address of 'example.com'");

        let err = FinderError::NoRoute {
            host: "example.com".to_string(),
            source_addr: Some("10.0.0.1".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Cannot connect to any address of 'example.com' from any address of '10.0.0.1'"
        );

        let err = FinderError::HostUnreachable { ttl: 30 };
        assert!(err.to_string().contains("30 hops"));
    }

    #[test]
    fn test_socket_error_keeps_source() {
        use std::error::Error;

        let err = FinderError::socket(
            "set TTL",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(err.to_string().starts_with("Failed to set TTL"));
        assert!(err.source().is_some());
    }
}
