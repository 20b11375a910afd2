//! Socket abstraction layer for TCP connect probing

use crate::error::FinderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

#[cfg(unix)]
pub mod tcp;
#[cfg(unix)]
pub mod utils;

/// Address family used for a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressFamily {
    /// IPv4 addressing
    V4,
    /// IPv6 addressing
    V6,
}

impl AddressFamily {
    /// Family of the given IP address
    pub fn of(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            AddressFamily::V4 => "IPv4",
            AddressFamily::V6 => "IPv6",
        }
    }

    /// Check whether an address belongs to this family
    pub fn matches(&self, addr: &SocketAddr) -> bool {
        AddressFamily::of(addr.ip()) == *self
    }
}

/// Resolved destination of every probe in a run
///
/// Probes always use a TCP stream socket, so the socket type is implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Family of the destination address
    pub family: AddressFamily,
    /// Destination socket address
    pub addr: SocketAddr,
}

impl Endpoint {
    /// Create an endpoint for a destination address
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            family: AddressFamily::of(addr.ip()),
            addr,
        }
    }
}

/// Local address every probe socket binds to before connecting
///
/// The port is always zero so each probe gets a fresh ephemeral port. IPv6
/// flow info and scope id are kept as the resolver returned them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBinding {
    /// Local socket address with port 0
    pub addr: SocketAddr,
}

impl SourceBinding {
    /// Create a binding for a local address, forcing the port to 0
    pub fn new(mut addr: SocketAddr) -> Self {
        addr.set_port(0);
        Self { addr }
    }

    /// Unspecified address of the given family
    pub fn unspecified(family: AddressFamily) -> Self {
        let ip = match family {
            AddressFamily::V4 => IpAddr::from([0u8; 4]),
            AddressFamily::V6 => IpAddr::from([0u16; 8]),
        };
        Self::new(SocketAddr::new(ip, 0))
    }
}

/// Classified result of one connect attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The three-way handshake completed
    Success,
    /// No answer before the deadline, or the kernel gave up (ETIMEDOUT)
    TimedOut,
    /// EHOSTUNREACH, usually an ICMP unreachable from a router
    HostUnreachable,
    /// ECONNREFUSED, a RST from the destination or a filter
    ConnectionRefused,
    /// Any other errno
    OtherOsError(i32),
}

impl ErrorCode {
    /// Classify a raw errno value, where 0 means success
    #[cfg(unix)]
    pub fn from_errno(errno: i32) -> Self {
        match errno {
            0 => ErrorCode::Success,
            libc::ETIMEDOUT => ErrorCode::TimedOut,
            libc::EHOSTUNREACH => ErrorCode::HostUnreachable,
            libc::ECONNREFUSED => ErrorCode::ConnectionRefused,
            other => ErrorCode::OtherOsError(other),
        }
    }

    /// Classify an I/O error returned by the socket layer
    #[cfg(unix)]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        match err.raw_os_error() {
            Some(errno) => Self::from_errno(errno),
            None if err.kind() == std::io::ErrorKind::TimedOut => ErrorCode::TimedOut,
            None => ErrorCode::OtherOsError(-1),
        }
    }

    /// Whether this code is the successful outcome
    pub fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Success => write!(f, "Success"),
            ErrorCode::TimedOut => write!(f, "Connection timed out"),
            ErrorCode::HostUnreachable => write!(f, "No route to host"),
            ErrorCode::ConnectionRefused => write!(f, "Connection refused"),
            ErrorCode::OtherOsError(code) => {
                write!(f, "{}", std::io::Error::from_raw_os_error(*code))
            }
        }
    }
}

/// Outcome of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// Classified result
    pub error_code: ErrorCode,
    /// Wall-clock time from just before connect to classification
    pub elapsed: Duration,
}

impl ProbeOutcome {
    /// Create an outcome
    pub fn new(error_code: ErrorCode, elapsed: Duration) -> Self {
        Self {
            error_code,
            elapsed,
        }
    }

    /// Two outcomes are equivalent when their codes match; timing is ignored
    pub fn same_class(&self, other: &ProbeOutcome) -> bool {
        self.error_code == other.error_code
    }
}

/// Something that can run one connect attempt at a given TTL
///
/// The boundary search only talks to this trait, which lets tests drive it
/// with scripted outcomes instead of a network.
pub trait Prober {
    /// Run exactly one probe at `ttl`
    ///
    /// `Err` is reserved for fatal problems that make every measurement
    /// meaningless (socket creation, bind, TTL option). Connect failures are
    /// reported inside the `ProbeOutcome`.
    fn probe(&mut self, ttl: u8) -> Result<ProbeOutcome, FinderError>;
}

impl<P: Prober + ?Sized> Prober for &mut P {
    fn probe(&mut self, ttl: u8) -> Result<ProbeOutcome, FinderError> {
        (**self).probe(ttl)
    }
}
