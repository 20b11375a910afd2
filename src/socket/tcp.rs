//! Non-blocking TCP connect probe with a per-socket TTL
//!
//! Each probe is a fresh TCP stream socket: bind to the source, set the hop
//! limit, start a non-blocking connect and wait for writability against a
//! wall-clock deadline. The kernel's verdict (`SO_ERROR`) becomes the
//! outcome, so no raw sockets or privileges are needed.

use super::utils::{is_connect_in_progress, wait_writable, WaitResult};
use super::{AddressFamily, Endpoint, ErrorCode, ProbeOutcome, Prober, SourceBinding};
use crate::error::FinderError;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::time::{Duration, Instant};
use tracing::debug;

/// Prober that runs real TCP connect attempts against one destination
#[derive(Debug, Clone)]
pub struct TcpConnectProber {
    source: SourceBinding,
    destination: Endpoint,
    timeout: Duration,
}

impl TcpConnectProber {
    /// Create a prober for a resolved route
    ///
    /// # Errors
    ///
    /// * `FinderError::ConfigError` - if the timeout is zero or the source and
    ///   destination families differ
    pub fn new(
        source: SourceBinding,
        destination: Endpoint,
        timeout: Duration,
    ) -> Result<Self, FinderError> {
        if timeout.is_zero() {
            return Err(FinderError::ConfigError(
                "probe timeout must be greater than 0".to_string(),
            ));
        }
        if !destination.family.matches(&source.addr) {
            return Err(FinderError::ConfigError(format!(
                "source {} is not an {} address",
                source.addr.ip(),
                destination.family.description()
            )));
        }
        Ok(Self {
            source,
            destination,
            timeout,
        })
    }

    /// Destination this prober connects to
    pub fn destination(&self) -> &Endpoint {
        &self.destination
    }

    /// Per-probe wait time
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Prober for TcpConnectProber {
    fn probe(&mut self, ttl: u8) -> Result<ProbeOutcome, FinderError> {
        probe(&self.source, &self.destination, ttl, self.timeout)
    }
}

/// Run one TCP connect attempt with the given TTL
///
/// The socket is dropped, and therefore closed, before this returns on every
/// path.
///
/// # Errors
///
/// * `FinderError::ConfigError` - if `ttl` is 0
/// * `FinderError::SocketError` - if the socket cannot be created, bound,
///   switched to non-blocking mode or given the TTL, or if waiting for the
///   connect or reading its result fails
pub fn probe(
    source: &SourceBinding,
    destination: &Endpoint,
    ttl: u8,
    timeout: Duration,
) -> Result<ProbeOutcome, FinderError> {
    if ttl == 0 {
        return Err(FinderError::ConfigError("TTL must be at least 1".to_string()));
    }

    let socket = open_socket(source, destination, ttl)?;

    let start = Instant::now();
    let error_code = match socket.connect(&SockAddr::from(destination.addr)) {
        Ok(()) => ErrorCode::Success,
        Err(err) if is_connect_in_progress(&err) => await_connect(&socket, start + timeout)?,
        Err(err) => ErrorCode::from_io_error(&err),
    };
    let elapsed = start.elapsed();
    drop(socket);

    let outcome = ProbeOutcome::new(error_code, elapsed);
    debug!(
        "TTL {:2}: {} after {:.3} s",
        ttl,
        outcome.error_code,
        elapsed.as_secs_f64()
    );
    Ok(outcome)
}

/// Create, bind and configure a probe socket
fn open_socket(
    source: &SourceBinding,
    destination: &Endpoint,
    ttl: u8,
) -> Result<Socket, FinderError> {
    let socket = Socket::new(
        Domain::for_address(destination.addr),
        Type::STREAM,
        Some(Protocol::TCP),
    )
    .map_err(|e| FinderError::socket("create TCP socket", e))?;

    socket
        .bind(&SockAddr::from(source.addr))
        .map_err(|e| FinderError::socket(format!("bind to {}", source.addr), e))?;

    let hop_limit = match destination.family {
        AddressFamily::V4 => socket.set_ttl_v4(u32::from(ttl)),
        AddressFamily::V6 => socket.set_unicast_hops_v6(u32::from(ttl)),
    };
    hop_limit.map_err(|e| FinderError::socket(format!("set hop limit {}", ttl), e))?;

    socket
        .set_nonblocking(true)
        .map_err(|e| FinderError::socket("enable non-blocking mode", e))?;

    Ok(socket)
}

/// Wait for an in-progress connect and read its verdict
fn await_connect(socket: &Socket, deadline: Instant) -> Result<ErrorCode, FinderError> {
    classify_connect(wait_writable(socket, deadline), || socket.take_error())
}

/// Turn the wait result and the pending socket error into an outcome
///
/// Only the pending connect error is a measurement. A failing `poll` or
/// `SO_ERROR` read means nothing was measured.
fn classify_connect<F>(
    wait: io::Result<WaitResult>,
    take_error: F,
) -> Result<ErrorCode, FinderError>
where
    F: FnOnce() -> io::Result<Option<io::Error>>,
{
    match wait.map_err(|e| FinderError::socket("wait for connect", e))? {
        WaitResult::DeadlineReached => Ok(ErrorCode::TimedOut),
        WaitResult::Ready => {
            let pending = take_error().map_err(|e| FinderError::socket("read SO_ERROR", e))?;
            Ok(match pending {
                None => ErrorCode::Success,
                Some(err) => ErrorCode::from_io_error(&err),
            })
        }
    }
}
