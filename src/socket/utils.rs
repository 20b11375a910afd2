//! Utility functions for socket operations

use std::io;
use std::os::unix::io::AsRawFd;
use std::time::{Duration, Instant};

/// Result of waiting for a socket to become writable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    /// The socket signalled writability or an error condition
    Ready,
    /// The deadline passed first
    DeadlineReached,
}

/// Block until `socket` is writable or `deadline` passes
///
/// The deadline is absolute: after an interrupted or early wake the wait is
/// re-armed with whatever time is left, so repeated signals never extend it.
pub fn wait_writable<S: AsRawFd>(socket: &S, deadline: Instant) -> io::Result<WaitResult> {
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(WaitResult::DeadlineReached);
        }

        let mut pollfd = libc::pollfd {
            fd: socket.as_raw_fd(),
            events: libc::POLLOUT,
            revents: 0,
        };
        // SAFETY: pollfd is a single valid entry that outlives the call.
        let ret = unsafe { libc::poll(&mut pollfd, 1, poll_timeout_ms(remaining)) };

        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if ret > 0 && pollfd.revents != 0 {
            return Ok(WaitResult::Ready);
        }
    }
}

/// Convert a remaining duration to a poll(2) timeout, rounding up
pub fn poll_timeout_ms(remaining: Duration) -> libc::c_int {
    let millis = remaining.as_nanos().div_ceil(1_000_000);
    libc::c_int::try_from(millis).unwrap_or(libc::c_int::MAX)
}

/// Whether a non-blocking connect error just means "still connecting"
pub fn is_connect_in_progress(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EINPROGRESS) | Some(libc::EALREADY)
    ) || err.kind() == io::ErrorKind::WouldBlock
}
