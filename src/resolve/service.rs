//! TCP service name lookup

use crate::error::FinderError;
use std::ffi::CString;

/// Resolve a service given as a port number or a TCP service name
///
/// Names are looked up in the system services database (`/etc/services` or
/// NSS) for protocol `tcp`.
///
/// # Errors
///
/// * `FinderError::UnknownService` - if the service is neither a port
///   number nor a known TCP service
pub fn resolve_port(service: &str) -> Result<u16, FinderError> {
    if let Ok(port) = service.parse::<u16>() {
        return Ok(port);
    }
    lookup_tcp_service(service).ok_or_else(|| FinderError::UnknownService(service.to_string()))
}

fn lookup_tcp_service(name: &str) -> Option<u16> {
    if name.is_empty() {
        return None;
    }
    let name = CString::new(name).ok()?;
    let proto = c"tcp";

    // SAFETY: both arguments are valid NUL-terminated strings. The returned
    // entry points into libc's static storage and is read before any other
    // services database call can overwrite it.
    let port = unsafe {
        let entry = libc::getservbyname(name.as_ptr(), proto.as_ptr());
        if entry.is_null() {
            return None;
        }
        (*entry).s_port
    };

    // s_port holds the port in network byte order in its low 16 bits
    Some(u16::from_be(port as u16))
}
