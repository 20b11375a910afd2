//! Follow-up traceroute to the boundary hop
//!
//! Once the boundary is known, an ordinary unprivileged traceroute bounded
//! to that many hops usually names the device that filters the connection.

pub mod command;
pub mod error;

pub use command::TracerouteCommand;
pub use error::TracerouteError;
