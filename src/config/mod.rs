//! Configuration types for boundary searches

pub mod defaults;

use crate::socket::AddressFamily;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use defaults::{
    parse_wait_secs, DEFAULT_MAX_HOPS, DEFAULT_SERVICE, DEFAULT_TRACEROUTE_PROGRAM,
    DEFAULT_WAIT_SECS,
};

/// Configuration for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinderConfig {
    /// Destination hostname or IP address
    pub host: String,
    /// Destination service name or port (default: 443)
    pub service: String,
    /// Forced address family, if any
    pub family: Option<AddressFamily>,
    /// Source address override
    pub source: Option<String>,
    /// Maximum number of hops (default: 30)
    pub max_hops: u8,
    /// Per-probe wait time (default: 3 s)
    pub wait: Duration,
    /// Traceroute program to run after the search, `None` to skip it
    pub traceroute: Option<PathBuf>,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            service: DEFAULT_SERVICE.to_string(),
            family: None,
            source: None,
            max_hops: DEFAULT_MAX_HOPS,
            wait: defaults::default_wait(),
            traceroute: Some(PathBuf::from(DEFAULT_TRACEROUTE_PROGRAM)),
        }
    }
}

impl FinderConfig {
    /// Create a new FinderConfig builder
    pub fn builder() -> FinderConfigBuilder {
        FinderConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("Host must be specified".to_string());
        }
        if self.service.is_empty() {
            return Err("Service must be specified".to_string());
        }
        if self.max_hops < 1 {
            return Err("max_hops must be between 1 and 255".to_string());
        }
        if self.wait.is_zero() {
            return Err("wait time must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Builder for FinderConfig
pub struct FinderConfigBuilder {
    config: FinderConfig,
}

impl FinderConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: FinderConfig::default(),
        }
    }

    /// Set the destination host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the destination service name or port
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.config.service = service.into();
        self
    }

    /// Force an address family
    pub fn family(mut self, family: AddressFamily) -> Self {
        self.config.family = Some(family);
        self
    }

    /// Set the source address override
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.config.source = Some(source.into());
        self
    }

    /// Set the maximum number of hops
    pub fn max_hops(mut self, hops: u8) -> Self {
        self.config.max_hops = hops;
        self
    }

    /// Set the per-probe wait time
    pub fn wait(mut self, wait: Duration) -> Self {
        self.config.wait = wait;
        self
    }

    /// Set the traceroute program
    pub fn traceroute(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.traceroute = Some(program.into());
        self
    }

    /// Do not run a traceroute after the search
    pub fn no_traceroute(mut self) -> Self {
        self.config.traceroute = None;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<FinderConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for FinderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FinderConfig::default();
        assert_eq!(config.service, "443");
        assert_eq!(config.max_hops, 30);
        assert_eq!(config.wait, Duration::from_secs(3));
        assert_eq!(config.family, None);
        assert_eq!(config.traceroute, Some(PathBuf::from("traceroute")));
    }

    #[test]
    fn test_config_builder() {
        let config = FinderConfig::builder()
            .host("example.com")
            .service("ssh")
            .family(AddressFamily::V6)
            .source("2001:db8::10")
            .max_hops(64)
            .wait(Duration::from_millis(500))
            .traceroute("/usr/sbin/traceroute")
            .build()
            .unwrap();

        assert_eq!(config.host, "example.com");
        assert_eq!(config.service, "ssh");
        assert_eq!(config.family, Some(AddressFamily::V6));
        assert_eq!(config.source.as_deref(), Some("2001:db8::10"));
        assert_eq!(config.max_hops, 64);
        assert_eq!(config.wait.as_millis(), 500);
        assert_eq!(
            config.traceroute,
            Some(PathBuf::from("/usr/sbin/traceroute"))
        );

        let config = FinderConfig::builder()
            .host("example.com")
            .no_traceroute()
            .build()
            .unwrap();
        assert!(config.traceroute.is_none());
    }

    #[test]
    fn test_config_validation() {
        // Empty host
        assert!(FinderConfig::builder().build().is_err());

        // Zero hops
        let result = FinderConfig::builder()
            .host("example.com")
            .max_hops(0)
            .build();
        assert!(result.is_err());

        // Zero wait
        let result = FinderConfig::builder()
            .host("example.com")
            .wait(Duration::ZERO)
            .build();
        assert!(result.is_err());

        // Empty service
        let result = FinderConfig::builder()
            .host("example.com")
            .service("")
            .build();
        assert!(result.is_err());

        // Full TTL range is allowed
        let result = FinderConfig::builder()
            .host("example.com")
            .max_hops(255)
            .build();
        assert!(result.is_ok());
    }
}
