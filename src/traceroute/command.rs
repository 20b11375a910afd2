//! External traceroute invocation

use super::error::TracerouteError;
use crate::socket::{AddressFamily, Endpoint, SourceBinding};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

/// A traceroute run bounded to the boundary hop
#[derive(Debug, Clone)]
pub struct TracerouteCommand {
    program: PathBuf,
    max_ttl: u8,
    source: SourceBinding,
    destination: Endpoint,
}

impl TracerouteCommand {
    /// Build the command for a resolved route and boundary TTL
    pub fn new(
        program: impl Into<PathBuf>,
        max_ttl: u8,
        source: SourceBinding,
        destination: Endpoint,
    ) -> Self {
        Self {
            program: program.into(),
            max_ttl,
            source,
            destination,
        }
    }

    /// Program that will be executed
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Command line arguments, numeric output only
    pub fn args(&self) -> Vec<OsString> {
        let family = match self.destination.family {
            AddressFamily::V4 => "-4",
            AddressFamily::V6 => "-6",
        };
        vec![
            "-n".into(),
            family.into(),
            "-s".into(),
            self.source.addr.ip().to_string().into(),
            "-m".into(),
            self.max_ttl.to_string().into(),
            self.destination.addr.ip().to_string().into(),
        ]
    }

    /// Run the program, letting it write straight to our stdout and stderr
    ///
    /// # Errors
    ///
    /// * `TracerouteError::Spawn` - the program could not be started
    /// * `TracerouteError::Failed` - it exited unsuccessfully
    pub async fn run(&self) -> Result<(), TracerouteError> {
        let program = self.program.display().to_string();
        let args = self.args();
        info!(
            "Running {} {}",
            program,
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| TracerouteError::Spawn {
                program: program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(TracerouteError::Failed { program, status })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4_command(program: &str) -> TracerouteCommand {
        TracerouteCommand::new(
            program,
            7,
            SourceBinding::new("192.168.1.10:0".parse().unwrap()),
            Endpoint::new("203.0.113.5:443".parse().unwrap()),
        )
    }

    #[test]
    fn test_args_ipv4() {
        let command = v4_command("traceroute");
        let args: Vec<String> = command
            .args()
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect();
        assert_eq!(
            args,
            vec!["-n", "-4", "-s", "192.168.1.10", "-m", "7", "203.0.113.5"]
        );
        assert_eq!(command.program(), Path::new("traceroute"));
    }

    #[test]
    fn test_args_ipv6() {
        let command = TracerouteCommand::new(
            "/usr/bin/traceroute",
            12,
            SourceBinding::new("[2001:db8::10]:0".parse().unwrap()),
            Endpoint::new("[2001:db8::1]:80".parse().unwrap()),
        );
        let args = command.args();
        assert_eq!(args[1], "-6");
        assert_eq!(args[3], "2001:db8::10");
        assert_eq!(args[5], "12");
        assert_eq!(args[6], "2001:db8::1");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let command = v4_command("/nonexistent/fwhop-traceroute");
        let err = command.run().await.unwrap_err();
        assert!(matches!(err, TracerouteError::Spawn { .. }));
        assert!(err.to_string().starts_with("Cannot run /nonexistent/fwhop-traceroute"));
    }

    #[tokio::test]
    async fn test_exit_status() {
        // `true` and `false` ignore their arguments
        assert!(v4_command("true").run().await.is_ok());

        let err = v4_command("false").run().await.unwrap_err();
        assert!(matches!(err, TracerouteError::Failed { ref status, .. } if !status.success()));
    }
}
