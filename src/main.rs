//! fwhop - find the hop where a TCP connection gets filtered.
//!
//! This is the command-line interface for the fwhop library.

#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Result};
use clap::Parser;
use fwhop::config::{
    parse_wait_secs, DEFAULT_MAX_HOPS, DEFAULT_SERVICE, DEFAULT_TRACEROUTE_PROGRAM,
    DEFAULT_WAIT_SECS,
};
use fwhop::{
    AddressFamily, FinderConfig, FinderError, ResolvedRoute, SearchResult, TracerouteCommand,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Get the version string for fwhop
fn get_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(env!("CARGO_PKG_VERSION"), "-UNRELEASED")
    } else {
        env!("CARGO_PKG_VERSION")
    }
}

/// Command-line arguments for the boundary finder.
#[derive(Parser, Debug)]
#[clap(
    author,
    version = get_version(),
    about = "Find the hop where TCP connections to a host get filtered",
    long_about = None
)]
struct Args {
    /// Target hostname or IP address
    host: String,

    /// Target service name or port
    #[clap(default_value = DEFAULT_SERVICE)]
    service: String,

    /// Use IPv4 only
    #[clap(short = '4', long = "ipv4", conflicts_with = "ipv6")]
    ipv4: bool,

    /// Use IPv6 only
    #[clap(short = '6', long = "ipv6")]
    ipv6: bool,

    /// Maximum number of hops, also the TTL of the first probe
    #[clap(short = 'm', long, default_value_t = DEFAULT_MAX_HOPS)]
    max_hops: u8,

    /// Source address or hostname to send probes from
    #[clap(short = 's', long)]
    source: Option<String>,

    /// Seconds to wait for each connection attempt
    #[clap(short = 'w', long, default_value_t = DEFAULT_WAIT_SECS, allow_negative_numbers = true)]
    wait: f64,

    /// Traceroute program to run towards the boundary hop
    #[clap(short = 't', long, value_name = "PROGRAM", default_value = DEFAULT_TRACEROUTE_PROGRAM)]
    traceroute: PathBuf,

    /// Do not run traceroute after the search
    #[clap(long)]
    no_traceroute: bool,

    /// Only print the result and errors
    #[clap(short, long)]
    quiet: bool,

    /// Print every probe
    #[clap(short, long, conflicts_with = "quiet")]
    debug: bool,

    /// Output the result in JSON format (skips traceroute)
    #[clap(long)]
    json: bool,
}

impl Args {
    fn family(&self) -> Option<AddressFamily> {
        if self.ipv4 {
            Some(AddressFamily::V4)
        } else if self.ipv6 {
            Some(AddressFamily::V6)
        } else {
            None
        }
    }

    fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    fn to_config(&self) -> Result<FinderConfig> {
        let wait = parse_wait_secs(self.wait).map_err(|e| anyhow!(e))?;
        let mut builder = FinderConfig::builder()
            .host(&self.host)
            .service(&self.service)
            .max_hops(self.max_hops)
            .wait(wait);
        if let Some(family) = self.family() {
            builder = builder.family(family);
        }
        if let Some(source) = &self.source {
            builder = builder.source(source);
        }
        builder = if self.no_traceroute || self.json {
            builder.no_traceroute()
        } else {
            builder.traceroute(&self.traceroute)
        };
        builder
            .build()
            .map_err(|e| anyhow!("Invalid configuration - {}", e))
    }
}

/// JSON output structure for a single probe
#[derive(Debug, serde::Serialize)]
struct JsonProbe {
    ttl: u8,
    outcome: String,
    elapsed_ms: f64,
}

/// JSON output structure for the whole search
#[derive(Debug, serde::Serialize)]
struct JsonOutput {
    version: String,
    target: String,
    service: String,
    source: String,
    destination: String,
    max_hops: u8,
    boundary_ttl: u8,
    connected: bool,
    outcome: String,
    anomalies: u32,
    elapsed_ms: f64,
    probes: Vec<JsonProbe>,
}

fn init_logging(level: &str) {
    // RUST_LOG wins over the verbosity flags
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_target(false),
        )
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.log_level());

    // Single-threaded runtime; the search itself runs on a blocking thread
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: Failed to create Tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(async_main(args)) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn async_main(args: Args) -> Result<i32> {
    let config = args.to_config()?;

    let route = match fwhop::resolve_config(&config).await {
        Ok(route) => route,
        Err(e) => {
            report_finder_error(&e);
            return Ok(1);
        }
    };

    info!(
        "fwhop to {} ({}) from {}, {} max hops, {:.1} s wait",
        config.host,
        route.destination.addr,
        route.source.addr.ip(),
        config.max_hops,
        config.wait.as_secs_f64()
    );

    let search_config = config.clone();
    let result = tokio::task::spawn_blocking(move || {
        fwhop::find_boundary(&search_config, &route)
    })
    .await?;

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            report_finder_error(&e);
            return Ok(1);
        }
    };

    if args.json {
        display_json_result(&config, &route, &result)?;
    } else {
        println!("{}", format_result(&route, &result));
        info!(
            "{} probes in {:.3} s",
            result.probe_count(),
            result.total_duration.as_secs_f64()
        );
    }

    if let Some(program) = config.traceroute.as_ref().filter(|_| result.wants_traceroute()) {
        let command = TracerouteCommand::new(
            program,
            result.boundary_ttl,
            route.source,
            route.destination,
        );
        // A failed traceroute does not change the boundary already printed
        if let Err(e) = command.run().await {
            warn!("{}", e);
        }
    }

    Ok(0)
}

/// One-line summary of a search result
fn format_result(route: &ResolvedRoute, result: &SearchResult) -> String {
    if result.connected() {
        format!(
            "TTL {}: connected to {}",
            result.boundary_ttl, route.destination.addr
        )
    } else {
        format!(
            "TTL {}: failed to connect to {}: {}",
            result.boundary_ttl,
            route.destination.addr,
            result.error_code()
        )
    }
}

/// Print an error with a hint on what to check
fn report_finder_error(err: &FinderError) {
    eprintln!("Error: {}", err);
    let hint = match err {
        FinderError::ResolutionError { .. } => {
            "Please check the hostname and your network connection."
        }
        FinderError::UnknownService(_) => {
            "Use a port number or a service name listed in /etc/services."
        }
        FinderError::IncompatibleFamily { .. } => {
            "Use a source address of the same family as the target, or force one with -4/-6."
        }
        FinderError::BindFailed(_) => "The source address must belong to a local interface.",
        FinderError::HostUnreachable { .. } => {
            "The network answers 'no route to host' even at the maximum hop count."
        }
        FinderError::ConfigError(_) => "Run 'fwhop --help' for usage information.",
        _ => return,
    };
    eprintln!("{}", hint);
}

fn display_json_result(
    config: &FinderConfig,
    route: &ResolvedRoute,
    result: &SearchResult,
) -> Result<()> {
    let output = JsonOutput {
        version: get_version().to_string(),
        target: config.host.clone(),
        service: config.service.clone(),
        source: route.source.addr.ip().to_string(),
        destination: route.destination.addr.to_string(),
        max_hops: result.max_hops,
        boundary_ttl: result.boundary_ttl,
        connected: result.connected(),
        outcome: result.error_code().to_string(),
        anomalies: result.anomalies,
        elapsed_ms: result.total_duration.as_secs_f64() * 1000.0,
        probes: result
            .probes
            .iter()
            .map(|record| JsonProbe {
                ttl: record.ttl,
                outcome: record.outcome.error_code.to_string(),
                elapsed_ms: record.outcome.elapsed.as_secs_f64() * 1000.0,
            })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
