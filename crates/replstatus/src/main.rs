//! replstatus entry point.
//!
//! Runs next to a replicated database node and answers every TCP connection
//! with `MASTER`, `STANDBY` or `OFFLINE`, so that proxies such as HAProxy can
//! route writes and reads with a plain TCP check.
//!
//! # Usage
//!
//! ```text
//! replstatus [serve] [OPTIONS]
//!   --config <FILE>          TOML configuration file
//!   --port <PORT>            listener port [default: 5400]
//!   --bind <ADDR>            IPv4 address to bind; empty binds all interfaces
//!   --status-file <FILE>     JSON replication state published by the engine
//!   --supervisor <MODE>      parent | pid:<n> | none [default: parent]
//!   --assume-primary         ignore any status file and always answer MASTER
//!
//! One of --status-file (or its variable or file key) and --assume-primary
//! is required.
//!
//! replstatus probe [--host H] [--port P] [--max-delay SECS]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                  | Flag             |
//! |---------------------------|------------------|
//! | `REPLSTATUS_CONFIG`       | `--config`       |
//! | `REPLSTATUS_PORT`         | `--port`         |
//! | `REPLSTATUS_BIND`         | `--bind`         |
//! | `REPLSTATUS_STATUS_FILE`  | `--status-file`  |
//! | `REPLSTATUS_SUPERVISOR`   | `--supervisor`   |
//!
//! Flags and variables override the configuration file, which overrides the
//! built-in defaults.
//!
//! # Exit status
//!
//! `serve`: 0 after a requested shutdown, 1 on a startup failure or when the
//! supervising process disappears.
//! `probe`: 0 for `MASTER`/`STANDBY`, 2 for `OFFLINE`, 1 on a failed query.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use replstatus::application::{FixedSource, ReplicationSource};
use replstatus::domain::config::DEFAULT_PORT;
use replstatus::domain::{ConfigError, ConfigOverrides, ServerConfig, SupervisorMode};
use replstatus::infrastructure::{
    load_config_file, query_status, spawn_signal_listener, watch_for, EventLoop, LoopExit,
    Shutdown, StatusFileSource,
};
use replstatus_core::ReplicationSnapshot;

/// Probe exit status when the node must not receive traffic.
const PROBE_NOT_ROUTABLE: i32 = 2;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Replication status oracle for TCP load balancers.
#[derive(Debug, Parser)]
#[command(
    name = "replstatus",
    about = "Answers MASTER, STANDBY or OFFLINE to every TCP connection",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Options for the default `serve` command.
    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the status server (the default).
    Serve(ServeArgs),
    /// Query a running server once and report through the exit status.
    Probe(ProbeArgs),
}

#[derive(Debug, Clone, Default, Args)]
struct ServeArgs {
    /// TOML configuration file.
    #[arg(long, env = "REPLSTATUS_CONFIG")]
    config: Option<PathBuf>,

    /// TCP port to listen on (1025-65535).
    #[arg(long, env = "REPLSTATUS_PORT")]
    port: Option<u16>,

    /// IPv4 address to bind.  Empty binds all interfaces.
    #[arg(long, env = "REPLSTATUS_BIND")]
    bind: Option<String>,

    /// JSON document with the node's replication state.
    #[arg(long, env = "REPLSTATUS_STATUS_FILE")]
    status_file: Option<PathBuf>,

    /// Supervisor detection: `parent`, `pid:<n>` or `none`.
    #[arg(long, env = "REPLSTATUS_SUPERVISOR")]
    supervisor: Option<SupervisorMode>,

    /// Always answer MASTER, ignoring any status file.
    #[arg(long)]
    assume_primary: bool,
}

impl ServeArgs {
    /// Layers flags over the configuration file and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded, a value is invalid, or
    /// no status file is configured without `--assume-primary`.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let file = load_config_file(self.config.as_deref()).with_context(|| match &self.config {
            Some(path) => format!("could not load configuration from {}", path.display()),
            None => "could not load configuration".to_string(),
        })?;

        let mut config = file
            .resolve(ConfigOverrides {
                port: self.port,
                bind_address: self.bind,
                status_file: self.status_file,
                supervisor: self.supervisor,
            })
            .context("invalid configuration")?;

        if self.assume_primary {
            config.status_file = None;
        } else if config.status_file.is_none() {
            return Err(ConfigError::MissingStatusFile).context("invalid configuration");
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Args)]
struct ProbeArgs {
    /// Host running the status server.
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port of the status server.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Largest acceptable replication delay in seconds.
    #[arg(long, allow_hyphen_values = true)]
    max_delay: Option<i32>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{e:#}");
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    // One thread: connections are handled strictly one at a time.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("could not start async runtime")?;

    match cli.command.unwrap_or(Command::Serve(cli.serve)) {
        Command::Serve(args) => runtime.block_on(serve(args)),
        Command::Probe(args) => runtime.block_on(probe(args)),
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<i32> {
    let config = args.into_server_config()?;

    let source: Box<dyn ReplicationSource> = match &config.status_file {
        Some(path) => {
            let source = StatusFileSource::new(path);
            info!("reading replication state from {}", source.path().display());
            Box::new(source)
        }
        None => {
            info!("--assume-primary set, reporting as primary");
            Box::new(FixedSource::new(ReplicationSnapshot::primary(Utc::now())))
        }
    };

    let supervisor = watch_for(config.supervisor)
        .with_context(|| format!("cannot watch supervisor ({})", config.supervisor))?;

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone()).context("could not install signal handlers")?;

    let event_loop = EventLoop::bind(&config, source, supervisor, shutdown)
        .context("could not start status server")?;

    info!(
        "replstatus {} starting, supervisor={}",
        env!("CARGO_PKG_VERSION"),
        config.supervisor
    );

    match event_loop.run().await {
        LoopExit::Shutdown => {
            info!("replstatus stopped");
            Ok(LoopExit::Shutdown.exit_code())
        }
        // The supervised database is gone; leave without any cleanup.
        exit @ LoopExit::SupervisorLost => process::exit(exit.exit_code()),
    }
}

async fn probe(args: ProbeArgs) -> anyhow::Result<i32> {
    let addr = SocketAddr::new(args.host, args.port);
    let status = query_status(addr, args.max_delay)
        .await
        .with_context(|| format!("status query to {addr} failed"))?;

    println!("{status}");
    Ok(if status.is_routable() {
        0
    } else {
        PROBE_NOT_ROUTABLE
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
