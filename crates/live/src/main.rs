//! Live - channel rule tooling
//!
//! # Usage
//!
//! ```bash
//! # Check a rule document: types, options, collisions and backends
//! live validate --rules rules.json
//!
//! # Publish a payload and print what local subscribers receive
//! echo '{"cpu": 0.5}' | live publish --rules rules.json --org 1 --channel stream/metrics/web1
//! live publish --org 1 --channel stream/a --data payload.json --listen stream/b
//! ```

mod cmd;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use live_config::{Config, LogConfig, LogFormat, LogOutput};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Live - channel rule tooling
#[derive(Parser, Debug)]
#[command(name = "live")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the service configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directive, overrides `[log] level`
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a rule document and build every organization's rules
    Validate(cmd::validate::ValidateArgs),

    /// Publish a payload through the pipeline
    Publish(cmd::publish::PublishArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.log, cli.log_level.as_deref())?;

    match cli.command {
        Command::Validate(args) => cmd::validate::run(args, &config),
        Command::Publish(args) => cmd::publish::run(args, &config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Initialize the tracing subscriber for logging
///
/// `--log-level` takes any `EnvFilter` directive and replaces the configured one.
fn init_logging(log: &LogConfig, level: Option<&str>) -> Result<()> {
    let directive = level.map_or_else(|| log.filter_directive(), str::to_string);
    let filter = EnvFilter::try_new(&directive)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match (log.format, log.output) {
        (LogFormat::Console, LogOutput::Stdout) => fmt::layer().with_target(true).boxed(),
        (LogFormat::Console, LogOutput::Stderr) => fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        (LogFormat::Json, LogOutput::Stdout) => fmt::layer().json().boxed(),
        (LogFormat::Json, LogOutput::Stderr) => {
            fmt::layer().json().with_writer(std::io::stderr).boxed()
        }
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .context("installing log subscriber")?;

    Ok(())
}
