// # zonectl - DNS zone record tool
//
// Thin front end over the zonectl providers. It reads configuration from the
// environment, builds a provider through the registry, runs ONE zone
// operation and prints the resulting records as JSON on stdout.
//
// No zone logic lives here: listing, appending, reconciling and deleting are
// all provider behavior.
//
// ## Configuration
//
// ### OVH
// - `ZONECTL_OVH_ENDPOINT`: endpoint alias or API base URL (default `ovh-eu`)
// - `ZONECTL_OVH_APPLICATION_KEY`: application key
// - `ZONECTL_OVH_APPLICATION_SECRET`: application secret
// - `ZONECTL_OVH_CONSUMER_KEY`: consumer key
//
// ### Logging
// - `ZONECTL_LOG_LEVEL`: trace, debug, info, warn, error (default info).
//   Logs go to stderr.
//
// ## Example
//
// ```bash
// export ZONECTL_OVH_APPLICATION_KEY=...
// export ZONECTL_OVH_APPLICATION_SECRET=...
// export ZONECTL_OVH_CONSUMER_KEY=...
//
// zonectl get example.com.
// echo '[{"name":"www","type":"A","data":"192.0.2.1","ttl":300}]' \
//     | zonectl set example.com. --records -
// ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use zonectl_core::{
    ProviderConfig, ProviderRegistry, Record, RecordAppender, RecordDeleter, RecordGetter,
    RecordSetter, ZoneProvider,
};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Environment variable selecting the log level
const ENV_LOG_LEVEL: &str = "ZONECTL_LOG_LEVEL";

/// Exit codes
///
/// - 0: Operation succeeded
/// - 1: Configuration or input error, nothing was sent
/// - 2: The operation failed at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZonectlExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<ZonectlExitCode> for ExitCode {
    fn from(code: ZonectlExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Parser)]
#[command(name = "zonectl", version, about = "Manage DNS zone records")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every record of the zone
    Get {
        /// Zone name, trailing dot accepted
        zone: String,
    },
    /// Create the given records without checking for existing ones
    Append(RecordsArgs),
    /// Make each (name, type) group hold exactly the given records
    Set(RecordsArgs),
    /// Delete the records matching the given templates
    Delete(RecordsArgs),
}

#[derive(Debug, Args)]
struct RecordsArgs {
    /// Zone name, trailing dot accepted
    zone: String,

    /// JSON array of records, `-` for stdin
    #[arg(long, short, default_value = "-")]
    records: PathBuf,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Get { .. } => "get",
            Command::Append(_) => "append",
            Command::Set(_) => "set",
            Command::Delete(_) => "delete",
        }
    }

    fn zone(&self) -> &str {
        match self {
            Command::Get { zone } => zone,
            Command::Append(args) | Command::Set(args) | Command::Delete(args) => &args.zone,
        }
    }

    fn records_source(&self) -> Option<&Path> {
        match self {
            Command::Get { .. } => None,
            Command::Append(args) | Command::Set(args) | Command::Delete(args) => {
                Some(args.records.as_path())
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match std::env::var(ENV_LOG_LEVEL) {
        Ok(level) => match parse_log_level(&level) {
            Some(level) => level,
            None => {
                eprintln!(
                    "Configuration error: {} '{}' is not valid. \
                    Valid levels: trace, debug, info, warn, error",
                    ENV_LOG_LEVEL, level
                );
                return ZonectlExitCode::ConfigError.into();
            }
        },
        Err(_) => Level::INFO,
    };

    // stdout carries the JSON result
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ZonectlExitCode::ConfigError.into();
    }

    let provider = match build_provider() {
        Ok(provider) => provider,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return ZonectlExitCode::ConfigError.into();
        }
    };

    let records = match cli.command.records_source().map(read_records).transpose() {
        Ok(records) => records.unwrap_or_default(),
        Err(e) => {
            error!("Invalid records input: {:#}", e);
            return ZonectlExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ZonectlExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        let cancel = CancellationToken::new();
        tokio::spawn(cancel_on_signal(cancel.clone()));

        match run(provider.as_ref(), &cancel, &cli.command, &records).await {
            Ok(output) => {
                println!("{}", output);
                ZonectlExitCode::Success
            }
            Err(e) => {
                report_failure(&cli.command, &e);
                ZonectlExitCode::RuntimeError
            }
        }
    });

    code.into()
}

fn parse_log_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Build the provider named by the environment through the registry
fn build_provider() -> Result<Box<dyn ZoneProvider>> {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "ovh")]
    zonectl_provider_ovh::register(&registry);

    let config = ProviderConfig::ovh_from_env()?;
    info!(provider = config.type_name(), "building provider");

    Ok(registry.create_provider(&config)?)
}

/// Load a JSON array of records from a file, or stdin for `-`
fn read_records(source: &Path) -> Result<Vec<Record>> {
    let text = if source.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read records from stdin")?;
        text
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("failed to read {}", source.display()))?
    };

    serde_json::from_str(&text).context("records must be a JSON array of records")
}

/// Run one zone operation and render its records as JSON
async fn run(
    provider: &dyn ZoneProvider,
    cancel: &CancellationToken,
    command: &Command,
    records: &[Record],
) -> Result<String> {
    let zone = command.zone();
    info!(command = command.name(), zone, input = records.len(), "running");

    let result = match command {
        Command::Get { .. } => provider.get_records(cancel, zone).await?,
        Command::Append(_) => provider.append_records(cancel, zone, records).await?,
        Command::Set(_) => provider.set_records(cancel, zone, records).await?,
        Command::Delete(_) => provider.delete_records(cancel, zone, records).await?,
    };

    info!(command = command.name(), zone, output = result.len(), "done");
    Ok(serde_json::to_string_pretty(&result)?)
}

fn report_failure(command: &Command, err: &anyhow::Error) {
    let zone = command.zone();
    match err.downcast_ref::<zonectl_core::Error>() {
        Some(e) if e.is_atomic() => {
            error!(zone, "{} failed, zone left unchanged: {}", command.name(), e)
        }
        Some(e) if e.is_non_atomic() => error!(
            zone,
            "{} failed, zone may be inconsistent and should be re-read: {}",
            command.name(),
            e
        ),
        Some(e) if e.is_cancelled() => warn!(zone, "{} interrupted", command.name()),
        _ => error!(zone, "{} failed: {:#}", command.name(), err),
    }
}

/// Cancel `cancel` on SIGTERM or SIGINT
#[cfg(unix)]
async fn cancel_on_signal(cancel: CancellationToken) {
    let (Ok(mut sigterm), Ok(mut sigint)) = (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) else {
        warn!("Failed to install signal handlers");
        return;
    };

    let received = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    warn!("Received {}, cancelling", received);
    cancel.cancel();
}

/// Cancel `cancel` on CTRL-C
#[cfg(not(unix))]
async fn cancel_on_signal(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("Received CTRL-C, cancelling");
        cancel.cancel();
    }
}
