//! NWDAF - Network Data Analytics Function with LLM-guided traffic steering
//!
//! Serves the analytics SBI and runs the auto-steering monitor that moves
//! user-plane traffic between the edge anchors through the NEF.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use nwdaf_lib::config::{ControllerConfig, NwdafConfig, DEFAULT_CONFIG_PATH};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod service;

const NWDAF_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "nwdaf")]
#[command(version, about = "5G NWDAF with LLM-guided traffic steering")]
struct Args {
    /// NF configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Append logs to this file instead of stdout
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Log level (overrides logger.level from the config file)
    #[arg(long, value_enum)]
    loglevel: Option<LogLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            // No levels above error in tracing
            LogLevel::Error | LogLevel::Fatal | LogLevel::Panic => "error",
        }
    }

    fn from_config(level: &str) -> Option<Self> {
        LogLevel::from_str(level, true).ok()
    }
}

/// Initialize tracing with JSON output, to stdout or an append-mode file
fn init_tracing(level: LogLevel, log_file: Option<&PathBuf>) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(fmt::layer().json().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };
    let stdout_layer = file_layer.is_none().then(|| fmt::layer().json());

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = NwdafConfig::load(&args.config);

    let logger = config.as_ref().ok().and_then(|c| c.logger.as_ref());
    let level = args
        .loglevel
        .or_else(|| {
            logger
                .and_then(|l| l.level.as_deref())
                .and_then(LogLevel::from_config)
        })
        .unwrap_or(LogLevel::Info);
    let log_file = args.log.clone().or_else(|| {
        logger
            .and_then(|l| l.file.as_deref())
            .filter(|f| !f.is_empty())
            .map(PathBuf::from)
    });
    init_tracing(level, log_file.as_ref())?;

    info!(version = NWDAF_VERSION, config = %args.config.display(), "Starting NWDAF");

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(e).context("NWDAF startup failed");
        }
    };
    let controller_config =
        ControllerConfig::from_env().context("failed to read auto-steering settings")?;
    info!(
        nf = %config.configuration.nwdaf_name,
        version = %config.version(),
        nef_url = %controller_config.nef_url,
        prometheus_url = %controller_config.prometheus_url,
        auto_steer = controller_config.enabled,
        "NWDAF configured"
    );

    service::run(config, controller_config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_and_panic_map_to_error() {
        assert_eq!(LogLevel::Fatal.directive(), "error");
        assert_eq!(LogLevel::Panic.directive(), "error");
        assert_eq!(LogLevel::Warn.directive(), "warn");
    }

    #[test]
    fn test_config_level_is_case_insensitive() {
        assert_eq!(LogLevel::from_config("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_config("verbose"), None);
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["nwdaf"]);
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(args.log.is_none());
        assert!(args.loglevel.is_none());

        let args = Args::parse_from(["nwdaf", "-c", "/etc/nwdaf.yaml", "--loglevel", "fatal"]);
        assert_eq!(args.config, PathBuf::from("/etc/nwdaf.yaml"));
        assert_eq!(args.loglevel, Some(LogLevel::Fatal));
    }
}
