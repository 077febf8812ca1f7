//! Logging system configuration and initialization
//!
//! Library code only emits `tracing` events; this module installs the
//! subscriber for the binary:
//! - Console output
//! - Optional file output through a non-blocking appender
//! - Optional structured JSON format
//! - Local-time timestamps
//! - `RUST_LOG` override, otherwise the configured level with noisy
//!   dependencies held at `warn`

use anyhow::{Context, Result, anyhow};
use chrono::Local;
use lazy_static::lazy_static;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;
use crate::infrastructure::config::ConfigManager;

/// Dependencies that are only interesting at `trace`.
const NOISY_TARGETS: &[&str] = &["reqwest", "hyper", "hyper_util", "h2", "html5ever", "selectors"];

// Keeps the non-blocking file writers alive for the life of the process
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> =
        Mutex::new(Vec::new());
}

/// Local wall-clock timestamps
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Configured log directory, else `<data dir>/car-harvester/logs`, else `./logs`.
pub fn get_log_directory(config: &LoggingConfig) -> PathBuf {
    config.log_dir.clone().unwrap_or_else(|| {
        ConfigManager::get_app_data_dir()
            .map(|dir| dir.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    })
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(level: &str) -> Result<EnvFilter> {
    let mut filter = EnvFilter::new(level);
    if !level.to_lowercase().contains("trace") {
        for target in NOISY_TARGETS {
            filter = filter.add_directive(
                format!("{target}=warn")
                    .parse()
                    .with_context(|| format!("Invalid log directive for {target}"))?,
            );
        }
    }
    Ok(filter)
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initialize logging with custom configuration
///
/// Fails if a global subscriber is already installed.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => default_filter(&config.level)?,
    };

    let file_writer = if config.file_output {
        let log_dir = get_log_directory(config);
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

        let file_appender = rolling::never(&log_dir, &config.file_name);
        let (file_writer, file_guard) = non_blocking(file_appender);
        if let Ok(mut guards) = LOG_GUARDS.lock() {
            guards.push(file_guard);
        }
        Some((file_writer, log_dir.join(&config.file_name)))
    } else {
        None
    };

    let (json_file_layer, text_file_layer) = match &file_writer {
        Some((writer, _)) if config.json_format => (
            Some(
                fmt::Layer::new()
                    .json()
                    .with_writer(writer.clone())
                    .with_timer(LocalTimeFormatter)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false),
            ),
            None,
        ),
        Some((writer, _)) => (
            None,
            Some(
                fmt::Layer::new()
                    .with_writer(writer.clone())
                    .with_timer(LocalTimeFormatter)
                    .with_target(false)
                    .with_ansi(false),
            ),
        ),
        None => (None, None),
    };

    let console_layer = config.console_output.then(|| {
        fmt::Layer::new()
            .with_writer(std::io::stderr)
            .with_timer(LocalTimeFormatter)
            .with_target(false)
    });

    Registry::default()
        .with(env_filter)
        .with(json_file_layer)
        .with(text_file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))?;

    if let Some((_, path)) = &file_writer {
        info!("Logging to file: {}", path.display());
    }
    info!("Logging initialized at level '{}'", config.level);
    Ok(())
}
