//! Structured logging for SleepRS
//!
//! Events go to stderr so reports on stdout stay clean for the host workflow.
//! The base level applies to the whole crate; `targets` raises or lowers it
//! for single modules, e.g. `recommendations = "trace"` to watch each rule
//! group fire. An optional JSON log file mirrors everything the filter lets
//! through.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

const CRATE_TARGET: &str = "sleeprs";
const DEFAULT_LOG_FILE: &str = "sleeprs.log";

/// Logging settings, the `[logging]` table of the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,

    /// Per-module overrides keyed by module path below the crate,
    /// e.g. `metrics` or `recommendations`
    pub targets: BTreeMap<String, LogLevel>,

    /// Also write JSON events to this file
    pub file_path: Option<PathBuf>,

    /// Start a new log file every day
    pub rotation: bool,

    /// Log entering and leaving the per-night analysis span
    pub include_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Pretty,
            targets: BTreeMap::new(),
            file_path: None,
            rotation: true,
            include_spans: false,
        }
    }
}

impl LogConfig {
    /// `EnvFilter` directives for the crate-wide level plus module overrides
    pub fn filter_directives(&self) -> String {
        std::iter::once(format!("{}={}", CRATE_TARGET, self.level.as_str()))
            .chain(self.targets.iter().map(|(module, level)| {
                let module = module.trim_start_matches("sleeprs::");
                format!("{}::{}={}", CRATE_TARGET, module, level.as_str())
            }))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    fn file_appender(&self, path: &Path) -> anyhow::Result<RollingFileAppender> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_LOG_FILE);

        Ok(if self.rotation {
            rolling::daily(dir, name)
        } else {
            rolling::never(dir, name)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Map a `-v` count to a level: 0 warn, 1 info, 2 debug, 3+ trace
    pub fn from_verbosity(verbose: u8) -> Self {
        match verbose {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Log output format on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, with colors
    Pretty,
    Json,
    Compact,
}

/// Install the global subscriber. `RUST_LOG` replaces the configured filter.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_directives()))?;

    let stderr_layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(std::io::stderr)
            .with_line_number(true)
            .with_span_events(config.span_events())
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(config.include_spans)
            .with_span_list(config.include_spans)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_span_events(config.span_events())
            .boxed(),
    };

    let file_layer = match &config.file_path {
        Some(path) => Some(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(config.file_appender(path)?)
                .with_current_span(config.include_spans)
                .with_span_list(config.include_spans),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    tracing::debug!(
        filter = %config.filter_directives(),
        file = ?config.file_path,
        "Logging initialized"
    );

    Ok(())
}
