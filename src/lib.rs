// Library interface for SleepRS modules
// This allows integration tests to access the core functionality

pub mod analysis;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod recommendations;
pub mod report;

// Re-export commonly used types for convenience
pub use models::*;
pub use analysis::SleepAnalyzer;
pub use classify::{classify, classify_by_name, RangeKind, ReferenceRange};
pub use extract::{locate_record, InputShape};
pub use metrics::MetricCalculator;
pub use report::{render, render_report, OutputFormat, ReportEnvelope, ReportSettings};
pub use error::{SleepError, Result};
pub use logging::{LogConfig, LogLevel, LogFormat};
