use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::Value;
use std::fs;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::{error, info, warn};

use sleeprs::config::AppConfig;
use sleeprs::error::ErrorSeverity;
use sleeprs::logging::{init_logging, LogFormat, LogLevel};
use sleeprs::{render, AnalysisResult, OutputFormat, SleepAnalyzer, SleepError};

/// SleepRS - Sleep Analysis CLI
///
/// Turns one night of sleep-tracker data into derived metrics, coaching
/// recommendations and a formatted report.
#[derive(Parser)]
#[command(name = "sleeprs")]
#[command(author = "SleepRS Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Sleep Analysis CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log format
    #[arg(long, value_enum, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// Log entering and leaving each night's analysis
    #[arg(long)]
    log_spans: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one or more nights of sleep data (JSON files, `-` for stdin)
    Analyze {
        /// Input files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output format (text, envelope, json)
        #[arg(short = 'f', long)]
        format: Option<String>,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or initialize configuration
    Config {
        /// Print the effective configuration
        #[arg(short, long)]
        list: bool,

        /// Write a default configuration file if none exists
        #[arg(short, long)]
        init: bool,

        /// Get a configuration value by dotted key (e.g. report.format)
        #[arg(short, long)]
        get: Option<String>,
    },
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if cli.verbose > 0 {
        config.logging.level = LogLevel::from_verbosity(cli.verbose);
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    if cli.log_spans {
        config.logging.include_spans = true;
    }
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Analyze {
            files,
            format,
            output,
        } => {
            let format = match format {
                Some(f) => f.parse::<OutputFormat>().map_err(anyhow::Error::msg)?,
                None => config.report.format,
            };
            run_analyze(&config, &files, format, output.as_deref(), cli.verbose > 0)
        }

        Commands::Config { list, init, get } => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(AppConfig::default_config_path);
            let show_all = list || (!init && get.is_none());

            if init {
                if path.exists() {
                    println!("{} {}", "Config already exists:".yellow(), path.display());
                } else {
                    AppConfig::default().save_to_file(&path)?;
                    println!("{} {}", "✓ Wrote default config to".green(), path.display());
                }
            }

            if let Some(key) = get {
                match config.get(&key)? {
                    Some(value) => println!("{} = {}", key, value),
                    None => println!("{} {}", key, "is not set".dimmed()),
                }
            }

            if show_all {
                println!("{}", format!("# {}", path.display()).dimmed());
                println!("{}", config.to_toml()?);
            }

            Ok(())
        }
    }
}

fn run_analyze(
    config: &AppConfig,
    files: &[PathBuf],
    format: OutputFormat,
    output: Option<&Path>,
    show_metrics: bool,
) -> Result<()> {
    let mut failures = 0usize;
    let mut sections = Vec::new();
    // Files and pipes get plain text
    let styled = output.is_none() && std::io::stdout().is_terminal();

    // Inputs are read sequentially; analysis of the decoded payloads runs in parallel.
    let mut paths = Vec::new();
    let mut inputs = Vec::new();
    for path in files {
        match read_input(path) {
            Ok(value) => {
                paths.push(path.as_path());
                inputs.push(value);
            }
            Err(err) => {
                report_failure(path, &err);
                failures += 1;
            }
        }
    }

    info!(inputs = inputs.len(), "Analyzing sleep records");
    let results = SleepAnalyzer::analyze_many(&inputs);

    for (path, result) in paths.into_iter().zip(results) {
        match result {
            Ok(analysis) => {
                if show_metrics {
                    eprintln!("{}", metrics_table(&analysis));
                }
                let rendered = render(&analysis, &config.report, format)
                    .with_context(|| format!("Failed to render result for {}", path.display()))?;

                if files.len() > 1 && format == OutputFormat::Text {
                    sections.push(format!("{}\n{}", section_header(path, styled), rendered));
                } else {
                    sections.push(rendered);
                }
            }
            Err(err) => {
                report_failure(path, &err);
                failures += 1;
            }
        }
    }

    let body = sections.join("\n\n");
    match output {
        Some(out_path) => {
            fs::write(out_path, format!("{}\n", body))
                .with_context(|| format!("Failed to write output: {}", out_path.display()))?;
            println!("{} {}", "✓ Report written to".green(), out_path.display());
        }
        None if !body.is_empty() => println!("{}", body),
        None => {}
    }

    if failures > 0 {
        anyhow::bail!("{} of {} inputs could not be analyzed", failures, files.len());
    }

    Ok(())
}

fn read_input(path: &Path) -> sleeprs::Result<Value> {
    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        if !path.exists() {
            return Err(SleepError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        fs::read_to_string(path)?
    };

    Ok(serde_json::from_str(&content)?)
}

fn section_header(path: &Path, styled: bool) -> String {
    let header = format!("── {} ──", path.display());
    if styled {
        header.dimmed().to_string()
    } else {
        header
    }
}

fn report_failure(path: &Path, err: &SleepError) {
    match err.severity() {
        ErrorSeverity::Warning => warn!(path = %path.display(), error = %err, "Skipping input"),
        _ => error!(path = %path.display(), error = %err, "Analysis failed"),
    }
    eprintln!("{} {}: {}", "✗".red().bold(), path.display(), err.user_message());
}

fn metrics_table(analysis: &AnalysisResult) -> String {
    let m = &analysis.metrics;
    let rows = vec![
        MetricRow { metric: "Total sleep (min)", value: format!("{:.1}", m.total_sleep_time) },
        MetricRow {
            metric: "Time in bed (min)",
            value: format!(
                "{:.1}{}",
                m.time_in_bed,
                if m.time_in_bed_measured { "" } else { " (estimated)" }
            ),
        },
        MetricRow { metric: "Efficiency (%)", value: format!("{:.1}", m.sleep_efficiency) },
        MetricRow {
            metric: "Light (%)",
            value: format!("{:.1} [{}]", m.light_pct, analysis.classifications.light_sleep),
        },
        MetricRow {
            metric: "Deep (%)",
            value: format!("{:.1} [{}]", m.deep_pct, analysis.classifications.deep_sleep),
        },
        MetricRow {
            metric: "REM (%)",
            value: format!("{:.1} [{}]", m.rem_pct, analysis.classifications.rem_sleep),
        },
        MetricRow { metric: "Deficit (min)", value: format!("{:.1}", m.sleep_deficit) },
        MetricRow { metric: "Surplus (min)", value: format!("{:.1}", m.sleep_surplus) },
        MetricRow {
            metric: "Interruptions (min)",
            value: format!(
                "{:.1} (short {:.1}, long {:.1})",
                m.total_interruption_minutes,
                m.short_interruption_minutes,
                m.long_interruption_minutes
            ),
        },
        MetricRow { metric: "Wake episodes", value: m.wake_episodes.to_string() },
    ];

    Table::new(rows).with(Style::rounded()).to_string()
}
