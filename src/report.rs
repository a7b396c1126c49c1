//! Text report and host output envelope
//!
//! Presentation only: everything here reads a finished [`AnalysisResult`].
//! Rounding and truncation of durations happen here and nowhere else.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::error::{Result, SleepError};
use crate::models::AnalysisResult;

/// Line shown when the rule battery produced nothing
pub const NO_RECOMMENDATIONS_LINE: &str = "✅ Excellent sleep quality! Keep it up.";

/// Output format of the `analyze` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    /// `[{"message": <report>, "date": "YYYY-MM-DD"}]` for the host workflow
    Envelope,
    /// Full analysis result
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "envelope" => Ok(OutputFormat::Envelope),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

/// Report rendering preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Default output format
    pub format: OutputFormat,

    /// Include the unrecognized-stage line in the phase breakdown
    pub show_unrecognized: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            show_unrecognized: true,
        }
    }
}

/// One element of the host workflow's expected output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEnvelope {
    pub message: String,
    pub date: String,
}

/// Format minutes as `Xh Ym`, `Xh` or `Ym`, truncating partial minutes
pub fn format_minutes(minutes: f64) -> String {
    if minutes < 0.0 {
        return format!("-{}", format_minutes(-minutes));
    }

    let hours = (minutes / 60.0).floor() as u64;
    let remaining = (minutes % 60.0).floor() as u64;

    match (hours, remaining) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// Deficit, surplus or goal-reached line
pub fn sleep_balance_text(result: &AnalysisResult) -> String {
    let m = &result.metrics;
    if m.sleep_deficit > 0.0 {
        format!("Deficit: {}", format_minutes(m.sleep_deficit))
    } else if m.sleep_surplus > 0.0 {
        format!("Surplus: {}", format_minutes(m.sleep_surplus))
    } else {
        "Goal achieved!".to_string()
    }
}

/// Render the fixed-layout text report
pub fn render_report(result: &AnalysisResult, settings: &ReportSettings) -> String {
    let m = &result.metrics;
    let s = &result.scores;
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out);
    let _ = writeln!(out, "  SLEEP ANALYSIS - {}", result.date);
    let _ = writeln!(out);

    let _ = writeln!(out, "🕐 SLEEP TIME:");
    let _ = writeln!(
        out,
        "   Bedtime: {} | Wake time: {}",
        result.start_time, result.end_time
    );
    let _ = writeln!(out, "   Time in bed: {}", format_minutes(m.time_in_bed));
    let _ = writeln!(out, "   Actual sleep: {}", format_minutes(m.total_sleep_time));
    let _ = writeln!(out, "   Sleep goal: {}", format_minutes(m.sleep_goal_minutes));
    let _ = writeln!(out, "   {}", sleep_balance_text(result));
    let _ = writeln!(out, "   Efficiency: {:.1}%", m.sleep_efficiency);
    let _ = writeln!(out);

    let _ = writeln!(out, "🧠 SLEEP PHASES:");
    let _ = writeln!(
        out,
        "   • Light:  {}  ({:.1}%) (Normal: 44-65%)",
        format_minutes(m.light_minutes),
        m.light_pct
    );
    let _ = writeln!(
        out,
        "   • Deep: {} ({:.1}%) (Normal: 17-20%)",
        format_minutes(m.deep_minutes),
        m.deep_pct
    );
    let _ = writeln!(
        out,
        "   • REM:     {} ({:.1}%) (Normal: 20-25%)",
        format_minutes(m.rem_minutes),
        m.rem_pct
    );
    if settings.show_unrecognized {
        let _ = writeln!(
            out,
            "   • Unrecognized: {} ({:.1}%) (Normal: 0-10%)",
            format_minutes(m.unrecognized_minutes),
            m.unrecognized_pct
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "📊 SLEEP QUALITY:");
    let _ = writeln!(out, "   Overall score: {}/100", s.sleep_score);
    let _ = writeln!(
        out,
        "   Continuity: {:.1}/5.0 [{}]",
        s.continuity, result.classifications.continuity
    );
    let _ = writeln!(out, "   Sleep cycles: {}", s.sleep_cycles);
    let _ = writeln!(out, "   Sleep charge: {}/5 (vs usual level)", s.sleep_charge);
    let _ = writeln!(out);

    let _ = writeln!(out, "⚠️  AWAKENINGS:");
    let _ = writeln!(out, "   • Wake episodes: {}", m.wake_episodes);
    let _ = writeln!(out);

    let _ = write!(out, "💡 RECOMMENDATIONS:");
    if result.recommendations.is_empty() {
        let _ = write!(out, "\n   {}", NO_RECOMMENDATIONS_LINE);
    } else {
        for (i, rec) in result.recommendations.iter().enumerate() {
            let _ = write!(out, "\n   {}. {}", i + 1, rec);
        }
    }

    out
}

/// Package the report for the host workflow
pub fn envelope(result: &AnalysisResult, settings: &ReportSettings) -> Vec<ReportEnvelope> {
    vec![ReportEnvelope {
        message: render_report(result, settings),
        date: result.iso_date.clone().unwrap_or_else(|| result.date.clone()),
    }]
}

/// Render a result in the requested format
pub fn render(
    result: &AnalysisResult,
    settings: &ReportSettings,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_report(result, settings)),
        OutputFormat::Envelope => {
            serde_json::to_string_pretty(&envelope(result, settings)).map_err(SleepError::from)
        }
        OutputFormat::Json => serde_json::to_string_pretty(result).map_err(SleepError::from),
    }
}
