//! Single-night analysis pipeline
//!
//! extract -> decode -> metrics -> classification -> recommendations -> display fields

use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, debug_span};

use crate::classify::classify_metrics;
use crate::error::Result;
use crate::extract::InputShape;
use crate::metrics::{MetricCalculator, Timestamp};
use crate::models::{AnalysisResult, QualityScores, RawSleepRecord};
use crate::recommendations;

/// Placeholder for display fields that cannot be resolved
pub const NOT_AVAILABLE: &str = "N/A";

/// Stateless entry point into the analysis engine
pub struct SleepAnalyzer;

impl SleepAnalyzer {
    /// Analyze one input payload
    pub fn analyze(input: &Value) -> Result<AnalysisResult> {
        let span = debug_span!("analyze_night");
        let _enter = span.enter();

        let shape = InputShape::resolve(input)?;
        debug!(shape = %shape, "Located sleep record");

        let record = RawSleepRecord::from_map(shape.record())?;
        Ok(Self::analyze_record(&record))
    }

    /// Analyze an already decoded record
    pub fn analyze_record(record: &RawSleepRecord) -> AnalysisResult {
        let metrics = MetricCalculator::calculate(record);
        debug!(
            total_sleep = metrics.total_sleep_time,
            time_in_bed = metrics.time_in_bed,
            efficiency = metrics.sleep_efficiency,
            "Derived sleep metrics"
        );

        let classifications = classify_metrics(&metrics, record);
        let recommendations = recommendations::evaluate(&metrics, &classifications, record);
        debug!(count = recommendations.len(), "Evaluated recommendation rules");

        // Display only needs both ends to parse; they need not be comparable.
        let start = record.sleep_start_time.as_deref().and_then(Timestamp::parse);
        let end = record.sleep_end_time.as_deref().and_then(Timestamp::parse);

        let (date, start_time, end_time, iso_date) = match (start, end) {
            (Some(start), Some(end)) => (
                start.format("%d/%m/%Y"),
                start.format("%H:%M"),
                end.format("%H:%M"),
                Some(end.format("%Y-%m-%d")),
            ),
            _ => (
                record
                    .date_text()
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                NOT_AVAILABLE.to_string(),
                NOT_AVAILABLE.to_string(),
                None,
            ),
        };

        AnalysisResult {
            metrics,
            classifications,
            recommendations,
            date,
            start_time,
            end_time,
            iso_date,
            scores: QualityScores::from(record),
        }
    }

    /// Analyze independent payloads in parallel, preserving input order
    pub fn analyze_many(inputs: &[Value]) -> Vec<Result<AnalysisResult>> {
        inputs.par_iter().map(Self::analyze).collect()
    }
}
