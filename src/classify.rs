//! Reference ranges and low/normal/high classification
//!
//! Normal ranges for adult sleep architecture (% of total sleep time), plus
//! continuity on the device's 0-5 scale and efficiency as % of time in bed:
//!
//! | Range            | Min  | Max  |
//! |------------------|------|------|
//! | deep_sleep       | 15   | 20   |
//! | rem_sleep        | 20   | 25   |
//! | light_sleep      | 50   | 65   |
//! | continuity       | 4.0  | 5.0  |
//! | sleep_efficiency | 85   | 95   |

use serde::Serialize;

use crate::error::{Result, SleepError};
use crate::models::{Classification, DerivedMetrics, MetricClassifications, RawSleepRecord};

/// Inclusive normal range for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceRange {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
}

/// Metrics that have a reference range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    DeepSleep,
    RemSleep,
    LightSleep,
    Continuity,
    SleepEfficiency,
}

/// The fixed reference table, indexed by [`RangeKind`]
pub static REFERENCE_RANGES: [ReferenceRange; 5] = [
    ReferenceRange { name: "deep_sleep", min: 15.0, max: 20.0 },
    ReferenceRange { name: "rem_sleep", min: 20.0, max: 25.0 },
    ReferenceRange { name: "light_sleep", min: 50.0, max: 65.0 },
    ReferenceRange { name: "continuity", min: 4.0, max: 5.0 },
    ReferenceRange { name: "sleep_efficiency", min: 85.0, max: 95.0 },
];

impl RangeKind {
    pub fn range(self) -> &'static ReferenceRange {
        let index = match self {
            RangeKind::DeepSleep => 0,
            RangeKind::RemSleep => 1,
            RangeKind::LightSleep => 2,
            RangeKind::Continuity => 3,
            RangeKind::SleepEfficiency => 4,
        };
        &REFERENCE_RANGES[index]
    }
}

impl ReferenceRange {
    /// Look up a range by its table name
    pub fn by_name(name: &str) -> Result<&'static ReferenceRange> {
        REFERENCE_RANGES
            .iter()
            .find(|range| range.name == name)
            .ok_or_else(|| SleepError::UnknownRange {
                name: name.to_string(),
            })
    }

    /// Classify a value against this range. Both bounds count as normal.
    pub fn classify(&self, value: f64) -> Classification {
        if value < self.min {
            Classification::Low
        } else if value > self.max {
            Classification::High
        } else {
            Classification::Normal
        }
    }
}

/// Classify a value against a range from the fixed table
pub fn classify(value: f64, kind: RangeKind) -> Classification {
    kind.range().classify(value)
}

/// Classify a value against a range looked up by name
pub fn classify_by_name(value: f64, name: &str) -> Result<Classification> {
    Ok(ReferenceRange::by_name(name)?.classify(value))
}

/// Classify every metric that has a reference range
pub fn classify_metrics(metrics: &DerivedMetrics, record: &RawSleepRecord) -> MetricClassifications {
    MetricClassifications {
        deep_sleep: classify(metrics.deep_pct, RangeKind::DeepSleep),
        rem_sleep: classify(metrics.rem_pct, RangeKind::RemSleep),
        light_sleep: classify(metrics.light_pct, RangeKind::LightSleep),
        continuity: classify(record.continuity_value(), RangeKind::Continuity),
        sleep_efficiency: classify(metrics.sleep_efficiency, RangeKind::SleepEfficiency),
    }
}
