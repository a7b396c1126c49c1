use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, SleepError};

/// Sleep goal applied when a record does not carry one (8 hours)
pub const DEFAULT_SLEEP_GOAL_SECONDS: f64 = 28_800.0;

/// Sleep charge assumed by the rules when the record does not carry one
pub const DEFAULT_SLEEP_CHARGE: f64 = 3.0;

/// Duration score assumed by the rules when the record does not carry one
pub const DEFAULT_GROUP_DURATION_SCORE: f64 = 100.0;

/// One night of sleep-tracker data as delivered by the upstream source
///
/// Every field is optional. Durations are in seconds, timestamps are ISO-8601
/// strings and scores keep the scale of the device (0-5 for continuity and
/// charge, 0-100 for the group scores). Field names are a fixed contract with
/// the data source and must not be renamed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSleepRecord {
    /// Light sleep (NREM 1 & 2) in seconds
    pub light_sleep: Option<f64>,

    /// Deep sleep (NREM 3) in seconds
    pub deep_sleep: Option<f64>,

    /// REM sleep in seconds
    pub rem_sleep: Option<f64>,

    /// Sleep the device could not attribute to a stage, in seconds
    pub unrecognized_sleep_stage: Option<f64>,

    /// Time the user fell asleep (ISO-8601)
    pub sleep_start_time: Option<String>,

    /// Time the user woke up (ISO-8601)
    pub sleep_end_time: Option<String>,

    /// Raw night date, only used for display when the timestamps are unusable
    pub date: Option<Value>,

    /// Personal sleep goal in seconds
    pub sleep_goal: Option<f64>,

    /// Sum of all interruptions in seconds
    pub total_interruption_duration: Option<f64>,

    /// Sum of short interruptions in seconds
    pub short_interruption_duration: Option<f64>,

    /// Sum of long interruptions (90 s or more) in seconds
    pub long_interruption_duration: Option<f64>,

    /// Continuity score (0-5)
    pub continuity: Option<f64>,

    /// Discrete continuity class (1 = fragmented ... 5 = continuous)
    pub continuity_class: Option<f64>,

    /// Sleep quality relative to the personal baseline (1-5)
    pub sleep_charge: Option<f64>,

    /// Number of completed sleep cycles
    pub sleep_cycles: Option<f64>,

    /// Overall sleep score (0-100)
    pub sleep_score: Option<f64>,

    /// Duration component of the sleep score (0-100)
    pub group_duration_score: Option<f64>,

    /// Regeneration component of the sleep score (0-100)
    pub group_regeneration_score: Option<f64>,

    /// Stage codes sampled through the night, keyed by time offset. 0 = awake.
    pub hypnogram: Option<BTreeMap<String, Value>>,

    /// Heart rate samples in bpm, keyed by time offset
    pub heart_rate_samples: Option<BTreeMap<String, f64>>,
}

impl RawSleepRecord {
    /// Decode a record from the mapping located by the field extractor
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(map.clone())).map_err(|e| {
            SleepError::InvalidRecord {
                reason: e.to_string(),
            }
        })
    }

    pub fn sleep_goal_seconds(&self) -> f64 {
        self.sleep_goal.unwrap_or(DEFAULT_SLEEP_GOAL_SECONDS)
    }

    pub fn continuity_value(&self) -> f64 {
        self.continuity.unwrap_or(0.0)
    }

    pub fn continuity_class_value(&self) -> f64 {
        self.continuity_class.unwrap_or(0.0)
    }

    pub fn sleep_charge_value(&self) -> f64 {
        self.sleep_charge.unwrap_or(DEFAULT_SLEEP_CHARGE)
    }

    pub fn sleep_cycles_value(&self) -> f64 {
        self.sleep_cycles.unwrap_or(0.0)
    }

    pub fn group_duration_score_value(&self) -> f64 {
        self.group_duration_score
            .unwrap_or(DEFAULT_GROUP_DURATION_SCORE)
    }

    /// Raw `date` field rendered as display text
    pub fn date_text(&self) -> Option<String> {
        match self.date.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Metrics derived from a single night record
///
/// All durations are minutes and all percentages are relative to
/// `total_sleep_time`, except `sleep_efficiency` which is relative to
/// `time_in_bed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub light_minutes: f64,
    pub deep_minutes: f64,
    pub rem_minutes: f64,
    pub unrecognized_minutes: f64,

    /// Light + deep + REM. Unrecognized sleep is not included.
    pub total_sleep_time: f64,

    /// Minutes between sleep start and end, or an estimate when the
    /// timestamps are unusable
    pub time_in_bed: f64,

    /// Whether `time_in_bed` came from the timestamps
    pub time_in_bed_measured: bool,

    pub sleep_efficiency: f64,

    pub light_pct: f64,
    pub deep_pct: f64,
    pub rem_pct: f64,
    pub unrecognized_pct: f64,

    pub sleep_goal_minutes: f64,
    pub sleep_deficit: f64,
    pub sleep_surplus: f64,

    pub total_interruption_minutes: f64,
    pub short_interruption_minutes: f64,
    pub long_interruption_minutes: f64,

    /// Hypnogram samples scored as awake
    pub wake_episodes: usize,
}

/// Position of a metric relative to its reference range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Low,
    Normal,
    High,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Low => write!(f, "low"),
            Classification::Normal => write!(f, "normal"),
            Classification::High => write!(f, "high"),
        }
    }
}

/// Classifications attached to the evaluated metrics of one night
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricClassifications {
    pub deep_sleep: Classification,
    pub rem_sleep: Classification,
    pub light_sleep: Classification,
    pub continuity: Classification,
    pub sleep_efficiency: Classification,
}

/// Recommendation category, rendered as a leading glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    Duration,
    Continuity,
    DeepSleep,
    RemSleep,
    Efficiency,
    Interruptions,
    SleepCharge,
    Highlight,
    HeartRate,
    SleepCycles,
    Fragmentation,
    Achievement,
}

impl RecommendationCategory {
    pub fn glyph(&self) -> &'static str {
        match self {
            RecommendationCategory::Duration => "🕐",
            RecommendationCategory::Continuity => "😴",
            RecommendationCategory::DeepSleep => "🛌",
            RecommendationCategory::RemSleep => "🧠",
            RecommendationCategory::Efficiency => "⚡",
            RecommendationCategory::Interruptions => "🚫",
            RecommendationCategory::SleepCharge => "📈",
            RecommendationCategory::Highlight => "✨",
            RecommendationCategory::HeartRate => "❤️",
            RecommendationCategory::SleepCycles => "🔄",
            RecommendationCategory::Fragmentation => "⚠️",
            RecommendationCategory::Achievement => "🌟",
        }
    }
}

/// A single coaching recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: RecommendationCategory,
    pub text: String,
}

impl Recommendation {
    pub fn new(category: RecommendationCategory, text: impl Into<String>) -> Self {
        Self {
            category,
            text: text.into(),
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.category.glyph(), self.text)
    }
}

/// Device scores passed through to the report as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    pub sleep_score: f64,
    pub continuity: f64,
    pub sleep_cycles: f64,
    pub sleep_charge: f64,
}

impl From<&RawSleepRecord> for QualityScores {
    fn from(record: &RawSleepRecord) -> Self {
        // Display defaults differ from rule defaults: a missing charge shows as 0.
        Self {
            sleep_score: record.sleep_score.unwrap_or(0.0),
            continuity: record.continuity_value(),
            sleep_cycles: record.sleep_cycles_value(),
            sleep_charge: record.sleep_charge.unwrap_or(0.0),
        }
    }
}

/// Everything the report layer needs about one analyzed night
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub metrics: DerivedMetrics,
    pub classifications: MetricClassifications,
    pub recommendations: Vec<Recommendation>,

    /// Night date for display (`DD/MM/YYYY`, the raw `date` field, or `N/A`)
    pub date: String,

    /// Bedtime for display (`HH:MM` or `N/A`)
    pub start_time: String,

    /// Wake time for display (`HH:MM` or `N/A`)
    pub end_time: String,

    /// Wake date as `YYYY-MM-DD` when the end timestamp is usable
    pub iso_date: Option<String>,

    pub scores: QualityScores,
}
