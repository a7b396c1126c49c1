//! Metric derivation for a single night
//!
//! Converts the raw device fields (seconds, ISO-8601 timestamps, hypnogram
//! samples) into [`DerivedMetrics`]. Missing or unusable inputs never fail the
//! calculation: unparseable timestamps fall back to an estimated time in bed,
//! and zero denominators yield zero.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::models::{DerivedMetrics, RawSleepRecord};

const SECONDS_PER_MINUTE: f64 = 60.0;

/// Hypnogram stage code scored as awake
pub const HYPNOGRAM_WAKE_CODE: f64 = 0.0;

/// A timestamp as written by the device, with or without a UTC offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timestamp {
    Offset(DateTime<FixedOffset>),
    Local(NaiveDateTime),
}

impl Timestamp {
    /// Parse an ISO-8601 timestamp. A trailing `Z` is read as `+00:00`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let normalized = match raw.strip_suffix('Z') {
            Some(prefix) => format!("{}+00:00", prefix),
            None => raw.to_string(),
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
            return Some(Timestamp::Offset(dt));
        }

        for format in ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
            if let Ok(dt) = DateTime::parse_from_str(&normalized, format) {
                return Some(Timestamp::Offset(dt));
            }
        }

        for format in [
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M",
        ] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, format) {
                return Some(Timestamp::Local(dt));
            }
        }

        NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(Timestamp::Local)
    }

    /// Format in the timestamp's own offset
    pub fn format(&self, fmt: &str) -> String {
        match self {
            Timestamp::Offset(dt) => dt.format(fmt).to_string(),
            Timestamp::Local(dt) => dt.format(fmt).to_string(),
        }
    }

    /// Elapsed time from `earlier` to `self`; None when only one side has an offset
    fn since(&self, earlier: &Timestamp) -> Option<Duration> {
        match (self, earlier) {
            (Timestamp::Offset(end), Timestamp::Offset(start)) => Some(*end - *start),
            (Timestamp::Local(end), Timestamp::Local(start)) => Some(*end - *start),
            _ => None,
        }
    }
}

/// Sleep start and end, when both are present and usable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepWindow {
    pub start: Timestamp,
    pub end: Timestamp,
    duration: Duration,
}

impl SleepWindow {
    pub fn from_record(record: &RawSleepRecord) -> Option<Self> {
        let start = Timestamp::parse(record.sleep_start_time.as_deref()?)?;
        let end = Timestamp::parse(record.sleep_end_time.as_deref()?)?;
        let duration = end.since(&start)?;

        Some(Self {
            start,
            end,
            duration,
        })
    }

    /// Length of the window in minutes (negative when end precedes start)
    pub fn minutes(&self) -> f64 {
        self.duration.num_milliseconds() as f64 / 60_000.0
    }
}

/// Stateless calculator turning a raw record into derived metrics
pub struct MetricCalculator;

impl MetricCalculator {
    /// Derive all metrics for one night
    pub fn calculate(record: &RawSleepRecord) -> DerivedMetrics {
        let light_minutes = to_minutes(record.light_sleep);
        let deep_minutes = to_minutes(record.deep_sleep);
        let rem_minutes = to_minutes(record.rem_sleep);
        let unrecognized_minutes = to_minutes(record.unrecognized_sleep_stage);

        let total_sleep_time = light_minutes + deep_minutes + rem_minutes;
        let total_interruption_minutes = to_minutes(record.total_interruption_duration);

        let (time_in_bed, time_in_bed_measured) = match SleepWindow::from_record(record) {
            Some(window) => (window.minutes(), true),
            None => {
                debug!(
                    start = ?record.sleep_start_time,
                    end = ?record.sleep_end_time,
                    "Sleep window unavailable, estimating time in bed from interruptions"
                );
                (total_sleep_time + total_interruption_minutes, false)
            }
        };

        let sleep_efficiency = Self::sleep_efficiency(total_sleep_time, time_in_bed);

        let (light_pct, deep_pct, rem_pct, unrecognized_pct) = if total_sleep_time > 0.0 {
            let unrecognized_pct = if unrecognized_minutes > 0.0 {
                percentage(unrecognized_minutes, total_sleep_time)
            } else {
                0.0
            };
            (
                percentage(light_minutes, total_sleep_time),
                percentage(deep_minutes, total_sleep_time),
                percentage(rem_minutes, total_sleep_time),
                unrecognized_pct,
            )
        } else {
            (0.0, 0.0, 0.0, 0.0)
        };

        let sleep_goal_minutes = record.sleep_goal_seconds() / SECONDS_PER_MINUTE;
        let (sleep_deficit, sleep_surplus) = Self::sleep_balance(sleep_goal_minutes, total_sleep_time);

        DerivedMetrics {
            light_minutes,
            deep_minutes,
            rem_minutes,
            unrecognized_minutes,
            total_sleep_time,
            time_in_bed,
            time_in_bed_measured,
            sleep_efficiency,
            light_pct,
            deep_pct,
            rem_pct,
            unrecognized_pct,
            sleep_goal_minutes,
            sleep_deficit,
            sleep_surplus,
            total_interruption_minutes,
            short_interruption_minutes: to_minutes(record.short_interruption_duration),
            long_interruption_minutes: to_minutes(record.long_interruption_duration),
            wake_episodes: Self::wake_episodes(record),
        }
    }

    /// Total sleep as a percentage of time in bed; 0 when time in bed is not positive
    pub fn sleep_efficiency(total_sleep_time: f64, time_in_bed: f64) -> f64 {
        if time_in_bed > 0.0 {
            total_sleep_time / time_in_bed * 100.0
        } else {
            0.0
        }
    }

    /// Deficit and surplus against the goal; at most one is nonzero
    pub fn sleep_balance(goal_minutes: f64, total_sleep_time: f64) -> (f64, f64) {
        let deficit = (goal_minutes - total_sleep_time).max(0.0);
        let surplus = (total_sleep_time - goal_minutes).max(0.0);
        (deficit, surplus)
    }

    /// Number of hypnogram samples scored as awake
    pub fn wake_episodes(record: &RawSleepRecord) -> usize {
        record
            .hypnogram
            .as_ref()
            .map(|hypnogram| {
                hypnogram
                    .values()
                    .filter(|code| code.as_f64() == Some(HYPNOGRAM_WAKE_CODE))
                    .count()
            })
            .unwrap_or(0)
    }
}

fn to_minutes(seconds: Option<f64>) -> f64 {
    seconds.unwrap_or(0.0) / SECONDS_PER_MINUTE
}

fn percentage(part: f64, whole: f64) -> f64 {
    part / whole * 100.0
}
