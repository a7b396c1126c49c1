//! Rule battery producing coaching recommendations for one night
//!
//! Rules are independent groups evaluated in a fixed order. Each group sees
//! the same read-only inputs and contributes zero, one or two entries; the
//! output is their concatenation. Order of [`RULES`] is display order. Groups
//! never suppress one another, so related or even contradictory entries can
//! appear together.
//!
//! Thresholds follow Polar's published guidance where it exists (long
//! awakenings are >= 90 s and average ~15 min per night, continuity classes
//! 1-5) and general sleep research otherwise (7-9 h for adults, 85%
//! efficiency, 4-5 cycles per night).

use statrs::statistics::Statistics;
use tracing::trace;

use crate::models::{
    Classification, DerivedMetrics, MetricClassifications, RawSleepRecord, Recommendation,
    RecommendationCategory as Category,
};
use crate::report::format_minutes;

/// Resting heart rate used as the elevated-HR baseline.
///
/// Fixed at 65 bpm and not derived from the record.
// TODO: replace with a per-user estimate once age and fitness level are part of the record.
pub const ESTIMATED_RESTING_HR: f64 = 65.0;

/// Mean sleeping HR above `ESTIMATED_RESTING_HR * ELEVATED_HR_FACTOR` is flagged
pub const ELEVATED_HR_FACTOR: f64 = 1.3;

/// Inputs shared by every rule
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub metrics: &'a DerivedMetrics,
    pub classifications: &'a MetricClassifications,
    pub record: &'a RawSleepRecord,
}

/// A named rule group
pub struct Rule {
    pub name: &'static str,
    evaluate: fn(&RuleContext<'_>) -> Vec<Recommendation>,
}

impl Rule {
    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Recommendation> {
        (self.evaluate)(ctx)
    }
}

/// The rule battery in evaluation order
pub static RULES: [Rule; 12] = [
    Rule { name: "duration", evaluate: duration },
    Rule { name: "continuity", evaluate: continuity },
    Rule { name: "deep_sleep", evaluate: deep_sleep },
    Rule { name: "rem_sleep", evaluate: rem_sleep },
    Rule { name: "efficiency", evaluate: efficiency },
    Rule { name: "long_interruptions", evaluate: long_interruptions },
    Rule { name: "sleep_charge", evaluate: sleep_charge },
    Rule { name: "heart_rate", evaluate: heart_rate },
    Rule { name: "sleep_cycles", evaluate: sleep_cycles },
    Rule { name: "fragmentation", evaluate: fragmentation },
    Rule { name: "sleep_architecture", evaluate: sleep_architecture },
    Rule { name: "phase_ratio", evaluate: phase_ratio },
];

/// Evaluate the whole battery. An empty result is a valid outcome.
pub fn evaluate(
    metrics: &DerivedMetrics,
    classifications: &MetricClassifications,
    record: &RawSleepRecord,
) -> Vec<Recommendation> {
    let ctx = RuleContext {
        metrics,
        classifications,
        record,
    };

    RULES
        .iter()
        .flat_map(|rule| {
            let fired = rule.evaluate(&ctx);
            trace!(rule = rule.name, entries = fired.len(), "Evaluated rule group");
            fired
        })
        .collect()
}

fn duration(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    let m = ctx.metrics;

    let text = if m.sleep_deficit > 30.0 {
        format!(
            "Increase sleep time by {} for optimal recovery",
            format_minutes(m.sleep_deficit)
        )
    } else if m.total_sleep_time < 360.0 {
        "Critically low sleep - aim for 7-9 hours for adults".to_string()
    } else if ctx.record.group_duration_score_value() < 80.0 {
        "Sleep duration consistency is more important than perfect amount".to_string()
    } else {
        return Vec::new();
    };

    vec![Recommendation::new(Category::Duration, text)]
}

fn continuity(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    let value = ctx.record.continuity_value();
    let class = ctx.record.continuity_class_value();

    let text = if class == 1.0 || value < 2.0 {
        "Fragmented sleep: check mattress, pillow and room temperature (16-19°C)"
    } else if class == 2.0 || value < 3.0 {
        "Fairly fragmented sleep: limit noise and light, avoid caffeine after 2 PM"
    } else if class == 3.0 || value < 4.0 {
        "Moderate continuity: create consistent bedtime ritual"
    } else {
        return Vec::new();
    };

    vec![Recommendation::new(Category::Continuity, text)]
}

fn deep_sleep(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if ctx.classifications.deep_sleep == Classification::Low || ctx.metrics.deep_pct < 13.0 {
        out.push(Recommendation::new(
            Category::DeepSleep,
            "Low deep sleep: maintain regular sleep schedule, avoid alcohol 3 hours before bed",
        ));
        if ctx.metrics.total_sleep_time > 0.0 {
            out.push(Recommendation::new(
                Category::DeepSleep,
                "For deep sleep: go to bed before midnight when main recovery occurs",
            ));
        }
    }

    out
}

fn rem_sleep(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    if ctx.classifications.rem_sleep != Classification::Low && ctx.metrics.rem_pct >= 18.0 {
        return Vec::new();
    }

    vec![
        Recommendation::new(
            Category::RemSleep,
            "Low REM sleep: manage stress, avoid intense workouts before bed",
        ),
        Recommendation::new(
            Category::RemSleep,
            "REM sleep is crucial for memory: maintain stable wake time",
        ),
    ]
}

fn efficiency(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    if ctx.metrics.sleep_efficiency >= 85.0 {
        return Vec::new();
    }

    vec![
        Recommendation::new(
            Category::Efficiency,
            "Low sleep efficiency: only go to bed when feeling sleepy",
        ),
        Recommendation::new(
            Category::Efficiency,
            "20-minute rule: if not asleep in 20 min - get up and do quiet activity",
        ),
    ]
}

fn long_interruptions(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    let minutes = ctx.metrics.long_interruption_minutes;

    let text = if minutes > 20.0 {
        "Frequent long awakenings: consult doctor to rule out sleep apnea"
    } else if minutes > 15.0 {
        "Long awakenings: check bed comfort and eliminate external disturbances"
    } else {
        return Vec::new();
    };

    vec![Recommendation::new(Category::Interruptions, text)]
}

fn sleep_charge(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    let charge = ctx.record.sleep_charge_value();
    let mut out = Vec::new();

    if charge <= 2.0 {
        out.push(Recommendation::new(
            Category::SleepCharge,
            "Sleep quality below usual: analyze recent lifestyle changes",
        ));
        if ctx.record.continuity_value() < 3.0 {
            out.push(Recommendation::new(
                Category::SleepCharge,
                "Consider relaxation techniques before bed (meditation, breathing exercises)",
            ));
        }
    } else if charge >= 4.0 {
        out.push(Recommendation::new(
            Category::Highlight,
            "Excellent sleep quality! Continue current habits",
        ));
    }

    out
}

/// Mean of the heart rate samples, None when there are none
pub fn mean_heart_rate(record: &RawSleepRecord) -> Option<f64> {
    let samples = record.heart_rate_samples.as_ref()?;
    if samples.is_empty() {
        return None;
    }
    Some(samples.values().mean())
}

fn heart_rate(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    match mean_heart_rate(ctx.record) {
        Some(mean) if mean > ESTIMATED_RESTING_HR * ELEVATED_HR_FACTOR => vec![
            Recommendation::new(
                Category::HeartRate,
                "Elevated sleep heart rate: check room temperature, stress levels",
            ),
            Recommendation::new(
                Category::HeartRate,
                "Consider stress reduction techniques and medical consultation",
            ),
        ],
        _ => Vec::new(),
    }
}

fn sleep_cycles(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    let cycles = ctx.record.sleep_cycles_value();

    let text = if cycles < 3.0 && ctx.metrics.total_sleep_time > 300.0 {
        "Few sleep cycles: possible fragmentation, check sleep conditions"
    } else if cycles > 6.0 {
        "Many short cycles: possible frequent micro-awakenings"
    } else {
        return Vec::new();
    };

    vec![Recommendation::new(Category::SleepCycles, text)]
}

fn fragmentation(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    let m = ctx.metrics;
    if m.total_interruption_minutes <= m.total_sleep_time * 0.15 {
        return Vec::new();
    }

    vec![Recommendation::new(
        Category::Fragmentation,
        "Significant sleep fragmentation: consider specialist consultation",
    )]
}

fn sleep_architecture(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    if ctx.metrics.sleep_efficiency >= 90.0 && ctx.record.continuity_value() >= 4.0 {
        vec![Recommendation::new(
            Category::Achievement,
            "Excellent sleep architecture - your habits are working perfectly!",
        )]
    } else {
        Vec::new()
    }
}

fn phase_ratio(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    if ctx.metrics.deep_pct >= 15.0 && ctx.metrics.rem_pct >= 20.0 {
        vec![Recommendation::new(
            Category::Achievement,
            "Optimal sleep phase ratio for recovery",
        )]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_metrics;
    use crate::metrics::MetricCalculator;
    use std::collections::BTreeMap;

    fn run(record: &RawSleepRecord) -> Vec<Recommendation> {
        let metrics = MetricCalculator::calculate(record);
        let classes = classify_metrics(&metrics, record);
        evaluate(&metrics, &classes, record)
    }

    fn texts(recs: &[Recommendation]) -> Vec<String> {
        recs.iter().map(|r| r.to_string()).collect()
    }

    fn has(recs: &[Recommendation], needle: &str) -> bool {
        recs.iter().any(|r| r.text.contains(needle))
    }

    /// 8 hours in bed, 8 hours asleep, balanced phases, good continuity
    fn healthy_night() -> RawSleepRecord {
        RawSleepRecord {
            light_sleep: Some(264.0 * 60.0),
            deep_sleep: Some(96.0 * 60.0),
            rem_sleep: Some(120.0 * 60.0),
            sleep_start_time: Some("2024-03-01T23:00:00Z".to_string()),
            sleep_end_time: Some("2024-03-02T07:00:00Z".to_string()),
            continuity: Some(4.5),
            sleep_charge: Some(3.0),
            sleep_cycles: Some(5.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_rule_order_is_fixed() {
        let names: Vec<&str> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "duration",
                "continuity",
                "deep_sleep",
                "rem_sleep",
                "efficiency",
                "long_interruptions",
                "sleep_charge",
                "heart_rate",
                "sleep_cycles",
                "fragmentation",
                "sleep_architecture",
                "phase_ratio",
            ]
        );
    }

    #[test]
    fn test_healthy_night_only_positive() {
        let recs = run(&healthy_night());
        assert_eq!(
            texts(&recs),
            vec![
                "🌟 Excellent sleep architecture - your habits are working perfectly!",
                "🌟 Optimal sleep phase ratio for recovery",
            ]
        );
    }

    #[test]
    fn test_deficit_message_formats_duration() {
        let record = RawSleepRecord {
            light_sleep: Some(200.0 * 60.0),
            deep_sleep: Some(60.0 * 60.0),
            rem_sleep: Some(90.0 * 60.0),
            ..healthy_night()
        };
        let recs = run(&record);
        assert_eq!(
            recs[0].to_string(),
            "🕐 Increase sleep time by 2h 10m for optimal recovery"
        );
    }

    #[test]
    fn test_duration_chain() {
        // No deficit against a short goal, but under 6 hours
        let record = RawSleepRecord {
            light_sleep: Some(200.0 * 60.0),
            deep_sleep: Some(60.0 * 60.0),
            rem_sleep: Some(90.0 * 60.0),
            sleep_goal: Some(21_000.0),
            ..healthy_night()
        };
        let recs = run(&record);
        assert!(has(&recs, "Critically low sleep"));
        assert!(!has(&recs, "Increase sleep time"));

        let record = RawSleepRecord {
            group_duration_score: Some(70.0),
            ..healthy_night()
        };
        let recs = run(&record);
        assert_eq!(recs[0].category, Category::Duration);
        assert!(has(&recs, "consistency is more important"));
    }

    #[test]
    fn test_continuity_chain() {
        let cases = [
            (Some(1.0), 4.5, "Fragmented sleep"),
            (None, 1.5, "Fragmented sleep"),
            (Some(2.0), 4.5, "Fairly fragmented"),
            (None, 2.5, "Fairly fragmented"),
            (Some(3.0), 4.5, "Moderate continuity"),
            (None, 3.9, "Moderate continuity"),
        ];

        for (class, value, expected) in cases {
            let record = RawSleepRecord {
                continuity: Some(value),
                continuity_class: class,
                ..healthy_night()
            };
            let recs: Vec<_> = run(&record)
                .into_iter()
                .filter(|r| r.category == Category::Continuity)
                .collect();
            assert_eq!(recs.len(), 1, "class {:?} value {}", class, value);
            assert!(recs[0].text.starts_with(expected));
        }
    }

    #[test]
    fn test_low_deep_and_rem() {
        let record = RawSleepRecord {
            light_sleep: Some(380.0 * 60.0),
            deep_sleep: Some(50.0 * 60.0),
            rem_sleep: Some(50.0 * 60.0),
            ..healthy_night()
        };
        let recs = run(&record);
        let deep = recs.iter().filter(|r| r.category == Category::DeepSleep).count();
        let rem = recs.iter().filter(|r| r.category == Category::RemSleep).count();
        assert_eq!(deep, 2);
        assert_eq!(rem, 2);
    }

    #[test]
    fn test_empty_night() {
        let recs = run(&RawSleepRecord::default());

        assert!(has(&recs, "Critically low sleep") || has(&recs, "Increase sleep time"));
        // Deep sleep advice without the bedtime tip when nothing was slept
        assert!(has(&recs, "Low deep sleep"));
        assert!(!has(&recs, "go to bed before midnight"));
        assert!(has(&recs, "Low sleep efficiency"));
    }

    #[test]
    fn test_long_interruptions() {
        let record = RawSleepRecord {
            long_interruption_duration: Some(21.0 * 60.0),
            ..healthy_night()
        };
        assert!(has(&run(&record), "rule out sleep apnea"));

        let record = RawSleepRecord {
            long_interruption_duration: Some(16.0 * 60.0),
            ..healthy_night()
        };
        let recs = run(&record);
        assert!(has(&recs, "check bed comfort"));
        assert!(!has(&recs, "sleep apnea"));

        let record = RawSleepRecord {
            long_interruption_duration: Some(15.0 * 60.0),
            ..healthy_night()
        };
        assert!(!run(&record).iter().any(|r| r.category == Category::Interruptions));
    }

    #[test]
    fn test_sleep_charge() {
        let record = RawSleepRecord {
            sleep_charge: Some(2.0),
            continuity: Some(2.5),
            ..healthy_night()
        };
        let recs = run(&record);
        assert!(has(&recs, "below usual"));
        assert!(has(&recs, "relaxation techniques"));

        let record = RawSleepRecord {
            sleep_charge: Some(4.0),
            ..healthy_night()
        };
        assert_eq!(
            run(&record)[0].to_string(),
            "✨ Excellent sleep quality! Continue current habits"
        );
    }

    #[test]
    fn test_heart_rate_elevated() {
        let mut samples = BTreeMap::new();
        samples.insert("t0".to_string(), 100.0);
        samples.insert("t1".to_string(), 102.0);
        let record = RawSleepRecord {
            heart_rate_samples: Some(samples),
            ..healthy_night()
        };

        assert_eq!(mean_heart_rate(&record), Some(101.0));
        let hr = run(&record)
            .into_iter()
            .filter(|r| r.category == Category::HeartRate)
            .count();
        assert_eq!(hr, 2);
    }

    #[test]
    fn test_heart_rate_threshold() {
        let mut samples = BTreeMap::new();
        samples.insert("t0".to_string(), 84.5);
        let record = RawSleepRecord {
            heart_rate_samples: Some(samples),
            ..healthy_night()
        };
        assert!(!has(&run(&record), "Elevated sleep heart rate"));

        let record = RawSleepRecord {
            heart_rate_samples: Some(BTreeMap::new()),
            ..healthy_night()
        };
        assert_eq!(mean_heart_rate(&record), None);
    }

    #[test]
    fn test_sleep_cycles() {
        let record = RawSleepRecord {
            sleep_cycles: Some(2.0),
            ..healthy_night()
        };
        assert!(has(&run(&record), "Few sleep cycles"));

        let record = RawSleepRecord {
            sleep_cycles: Some(7.0),
            ..healthy_night()
        };
        assert!(has(&run(&record), "micro-awakenings"));
    }

    #[test]
    fn test_few_cycles_needs_long_night() {
        for light_minutes in [34.0, 84.0] {
            // 250 and then exactly 300 minutes asleep
            let record = RawSleepRecord {
                light_sleep: Some(light_minutes * 60.0),
                sleep_cycles: Some(2.0),
                ..healthy_night()
            };
            let recs = run(&record);
            assert!(!recs.iter().any(|r| r.category == Category::SleepCycles));
        }

        let record = RawSleepRecord {
            light_sleep: Some(85.0 * 60.0),
            sleep_cycles: Some(2.0),
            ..healthy_night()
        };
        assert!(has(&run(&record), "Few sleep cycles"));

        let record = RawSleepRecord {
            sleep_cycles: Some(6.0),
            ..healthy_night()
        };
        assert!(!run(&record).iter().any(|r| r.category == Category::SleepCycles));
    }

    #[test]
    fn test_efficiency_boundaries() {
        // 408 of 480 minutes in bed is exactly 85%
        let record = RawSleepRecord {
            light_sleep: Some(228.0 * 60.0),
            deep_sleep: Some(72.0 * 60.0),
            rem_sleep: Some(108.0 * 60.0),
            ..healthy_night()
        };
        let metrics = MetricCalculator::calculate(&record);
        assert_eq!(metrics.sleep_efficiency, 85.0);
        let recs = run(&record);
        assert!(!recs.iter().any(|r| r.category == Category::Efficiency));
        assert!(!has(&recs, "Excellent sleep architecture"));

        // 432 of 480 minutes is exactly 90%
        let record = RawSleepRecord {
            light_sleep: Some(252.0 * 60.0),
            deep_sleep: Some(72.0 * 60.0),
            rem_sleep: Some(108.0 * 60.0),
            continuity: Some(4.0),
            ..healthy_night()
        };
        assert_eq!(MetricCalculator::calculate(&record).sleep_efficiency, 90.0);
        assert!(has(&run(&record), "Excellent sleep architecture"));

        let record = RawSleepRecord {
            continuity: Some(3.99),
            ..record
        };
        assert!(!has(&run(&record), "Excellent sleep architecture"));
    }

    #[test]
    fn test_fragmentation_ratio() {
        // 480 min of sleep, 15% is 72 min
        let record = RawSleepRecord {
            total_interruption_duration: Some(73.0 * 60.0),
            ..healthy_night()
        };
        assert!(has(&run(&record), "specialist consultation"));

        let record = RawSleepRecord {
            total_interruption_duration: Some(72.0 * 60.0),
            ..healthy_night()
        };
        assert!(!has(&run(&record), "specialist consultation"));
    }

    #[test]
    fn test_output_follows_rule_order() {
        let mut samples = BTreeMap::new();
        samples.insert("t0".to_string(), 95.0);
        let record = RawSleepRecord {
            light_sleep: Some(300.0 * 60.0),
            deep_sleep: Some(30.0 * 60.0),
            rem_sleep: Some(40.0 * 60.0),
            continuity: Some(1.0),
            sleep_charge: Some(1.0),
            long_interruption_duration: Some(30.0 * 60.0),
            total_interruption_duration: Some(110.0 * 60.0),
            sleep_cycles: Some(8.0),
            heart_rate_samples: Some(samples),
            ..healthy_night()
        };
        let categories: Vec<Category> = run(&record).iter().map(|r| r.category).collect();

        assert_eq!(
            categories,
            vec![
                Category::Duration,
                Category::Continuity,
                Category::DeepSleep,
                Category::DeepSleep,
                Category::RemSleep,
                Category::RemSleep,
                Category::Efficiency,
                Category::Efficiency,
                Category::Interruptions,
                Category::SleepCharge,
                Category::SleepCharge,
                Category::HeartRate,
                Category::HeartRate,
                Category::SleepCycles,
                Category::Fragmentation,
            ]
        );
    }
}
