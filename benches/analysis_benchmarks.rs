use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use sleeprs::{render_report, MetricCalculator, RawSleepRecord, ReportSettings, SleepAnalyzer};

/// Performance benchmarks for the sleep analysis engine
///
/// Metric derivation and rule evaluation are O(1) per night apart from the
/// hypnogram scan, so the interesting dimensions are hypnogram size and batch
/// size.

fn create_night(hypnogram_samples: usize) -> Value {
    let hypnogram: serde_json::Map<String, Value> = (0..hypnogram_samples)
        .map(|i| (format!("{:05}", i * 30), json!(i % 5)))
        .collect();
    let heart_rate: serde_json::Map<String, Value> = (0..hypnogram_samples)
        .map(|i| (format!("{:05}", i * 30), json!(50 + (i % 20))))
        .collect();

    json!({
        "light_sleep": 15840,
        "deep_sleep": 5760,
        "rem_sleep": 7200,
        "unrecognized_sleep_stage": 300,
        "sleep_start_time": "2024-05-10T23:00:00Z",
        "sleep_end_time": "2024-05-11T07:00:00Z",
        "continuity": 3.4,
        "sleep_charge": 2,
        "total_interruption_duration": 2400,
        "long_interruption_duration": 1000,
        "sleep_cycles": 4,
        "hypnogram": hypnogram,
        "heart_rate_samples": heart_rate
    })
}

fn bench_single_night(c: &mut Criterion) {
    let mut group = c.benchmark_group("Single Night Analysis");

    for &samples in &[0, 100, 1000, 10_000] {
        let night = create_night(samples);

        group.throughput(Throughput::Elements(samples.max(1) as u64));
        group.bench_with_input(BenchmarkId::new("analyze", samples), &night, |b, night| {
            b.iter(|| SleepAnalyzer::analyze(black_box(night)))
        });
    }

    group.finish();
}

fn bench_metric_calculation(c: &mut Criterion) {
    let record = RawSleepRecord {
        light_sleep: Some(15_840.0),
        deep_sleep: Some(5_760.0),
        rem_sleep: Some(7_200.0),
        sleep_start_time: Some("2024-05-10T23:00:00Z".to_string()),
        sleep_end_time: Some("2024-05-11T07:00:00Z".to_string()),
        ..Default::default()
    };

    c.bench_function("calculate_metrics", |b| {
        b.iter(|| MetricCalculator::calculate(black_box(&record)))
    });
}

fn bench_batch_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("Batch Analysis");

    for &nights in &[10, 100, 1000] {
        let inputs: Vec<Value> = (0..nights).map(|_| create_night(200)).collect();

        group.throughput(Throughput::Elements(nights as u64));
        group.bench_with_input(BenchmarkId::new("analyze_many", nights), &inputs, |b, inputs| {
            b.iter(|| SleepAnalyzer::analyze_many(black_box(inputs)))
        });
    }

    group.finish();
}

fn bench_report_rendering(c: &mut Criterion) {
    let result = SleepAnalyzer::analyze(&create_night(100)).expect("benchmark night is valid");
    let settings = ReportSettings::default();

    c.bench_function("render_report", |b| {
        b.iter(|| render_report(black_box(&result), &settings))
    });
}

criterion_group!(
    benches,
    bench_single_night,
    bench_metric_calculation,
    bench_batch_analysis,
    bench_report_rendering
);
criterion_main!(benches);
