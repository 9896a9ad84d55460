use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use limno_qc::checks::{check_range, check_spikes, check_stuck_values, MultivariateCheck};
use limno_qc::config::{ParameterRules, StaticRuleResolver};
use limno_qc::models::StationBatch;
use limno_qc::QcPipeline;

// Synthetic but realistic lake telemetry: diurnal cycles plus slow drift,
// a sprinkling of gaps.
fn create_test_batch(station_id: &str, days: usize) -> StationBatch {
    let n = days * 24;
    let start = NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let timestamps = (0..n)
        .map(|h| start + chrono::Duration::hours(h as i64))
        .collect();
    let mut batch = StationBatch::new(station_id, timestamps).unwrap();

    let diurnal = |h: usize, amplitude: f64| {
        amplitude * ((h % 24) as f64 / 24.0 * std::f64::consts::TAU).sin()
    };
    let columns: Vec<(&str, Box<dyn Fn(usize) -> f64>)> = vec![
        ("ph", Box::new(move |h| 7.6 + 0.4 * diurnal(h, 1.0))),
        (
            "dissolved_oxygen",
            Box::new(move |h| 9.0 + 1.5 * diurnal(h, 1.0)),
        ),
        (
            "water_temp_0_5m",
            Box::new(move |h| 19.0 + 2.0 * diurnal(h, 1.0) + 0.01 * h as f64),
        ),
        (
            "conductivity",
            Box::new(move |h| 430.0 + 8.0 * diurnal(h, 1.0)),
        ),
        ("turbidity", Box::new(move |h| 4.0 + 1.2 * diurnal(h, 1.0))),
        ("nitrate", Box::new(move |h| 2.5 + 0.3 * diurnal(h, 1.0))),
    ];

    for (name, f) in columns {
        let values = (0..n)
            .map(|h| if h % 97 == 0 { None } else { Some(f(h)) })
            .collect();
        batch.insert_column(name, values).unwrap();
    }

    batch
}

fn benchmark_single_series_checks(c: &mut Criterion) {
    let batch = create_test_batch("wamo00010", 30);
    let values = batch.column("ph").unwrap();
    let rules = ParameterRules::new()
        .with_range(6.0, 10.0)
        .with_spike_threshold(0.5)
        .with_stuck_tolerance(3);

    c.bench_function("range_check_30_days", |b| {
        b.iter(|| check_range(black_box(values), batch.timestamps(), &rules))
    });
    c.bench_function("stuck_check_30_days", |b| {
        b.iter(|| check_stuck_values(black_box(values), batch.timestamps(), 3))
    });
    c.bench_function("spike_check_30_days", |b| {
        b.iter(|| check_spikes(black_box(values), 0.5))
    });
}

fn benchmark_multivariate(c: &mut Criterion) {
    let mut group = c.benchmark_group("multivariate");
    group.sample_size(10);

    for days in [7, 30] {
        let batch = create_test_batch("wamo00010", days);
        let check = MultivariateCheck::new(vec![
            "water_temp_0_5m".to_string(),
            "ph".to_string(),
            "dissolved_oxygen".to_string(),
            "conductivity".to_string(),
            "turbidity".to_string(),
        ]);

        group.bench_with_input(BenchmarkId::new("days", days), &batch, |b, batch| {
            b.iter(|| check.evaluate(black_box(batch)).unwrap())
        });
    }
    group.finish();
}

fn benchmark_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    let pipeline = QcPipeline::new()
        .with_max_workers(num_cpus::get())
        .with_resolver(std::sync::Arc::new(StaticRuleResolver::with_defaults()));

    for station_count in [1, 8] {
        let batches: Vec<StationBatch> = (0..station_count)
            .map(|i| create_test_batch(&format!("wamo{:05}", 10 + i), 7))
            .collect();

        group.bench_with_input(
            BenchmarkId::new("stations", station_count),
            &batches,
            |b, batches| b.iter(|| pipeline.run_stations(black_box(batches), None).unwrap()),
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_single_series_checks,
    benchmark_multivariate,
    benchmark_full_pipeline
);
criterion_main!(benches);
