//! Fact join benchmarks
//!
//! Measures the left outer hash join across input sizes and match shapes
//! (fully matched, half matched, heavy fan-out).

use chrono::DateTime;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use liftlab::facts::{build_facts, Assignment, Outcome};

fn make_assignments(n: i64) -> Vec<Assignment> {
    (0..n)
        .map(|i| Assignment {
            user_id: i,
            experiment_id: format!("e{}", i % 3),
            variant: Some(if i % 2 == 0 { "control" } else { "treatment" }.to_string()),
            assigned_at: DateTime::UNIX_EPOCH,
            platform: None,
            acquisition_channel: None,
        })
        .collect()
}

fn make_outcomes(n: i64, stride: i64) -> Vec<Outcome> {
    (0..n)
        .filter(|i| i % stride == 0)
        .map(|i| Outcome {
            user_id: i,
            experiment_id: format!("e{}", i % 3),
            conversion: i % 5 == 0,
            revenue: 18.0,
            pre_metric: 10.0,
            event_ts: DateTime::UNIX_EPOCH,
            event_date: None,
            trial_start: None,
            trial_start_at: None,
            paid_subscriber: None,
            paid_at: None,
            refund_in_first_cycle: None,
            early_churn_30d: None,
            time_to_subscribe_days: None,
            pre_engagement_30d: None,
        })
        .collect()
}

fn bench_fact_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("fact_join");

    for &n in &[1_000i64, 10_000, 100_000] {
        let assignments = make_assignments(n);
        let matched = make_outcomes(n, 1);
        let sparse = make_outcomes(n, 2);

        group.bench_with_input(BenchmarkId::new("fully_matched", n), &n, |b, _| {
            b.iter(|| build_facts(black_box(&assignments), black_box(&matched)));
        });
        group.bench_with_input(BenchmarkId::new("half_matched", n), &n, |b, _| {
            b.iter(|| build_facts(black_box(&assignments), black_box(&sparse)));
        });
    }

    // Fan-out: every assignment key collides with 4 outcome rows.
    let assignments = make_assignments(10_000);
    let fanned: Vec<Outcome> = (0..4)
        .flat_map(|_| make_outcomes(10_000, 1))
        .collect();
    group.bench_function("fan_out_x4", |b| {
        b.iter(|| build_facts(black_box(&assignments), black_box(&fanned)));
    });

    group.finish();
}

criterion_group!(benches, bench_fact_join);
criterion_main!(benches);
