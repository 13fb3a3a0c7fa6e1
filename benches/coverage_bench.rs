// benches/coverage_bench.rs
//! Benchmarks for coverage bookkeeping.

use chrono::{TimeDelta, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flickr_history::{Coverage, GapScheduler, Interval};

/// `count` hour-long spans with a one-minute hole after every third, shuffled.
fn fragmented_spans(count: i64) -> Vec<Interval> {
    let t0 = Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap();
    let mut spans: Vec<Interval> = (0..count)
        .map(|i| {
            let start = t0 + TimeDelta::hours(i);
            let end = if i % 3 == 2 {
                start + TimeDelta::minutes(59)
            } else {
                start + TimeDelta::hours(1)
            };
            Interval::new(start, end).unwrap()
        })
        .collect();
    // Deterministic interleaving so union cannot rely on sorted input
    let (even, odd): (Vec<_>, Vec<_>) = spans.drain(..).enumerate().partition(|(i, _)| i % 2 == 0);
    odd.into_iter()
        .rev()
        .chain(even)
        .map(|(_, span)| span)
        .collect()
}

fn bench_union(c: &mut Criterion) {
    let mut group = c.benchmark_group("coverage_union");

    for count in [100, 1_000, 10_000] {
        let spans = fragmented_spans(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &spans, |b, spans| {
            b.iter(|| Coverage::union(black_box(spans.iter().copied())))
        });
    }

    group.finish();
}

fn bench_gaps(c: &mut Criterion) {
    let mut group = c.benchmark_group("initial_work");
    let anchors = Interval::new(
        Utc.with_ymd_and_hms(1970, 1, 2, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
    )
    .unwrap();
    let scheduler = GapScheduler::new(anchors);

    for count in [100, 10_000] {
        let coverage = Coverage::union(fragmented_spans(count));
        group.bench_with_input(BenchmarkId::new("gaps", count), &coverage, |b, coverage| {
            b.iter(|| scheduler.gaps(black_box(coverage)))
        });
    }

    let empty = Coverage::new();
    for workers in [4, 64] {
        group.bench_with_input(BenchmarkId::new("partition", workers), &workers, |b, &workers| {
            b.iter(|| scheduler.compute_initial_work(black_box(&empty), workers))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_union, bench_gaps);
criterion_main!(benches);
