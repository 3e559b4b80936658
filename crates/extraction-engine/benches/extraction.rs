//! Extraction backend benchmarks.
//!
//! Run with: `cargo bench -p extraction-engine`
//!
//! Compares the sequential backend with pooled backends of several sizes
//! on the same input, and measures grouping on its own.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use extraction_engine::{ConcurrencyConfig, FeatureExtractor};
use feature_engine::{KindOverrides, ParameterCatalog};
use series_grouper::{group, ColumnRoles, LongFrame, NormalizedRecord};

/// Deterministic frame of `entities` entities with three kinds each
fn create_frame(entities: u32, length: usize) -> LongFrame<u32> {
    let kinds = ["accel", "speed", "temp"];
    let mut records = Vec::with_capacity(entities as usize * kinds.len() * length);
    for id in 0..entities {
        for (k, kind) in kinds.iter().enumerate() {
            for t in 0..length {
                let phase = (t as f64 * 0.1 + id as f64 + k as f64).sin();
                let drift = (t % 17) as f64 * 0.05;
                records.push(NormalizedRecord::new(id, *kind, phase + drift));
            }
        }
    }
    LongFrame::from_records(records)
}

fn bench_grouping(c: &mut Criterion) {
    let mut bench = c.benchmark_group("grouping");
    for entities in [10u32, 100, 500] {
        let frame = create_frame(entities, 100);
        bench.throughput(Throughput::Elements(frame.rows() as u64));
        bench.bench_with_input(BenchmarkId::from_parameter(entities), &frame, |b, frame| {
            b.iter(|| black_box(group(frame, &ColumnRoles::default())))
        });
    }
    bench.finish();
}

fn bench_backends(c: &mut Criterion) {
    let frame = create_frame(200, 200);
    let extractor = match FeatureExtractor::builtin(ParameterCatalog::comprehensive(), KindOverrides::new()) {
        Ok(extractor) => extractor,
        Err(e) => panic!("built-in catalog must validate: {e}"),
    };

    let mut group = c.benchmark_group("backends");
    group.sample_size(10);
    group.throughput(Throughput::Elements(600));

    group.bench_function("sequential", |b| {
        b.iter(|| black_box(extractor.extract(&frame, &ConcurrencyConfig::sequential())))
    });

    for workers in [2usize, 4, 8] {
        group.bench_with_input(BenchmarkId::new("pooled", workers), &workers, |b, &workers| {
            b.iter(|| black_box(extractor.extract(&frame, &ConcurrencyConfig::pooled(workers))))
        });
    }
    group.finish();
}

fn bench_batch_size(c: &mut Criterion) {
    let frame = create_frame(200, 200);
    let extractor = match FeatureExtractor::builtin(ParameterCatalog::minimal(), KindOverrides::new()) {
        Ok(extractor) => extractor,
        Err(e) => panic!("minimal catalog must validate: {e}"),
    };

    let mut group = c.benchmark_group("batch_size");
    group.sample_size(10);
    for batch_size in [1usize, 8, 64] {
        let config = ConcurrencyConfig::pooled(4).with_batch_size(batch_size);
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &config, |b, config| {
            b.iter(|| black_box(extractor.extract(&frame, config)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_grouping, bench_backends, bench_batch_size);
criterion_main!(benches);
