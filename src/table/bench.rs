use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

// Import the reference column and time series types from the crate
use neurostore::reference::{ObjectReference, RangeReference};
use neurostore::table::ReferenceColumn;
use neurostore::timeseries::{Handle, TimeSeries};

// Test configuration
const TARGET_COUNT: usize = 16;
const SAMPLES_PER_TARGET: usize = 1_000;
const ROW_COUNT: usize = 100_000;

fn targets() -> HashMap<ObjectReference, Handle> {
    (0..TARGET_COUNT)
        .map(|i| {
            let ts = TimeSeries::with_rate(
                format!("ts{}", i),
                "V",
                vec![0.0; SAMPLES_PER_TARGET],
                0.0,
                1000.0,
            )
            .unwrap();
            (ts.object_id().clone(), Arc::new(ts))
        })
        .collect()
}

fn column(targets: &HashMap<ObjectReference, Handle>) -> ReferenceColumn {
    let ids: Vec<&ObjectReference> = targets.keys().collect();
    let mut col = ReferenceColumn::new();
    for row in 0..ROW_COUNT {
        let start = (row % (SAMPLES_PER_TARGET - 10)) as u64;
        col.append(RangeReference::new(start, 10, ids[row % ids.len()].clone()));
    }
    col
}

// Benchmark unresolved slicing; no target is touched
pub fn bench_slice(c: &mut Criterion) {
    let targets = targets();
    let col = column(&targets);
    let mut group = c.benchmark_group("ReferenceColumn");

    group.bench_function("slice", |b| {
        b.iter(|| {
            let refs = col.slice(ROW_COUNT / 4, ROW_COUNT / 2).unwrap();
            black_box(refs.len());
        });
    });

    group.finish();
}

// Benchmark resolution against an in-memory resolver
pub fn bench_resolve(c: &mut Criterion) {
    let targets = targets();
    let col = column(&targets);
    let resolver = |id: &ObjectReference| targets.get(id).cloned();
    let mut rng = rand::thread_rng();
    let rows: Vec<usize> = (0..1_000).map(|_| rng.gen_range(0..ROW_COUNT)).collect();
    let mut group = c.benchmark_group("ReferenceColumn");

    group.bench_function("resolve", |b| {
        b.iter(|| {
            for &row in &rows {
                let resolved = col.resolve(row, &resolver).unwrap();
                black_box(resolved.data().len());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_slice, bench_resolve);

criterion_main!(benches);
