//! Performance benchmarks for tirea-state-tree operations.
//!
//! Run with: cargo bench --package tirea-state-tree

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tirea_state_tree::{copy_with_set, get, Path, RootStore, Subscription, Value};

// ============================================================================
// Helper functions to generate test data
// ============================================================================

/// A flat object with N numeric fields.
fn generate_flat_doc(num_fields: usize) -> Value {
    Value::object((0..num_fields).map(|i| (format!("field_{}", i), Value::from(i))))
}

/// An object nested `depth` levels deep with a value at the bottom.
fn generate_nested_doc(depth: usize) -> (Value, Path) {
    let mut current = Value::object([("value", Value::from(42))]);
    let mut path = Path::root();
    for i in (0..depth).rev() {
        current = Value::object([(format!("level_{}", i), current)]);
    }
    for i in 0..depth {
        path = path.key(format!("level_{}", i));
    }
    (current, path.key("value"))
}

// ============================================================================
// Benchmark: copy-on-write set
// ============================================================================

fn bench_copy_with_set_flat(c: &mut Criterion) {
    let mut group = c.benchmark_group("copy_with_set_flat_doc");

    for num_fields in [10, 100, 1000, 10000] {
        group.throughput(Throughput::Elements(1));
        let doc = generate_flat_doc(num_fields);
        let path = Path::root().key("field_0");

        group.bench_with_input(BenchmarkId::from_parameter(num_fields), &num_fields, |b, _| {
            let mut n = 0usize;
            b.iter(|| {
                n += 1;
                let result = copy_with_set(black_box(&doc), black_box(&path), Value::from(n));
                black_box(result)
            });
        });
    }

    group.finish();
}

fn bench_copy_with_set_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("copy_with_set_nested_doc");

    for depth in [1, 5, 10, 20, 50] {
        let (doc, path) = generate_nested_doc(depth);

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            let mut n = 0usize;
            b.iter(|| {
                n += 1;
                let result = copy_with_set(black_box(&doc), black_box(&path), Value::from(n));
                black_box(result)
            });
        });
    }

    group.finish();
}

fn bench_get_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_nested_doc");

    for depth in [1, 5, 10, 20, 50] {
        let (doc, path) = generate_nested_doc(depth);

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| black_box(get(black_box(&doc), black_box(&path))));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: dispatch with active subscriptions
// ============================================================================

fn bench_dispatch_with_subscribers(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_with_subscribers");

    for num_subscribed in [0, 10, 100, 1000] {
        let store = RootStore::new(generate_flat_doc(1000));
        let _subs: Vec<Subscription> = (0..num_subscribed)
            .map(|i| {
                store
                    .child(format!("field_{}", i))
                    .changes()
                    .subscribe(|v| {
                        black_box(v);
                    })
            })
            .collect();
        let target = store.child("field_0");

        group.bench_with_input(
            BenchmarkId::from_parameter(num_subscribed),
            &num_subscribed,
            |b, _| {
                let mut n = 0usize;
                b.iter(|| {
                    n += 1;
                    target.set(n).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_subscribe_unsubscribe(c: &mut Criterion) {
    let (doc, path) = generate_nested_doc(10);
    let store = RootStore::new(doc);
    let node = path
        .iter()
        .fold(store.root(), |node, seg| node.child(seg.clone()));

    c.bench_function("subscribe_unsubscribe_depth_10", |b| {
        b.iter(|| {
            let sub = node.changes().subscribe(|v| {
                black_box(v);
            });
            sub.unsubscribe();
        });
    });
}

criterion_group!(
    benches,
    bench_copy_with_set_flat,
    bench_copy_with_set_nested,
    bench_get_nested,
    bench_dispatch_with_subscribers,
    bench_subscribe_unsubscribe,
);
criterion_main!(benches);
