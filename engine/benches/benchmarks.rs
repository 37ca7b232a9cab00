//! Performance benchmarks for rowstate-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rowstate_engine::{
    sum_by_product, EngineConfig, JsonRow, ProgressReport, QuantityField, RowStore,
};
use serde_json::{json, Value};

fn create_rows(size: usize) -> Vec<JsonRow> {
    (0..size)
        .map(|i| {
            JsonRow::new(format!("row_{}", i))
                .with_field("style", format!("Style {}", i))
                .with_field("layers", i as i64 % 60)
                .with_order_number(i as i64 + 1)
        })
        .collect()
}

fn create_store(size: usize) -> RowStore<JsonRow> {
    RowStore::new(create_rows(size), &EngineConfig::default()).unwrap()
}

fn bench_store_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_operations");

    group.bench_function("store_new", |b| {
        b.iter_with_setup(
            || create_rows(1000),
            |rows| RowStore::new(black_box(rows), &EngineConfig::default()),
        )
    });

    group.bench_function("update_existing", |b| {
        let mut store = create_store(1000);
        let mut n = 0i64;

        b.iter(|| {
            n += 1;
            store
                .update(black_box("row_500"), json!({"layers": n}))
                .map(|_| ())
        })
    });

    group.bench_function("add_new", |b| {
        let mut store = create_store(1000);
        let mut id = 0u64;

        b.iter(|| {
            id += 1;
            store.add_new(black_box(JsonRow::new(format!("new_{}", id))))
        })
    });

    group.bench_function("remove_restore", |b| {
        let mut store = create_store(1000);

        b.iter(|| {
            store.remove(black_box("row_500"));
            store.restore(black_box("row_500"))
        })
    });

    group.bench_function("mode_switch", |b| {
        let mut store = create_store(1000);

        b.iter(|| {
            store.start_editing(black_box("row_10"));
            store.start_deleting(black_box("row_10"));
            store.cancel_deleting();
        })
    });

    group.finish();
}

fn bench_reorder(c: &mut Criterion) {
    let mut group = c.benchmark_group("reorder");

    for size in [100, 1000, 5000].iter() {
        group.bench_with_input(BenchmarkId::new("move_and_renumber", size), size, |b, &size| {
            let mut store = create_store(size);

            // Rotate: the first row moves to the end each iteration
            b.iter(|| {
                let first = store.records()[0].key.clone();
                let last = store.records()[size - 1].key.clone();
                store.reorder(black_box(&first), black_box(&last));
                store.renumber()
            })
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for size in [100, 500, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("export", size), size, |b, &size| {
            let mut store = create_store(size);
            store.start_editing("row_1");
            store.start_expanding(true, "row_2");

            b.iter(|| store.snapshot())
        });

        group.bench_with_input(BenchmarkId::new("to_json", size), size, |b, &size| {
            let store = create_store(size);

            b.iter(|| serde_json::to_string(black_box(&store.snapshot())))
        });
    }

    group.finish();
}

fn bench_progress(c: &mut Criterion) {
    let mut group = c.benchmark_group("progress");

    for size in [100, 1000, 10000].iter() {
        let records: Vec<Value> = (0..*size)
            .map(|i| {
                json!({
                    "productID": i % 20,
                    "quantitySewed": i % 50,
                    "quantityIroned": i % 40,
                    "quantityChecked": i % 30,
                    "quantityPackaged": i % 25,
                })
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("sum_by_product", size), &records, |b, records| {
            b.iter(|| sum_by_product(black_box(7), records, QuantityField::Sewed))
        });

        group.bench_with_input(BenchmarkId::new("report", size), &records, |b, records| {
            b.iter(|| ProgressReport::build(black_box(7), Some(1000), records))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_store_operations,
    bench_reorder,
    bench_snapshot,
    bench_progress,
);
criterion_main!(benches);
