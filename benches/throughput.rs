//! Store hot-path benchmarks.

use blazekv::storage::Store;
use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;

fn bench_set(c: &mut Criterion) {
    let store = Arc::new(Store::new());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            store.set(
                Bytes::from(format!("key:{i}")),
                Bytes::from_static(b"small_value"),
                None,
            );
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(1024));
        b.iter(|| {
            store.set(Bytes::from(format!("key:{i}")), value.clone(), None);
            i += 1;
        });
    });

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let store = Arc::new(Store::new());
    for i in 0..100_000 {
        store.set(
            Bytes::from(format!("key:{i}")),
            Bytes::from(format!("value:{i}")),
            None,
        );
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(store.get(key.as_bytes()).unwrap());
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{i}");
            black_box(store.get(key.as_bytes()).unwrap());
            i += 1;
        });
    });

    group.finish();
}

fn bench_list(c: &mut Criterion) {
    let store = Arc::new(Store::new());

    let mut group = c.benchmark_group("list");
    group.throughput(Throughput::Elements(1));

    group.bench_function("rpush", |b| {
        b.iter(|| {
            store
                .rpush(Bytes::from_static(b"queue"), vec![Bytes::from_static(b"job")])
                .unwrap();
        });
    });

    store.flush();
    store
        .rpush(
            Bytes::from_static(b"wide"),
            (0..1000).map(|i| Bytes::from(format!("item:{i}"))).collect(),
        )
        .unwrap();

    group.bench_function("lrange_100", |b| {
        b.iter(|| black_box(store.lrange(b"wide", 0, 99)));
    });

    group.finish();
}

criterion_group!(benches, bench_set, bench_get, bench_list);
criterion_main!(benches);
