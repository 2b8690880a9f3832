use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use scatter_table::{ScatterTable, Value};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

// Integer-valued numeric keys spread across the full integer-hash range.
fn key(n: u64) -> Value {
    Value::Number((n >> 12) as f64)
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("scatter_table_insert_10k", |b| {
        b.iter_batched(
            || ScatterTable::<Value>::new(4).unwrap(),
            |mut t| {
                for (i, x) in lcg(1).take(10_000).enumerate() {
                    t.set(key(x), Value::Number(i as f64)).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("scatter_table_get_hit", |b| {
        let mut t = ScatterTable::<Value>::new(4).unwrap();
        let keys: Vec<_> = lcg(7).take(20_000).map(key).collect();
        for (i, k) in keys.iter().enumerate() {
            t.set(k.clone(), Value::Number(i as f64)).unwrap();
        }
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(t.get(k).unwrap());
        })
    });
}

fn bench_get_miss(c: &mut Criterion) {
    c.bench_function("scatter_table_get_miss", |b| {
        let mut t = ScatterTable::<Value>::new(4).unwrap();
        for (i, x) in lcg(11).take(10_000).enumerate() {
            t.set(key(x), Value::Number(i as f64)).unwrap();
        }
        // Fractional keys never collide-equal with the integral ones.
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            let k = Value::Number((miss.next().unwrap() >> 12) as f64 + 0.5);
            black_box(t.get(&k).unwrap());
        })
    });
}

fn bench_delete_reinsert_churn(c: &mut Criterion) {
    c.bench_function("scatter_table_churn", |b| {
        let mut t = ScatterTable::<Value>::new(1024).unwrap();
        let keys: Vec<_> = lcg(23).take(1_000).map(key).collect();
        for (i, k) in keys.iter().enumerate() {
            t.set(k.clone(), Value::Number(i as f64)).unwrap();
        }
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            t.set(k.clone(), Value::Nil).unwrap();
            t.set(k.clone(), Value::Number(1.0)).unwrap();
            black_box(&t);
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_insert, bench_get_hit, bench_get_miss, bench_delete_reinsert_churn
}
criterion_main!(benches);
