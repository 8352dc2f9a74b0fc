//! Benchmark the batch-shedding intern cache pattern.
//!
//! Mirrors the raw-fragment cache: a hash probe plus tick bump on the hot
//! path, with an occasional sweep that drops the least recently touched
//! quarter on overflow. The last group measures the public `raw()` path end
//! to end.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::collections::HashMap;

/// Batch-shedding cache (matches the actual intern cache).
struct BatchCache<V> {
    capacity: usize,
    map: HashMap<String, (V, u64)>,
    tick: u64,
}

impl<V: Clone> BatchCache<V> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::new(),
            tick: 0,
        }
    }

    fn get_or_insert(&mut self, key: &str, make: impl FnOnce() -> V) -> V {
        self.tick += 1;
        let tick = self.tick;

        if let Some(entry) = self.map.get_mut(key) {
            entry.1 = tick;
            return entry.0.clone();
        }

        let value = make();
        self.map.insert(key.to_string(), (value.clone(), tick));
        if self.map.len() > self.capacity {
            self.shed_oldest();
        }
        value
    }

    fn shed_oldest(&mut self) {
        let mut touches: Vec<u64> = self.map.values().map(|(_, t)| *t).collect();
        touches.sort_unstable();
        let cutoff = touches[touches.len() / 4];
        self.map.retain(|_, (_, t)| *t > cutoff);
    }
}

fn make_key(i: usize) -> String {
    format!("select * from table_{i} where id = $1 and status = $2")
}

fn bench_cache_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("raw_cache/hit");

    for capacity in [64, 256, 1024] {
        let mut cache = BatchCache::new(capacity);
        for i in 0..capacity {
            cache.get_or_insert(&make_key(i), || i as u64);
        }

        let hit_key = make_key(capacity / 2);
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &hit_key, |b, key| {
            b.iter(|| black_box(cache.get_or_insert(key, || 0)));
        });
    }

    group.finish();
}

fn bench_cache_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("raw_cache/churn");

    // Always-new keys, so inserts dominate and the quarter sweep fires
    // periodically; this amortizes the sort over many cheap inserts.
    for capacity in [64, 256, 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &cap| {
                let mut cache = BatchCache::new(cap);
                let mut counter = 0usize;
                b.iter(|| {
                    counter += 1;
                    let key = make_key(counter);
                    black_box(cache.get_or_insert(&key, || counter as u64));
                });
            },
        );
    }

    group.finish();
}

fn bench_public_interning(c: &mut Criterion) {
    let mut group = c.benchmark_group("raw_cache/raw_hit_path");

    // Warm the process cache, then measure the steady-state hit path.
    let warm: Vec<String> = (0..64).map(make_key).collect();
    for key in &warm {
        black_box(pgfrag::raw(key));
    }

    group.bench_function("interned_raw", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % warm.len();
            black_box(pgfrag::raw(&warm[i]));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_cache_hit,
    bench_cache_churn,
    bench_public_interning
);
criterion_main!(benches);
