//! TTL cache benchmark: hits, inserts with eviction, coalesced fetches.

use chainrisk::cache::TtlCache;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;

fn bench_get_hit(c: &mut Criterion) {
    let cache = TtlCache::new(1024, Duration::from_secs(900));
    for i in 0..1024 {
        cache.set(format!("lane-{}", i), i);
    }
    let key = "lane-512".to_string();
    c.bench_function("cache_get_hit", |b| b.iter(|| black_box(cache.get(&key))));
}

fn bench_set_evicting(c: &mut Criterion) {
    let cache = TtlCache::new(1024, Duration::from_secs(900));
    let mut i = 0u64;
    c.bench_function("cache_set_at_capacity", |b| {
        b.iter(|| {
            i += 1;
            cache.set(format!("lane-{}", i), black_box(i))
        })
    });
}

fn bench_get_or_fetch_hit(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let cache = TtlCache::new(1024, Duration::from_secs(900));
    cache.set("lane".to_string(), 1u64);
    c.bench_function("cache_get_or_fetch_hit", |b| {
        b.iter(|| {
            rt.block_on(cache.get_or_fetch("lane".to_string(), || async {
                Ok::<u64, ()>(2)
            }))
        })
    });
}

criterion_group!(benches, bench_get_hit, bench_set_evicting, bench_get_or_fetch_hit);
criterion_main!(benches);
