use criterion::{Criterion, criterion_group, criterion_main};
use mphgen::Builder;

fn bench_build(c: &mut Criterion) {
    let keys: Vec<Vec<u8>> = (0..10_000)
        .map(|i| format!("key{:06}", i).into_bytes())
        .collect();

    c.bench_function("build_10k", |b| {
        b.iter(|| {
            Builder::new()
                .build(keys.iter().map(|k| k.as_slice()))
                .unwrap()
        })
    });

    let mph = Builder::new()
        .build(keys.iter().map(|k| k.as_slice()))
        .unwrap();
    c.bench_function("lookup_10k", |b| {
        b.iter(|| {
            let mut acc = 0u32;
            for k in &keys {
                acc = acc.wrapping_add(mph.index(k));
            }
            acc
        })
    });
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
