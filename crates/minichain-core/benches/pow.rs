use criterion::{criterion_group, criterion_main, Criterion};
use minichain_core::pow;

fn bench_pow(c: &mut Criterion) {
    // Difficulty 3 keeps a single search around 4k hashes on average, enough
    // to measure without making the harness crawl.
    c.bench_function("find_difficulty_3", |b| {
        b.iter(|| pow::find(100, 3));
    });

    let proof = pow::find(100, 3);
    c.bench_function("is_valid", |b| {
        b.iter(|| pow::is_valid(100, proof, 3));
    });
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
