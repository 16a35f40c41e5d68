//! Search benchmarks across the index families.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use vicinity::brute;
use vicinity::prelude::*;

fn random_base(n: usize, d: usize) -> Matrix {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let data = (0..n * d).map(|_| rng.gen_range(-1.0..1.0)).collect();
    Matrix::new(n, d, data).unwrap()
}

fn bench_search(c: &mut Criterion) {
    let base = random_base(10_000, 64);
    let query: Vec<f32> = (0..64).map(|i| (i as f32 * 0.37).sin()).collect();

    let lsh = LshIndex::build(&base, LshParams::default()).unwrap();
    let flat = IvfFlatIndex::build(
        &base,
        IvfFlatParams {
            kclusters: 100,
            nprobe: 10,
            ..IvfFlatParams::default()
        },
    )
    .unwrap();
    let pq = IvfPqIndex::build(
        &base,
        IvfPqParams {
            kclusters: 100,
            nprobe: 10,
            num_subspaces: 8,
            ..IvfPqParams::default()
        },
    )
    .unwrap();

    let mut group = c.benchmark_group("top10");
    group.bench_function("brute", |b| {
        b.iter(|| brute::top_n(&base, black_box(&query), 10).unwrap())
    });
    group.bench_function("lsh", |b| {
        b.iter(|| lsh.search(black_box(&query), 10).unwrap())
    });
    group.bench_function("ivf_flat", |b| {
        b.iter(|| flat.search(black_box(&query), 10).unwrap())
    });
    group.bench_function("ivf_pq", |b| {
        b.iter(|| pq.search(black_box(&query), 10).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
