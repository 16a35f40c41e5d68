//! End-to-end scenarios over small hand-built and random bases.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use vicinity::brute;
use vicinity::kmeans::{self, KMeansParams};
use vicinity::prelude::*;

fn random_base(n: usize, d: usize, seed: u64) -> Matrix {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let data = (0..n * d).map(|_| rng.gen_range(-5.0..5.0)).collect();
    Matrix::new(n, d, data).unwrap()
}

#[test]
fn two_clusters_exact_top1() {
    let base = Matrix::from_rows(&[
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![10.0, 10.0],
        vec![10.0, 11.0],
    ])
    .unwrap();

    let index = IvfFlatIndex::build(
        &base,
        IvfFlatParams {
            kclusters: 2,
            nprobe: 1,
            train_subset: Some(4),
            ..IvfFlatParams::default()
        },
    )
    .unwrap();

    let result = index.search(&[0.0, 0.4], 1).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].id, 0);
    assert!((result[0].dist - 0.4).abs() < 1e-6);
}

#[test]
fn lsh_finds_near_neighbor() {
    let base = Matrix::from_rows(&[
        vec![1.0, 2.0],
        vec![2.0, 1.0],
        vec![8.0, 9.0],
        vec![9.0, 8.0],
    ])
    .unwrap();

    let index = LshIndex::build(
        &base,
        LshParams {
            k: 4,
            num_tables: 5,
            width: 4.0,
            ..LshParams::default()
        },
    )
    .unwrap();

    let result = index.search(&[1.5, 2.0], 1).unwrap();
    assert_eq!(result.len(), 1);
    assert!(result[0].id == 0 || result[0].id == 1);
    assert!(result[0].dist <= 0.5f32.sqrt() + 1e-6);
}

#[test]
fn hypercube_range_stays_near() {
    let base = Matrix::from_rows(&[
        vec![1.0, 2.0],
        vec![2.0, 1.0],
        vec![8.0, 9.0],
        vec![9.0, 8.0],
    ])
    .unwrap();

    let index = HypercubeIndex::build(
        &base,
        HypercubeParams {
            k: 4,
            width: 4.0,
            max_candidates: 10,
            probes: 2,
            ..HypercubeParams::default()
        },
    )
    .unwrap();

    let within = index.search_range(&[1.5, 2.0], 3.0).unwrap();
    for id in within {
        assert!(id == 0 || id == 1, "far point {} within radius 3", id);
    }
}

#[test]
fn pq_codebook_and_code_shapes() {
    let base = random_base(256, 16, 4);
    let index = IvfPqIndex::build(
        &base,
        IvfPqParams {
            kclusters: 4,
            nprobe: 4,
            num_subspaces: 4,
            nbits: 4,
            ..IvfPqParams::default()
        },
    )
    .unwrap();

    let pq = index.quantizer();
    assert_eq!(pq.num_subspaces(), 4);
    for si in 0..4 {
        assert_eq!(pq.codebook(si).n(), 16);
        assert_eq!(pq.codebook(si).d(), 4);
    }

    let total: usize = (0..index.num_clusters())
        .map(|c| index.cluster_codes(c).len())
        .sum();
    assert_eq!(total, 256 * 4);
}

#[test]
fn kmeanspp_is_deterministic() {
    let base = random_base(200, 12, 5);
    let params = KMeansParams {
        k: 10,
        seed: 77,
        ..KMeansParams::default()
    };

    let a = kmeans::train(&base, &params).unwrap();
    let b = kmeans::train(&base, &params).unwrap();
    assert_eq!(a.centroids, b.centroids);
    assert_eq!(a.assign, b.assign);
    assert_eq!(a.iters, b.iters);
}

#[test]
fn ivf_flat_full_probe_matches_brute_force() {
    let base = random_base(60, 8, 6);
    let index = IvfFlatIndex::build(
        &base,
        IvfFlatParams {
            kclusters: 6,
            nprobe: 6,
            train_subset: Some(60),
            ..IvfFlatParams::default()
        },
    )
    .unwrap();

    let query = [0.5f32, -0.5, 1.0, -1.0, 0.0, 2.0, -2.0, 0.25];
    let approx = index.search(&query, 5).unwrap();
    let exact = brute::top_n(&base, &query, 5).unwrap();
    assert_eq!(approx, exact);

    // nprobe beyond kclusters is clamped, not an error
    let clamped = IvfFlatIndex::build(
        &base,
        IvfFlatParams {
            kclusters: 6,
            nprobe: 1000,
            train_subset: Some(60),
            ..IvfFlatParams::default()
        },
    )
    .unwrap();
    assert_eq!(clamped.search(&query, 5).unwrap(), exact);
}
