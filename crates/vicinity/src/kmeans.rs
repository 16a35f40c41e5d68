//! K-means clustering with k-means++ seeding.
//!
//! Supports training on a uniform sub-sample of the input with a final
//! assignment pass over the full set, and re-seeds empty clusters instead of
//! letting them die.
//!
//! # References
//!
//! - Arthur & Vassilvitskii (2007): "k-means++: The Advantages of Careful
//!   Seeding"

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::{simd, Matrix, VicinityError};

/// K-means training parameters.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KMeansParams {
    /// Number of clusters.
    pub k: usize,
    /// Hard cap on Lloyd iterations.
    pub max_iters: usize,
    /// Stop when the maximum centroid shift falls below this.
    pub tol: f32,
    /// RNG seed.
    pub seed: u64,
    /// Use k-means++ seeding; uniform random otherwise.
    pub use_kmeanspp: bool,
    /// Train on a uniform sub-sample of this size. `None`, `Some(0)`, or a
    /// value `>= n` trains on the full set. The final assignment always
    /// covers the full set.
    pub train_subset: Option<usize>,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            k: 50,
            max_iters: 50,
            tol: 1e-4,
            seed: 1,
            use_kmeanspp: true,
            train_subset: None,
        }
    }
}

/// Output of [`train`].
#[derive(Clone, Debug)]
pub struct KMeansResult {
    /// `k x d` centroid matrix.
    pub centroids: Matrix,
    /// Nearest final centroid for every input row (length `n`).
    pub assign: Vec<u32>,
    /// SSE over the training subset at the last completed iteration.
    /// Advisory only; not recomputed over the full set.
    pub final_sse: f32,
    /// Completed Lloyd iterations.
    pub iters: usize,
}

fn nearest_centroid(centroids: &Matrix, x: &[f32]) -> (usize, f32) {
    let mut best = 0;
    let mut best_d = f32::INFINITY;
    for (c, row) in centroids.rows().enumerate() {
        let d = simd::l2_sq(x, row);
        if d < best_d {
            best_d = d;
            best = c;
        }
    }
    (best, best_d)
}

/// Uniform sample of `m` distinct indices from `[0, n)`.
fn choose_subset(n: usize, m: usize, rng: &mut StdRng) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..n).collect();
    if m >= n {
        return idx;
    }
    idx.shuffle(rng);
    idx.truncate(m);
    idx
}

/// k-means++ seeding over the training subset `train` (indices into `x`).
fn init_kmeanspp(x: &Matrix, train: &[usize], k: usize, rng: &mut StdRng) -> Vec<f32> {
    let d = x.d();
    let mut centroids = Vec::with_capacity(k * d);

    // First center uniformly from the subset.
    let first = train[rng.gen_range(0..train.len())];
    centroids.extend_from_slice(x.row(first));

    let mut d_sq = vec![f32::INFINITY; train.len()];
    for c in 1..k {
        // Distances only need refreshing against the most recent center.
        let last = &centroids[(c - 1) * d..c * d];
        for (t, &i) in train.iter().enumerate() {
            let dist = simd::l2_sq(x.row(i), last);
            if dist < d_sq[t] {
                d_sq[t] = dist;
            }
        }

        let total: f64 = d_sq.iter().map(|&v| v as f64).sum();
        if total <= 0.0 {
            // All remaining points coincide with chosen centers.
            let pick = train[rng.gen_range(0..train.len())];
            centroids.extend_from_slice(x.row(pick));
            continue;
        }

        let threshold = rng.gen::<f64>() * total;
        let mut acc = 0.0f64;
        let mut chosen = d_sq.len() - 1;
        for (t, &v) in d_sq.iter().enumerate() {
            acc += v as f64;
            if acc >= threshold {
                chosen = t;
                break;
            }
        }
        centroids.extend_from_slice(x.row(train[chosen]));
    }
    centroids
}

/// Uniform random seeding: a shuffle of the subset, first `k` rows.
fn init_random(x: &Matrix, train: &[usize], k: usize, rng: &mut StdRng) -> Vec<f32> {
    let mut picks = train.to_vec();
    picks.shuffle(rng);
    let mut centroids = Vec::with_capacity(k * x.d());
    for &i in picks.iter().take(k) {
        centroids.extend_from_slice(x.row(i));
    }
    centroids
}

/// Train k-means on `x`.
///
/// When a training subset is configured, Lloyd iterations run on the
/// sub-sample only; the returned assignment covers every row of `x` against
/// the final centroids.
pub fn train(x: &Matrix, params: &KMeansParams) -> Result<KMeansResult, VicinityError> {
    let n = x.n();
    let d = x.d();
    if n == 0 {
        return Err(VicinityError::InvalidParameter(
            "k-means: empty input".to_string(),
        ));
    }
    if params.k == 0 {
        return Err(VicinityError::InvalidParameter(
            "k-means: k must be at least 1".to_string(),
        ));
    }
    if params.k > n {
        return Err(VicinityError::InvalidParameter(format!(
            "k-means: k = {} exceeds the {} input points",
            params.k, n
        )));
    }

    let mut rng = StdRng::seed_from_u64(params.seed);

    let train_idx = match params.train_subset {
        Some(m) if m > 0 && m < n => choose_subset(n, m, &mut rng),
        _ => (0..n).collect(),
    };
    if train_idx.len() < params.k {
        return Err(VicinityError::InvalidParameter(format!(
            "k-means: training subset of {} is smaller than k = {}",
            train_idx.len(),
            params.k
        )));
    }

    let k = params.k;
    let mut centroids = if params.use_kmeanspp {
        init_kmeanspp(x, &train_idx, k, &mut rng)
    } else {
        init_random(x, &train_idx, k, &mut rng)
    };

    let mut assign_train = vec![0usize; train_idx.len()];
    let mut sums = vec![0.0f32; k * d];
    let mut counts = vec![0usize; k];

    let mut final_sse = 0.0f32;
    let mut iters = 0;

    for _ in 0..params.max_iters {
        iters += 1;
        sums.iter_mut().for_each(|s| *s = 0.0);
        counts.iter_mut().for_each(|c| *c = 0);

        // Assignment over the training subset.
        final_sse = 0.0;
        for (t, &i) in train_idx.iter().enumerate() {
            let xi = x.row(i);
            let mut best = 0;
            let mut best_d = f32::INFINITY;
            for c in 0..k {
                let dc = simd::l2_sq(xi, &centroids[c * d..(c + 1) * d]);
                if dc < best_d {
                    best_d = dc;
                    best = c;
                }
            }
            assign_train[t] = best;
            final_sse += best_d;

            let srow = &mut sums[best * d..(best + 1) * d];
            for (s, &v) in srow.iter_mut().zip(xi) {
                *s += v;
            }
            counts[best] += 1;
        }

        // Update step; empty clusters are handled below.
        let mut max_shift = 0.0f32;
        for c in 0..k {
            if counts[c] == 0 {
                continue;
            }
            let inv = 1.0 / counts[c] as f32;
            let crow = &mut centroids[c * d..(c + 1) * d];
            let mut shift = 0.0f32;
            for (j, cj) in crow.iter_mut().enumerate() {
                let new = sums[c * d + j] * inv;
                let diff = new - *cj;
                shift += diff * diff;
                *cj = new;
            }
            if shift > max_shift {
                max_shift = shift;
            }
        }

        if counts.contains(&0) {
            // Re-seed every empty cluster to the training point farthest
            // from its current centroid, and keep iterating: no convergence
            // check this round.
            let mut worst = train_idx[0];
            let mut worst_d = -1.0f32;
            for (t, &i) in train_idx.iter().enumerate() {
                let c = assign_train[t];
                let dist = simd::l2_sq(x.row(i), &centroids[c * d..(c + 1) * d]);
                if dist > worst_d {
                    worst_d = dist;
                    worst = i;
                }
            }
            for c in 0..k {
                if counts[c] == 0 {
                    centroids[c * d..(c + 1) * d].copy_from_slice(x.row(worst));
                    counts[c] = 1;
                }
            }
            continue;
        }

        if max_shift.sqrt() < params.tol {
            break;
        }
    }

    tracing::debug!(k, iters, sse = final_sse, "k-means finished");

    let centroids = Matrix::new(k, d, centroids)?;

    // Final assignment covers the FULL input, not just the subset.
    let assign = (0..n)
        .map(|i| nearest_centroid(&centroids, x.row(i)).0 as u32)
        .collect();

    Ok(KMeansResult {
        centroids,
        assign,
        final_sse,
        iters,
    })
}
