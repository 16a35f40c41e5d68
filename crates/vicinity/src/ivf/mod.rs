//! Inverted-file indexes: IVF-Flat and IVF-PQ.
//!
//! Both partition the base set with coarse k-means and scan only the
//! `nprobe` inverted lists closest to the query. IVF-Flat re-scores list
//! members exactly; IVF-PQ replaces them with product-quantized residual
//! codes and scores through per-query lookup tables (asymmetric distance
//! computation).
//!
//! # References
//!
//! - Jégou et al. (2011): "Product Quantization for Nearest Neighbor Search"

mod flat;
mod pq;
mod search;

pub use flat::{IvfFlatIndex, IvfFlatParams};
pub use pq::ProductQuantizer;
pub use search::{IvfPqIndex, IvfPqParams};

use crate::topk::{self, Neighbor};
use crate::{simd, Matrix};

/// Indices of the `nprobe` centroids closest to `q` by squared L2,
/// ascending. `nprobe` is clamped to `[1, k]`.
pub(crate) fn nearest_centroids(centroids: &Matrix, q: &[f32], nprobe: usize) -> Vec<usize> {
    let k = centroids.n();
    let nprobe = nprobe.clamp(1, k);
    let scored = centroids
        .rows()
        .enumerate()
        .map(|(j, row)| Neighbor::new(j as u32, simd::l2_sq(q, row)))
        .collect();
    topk::top_n(scored, nprobe)
        .into_iter()
        .map(|nb| nb.id as usize)
        .collect()
}

/// Default coarse-training subset size, `floor(sqrt(n))`.
pub(crate) fn default_train_subset(n: usize) -> usize {
    (n as f64).sqrt() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_centroids_orders_and_clamps() {
        let centroids = Matrix::from_rows(&[
            vec![0.0, 0.0],
            vec![5.0, 5.0],
            vec![1.0, 1.0],
        ])
        .unwrap();

        assert_eq!(nearest_centroids(&centroids, &[0.9, 0.9], 2), vec![2, 0]);
        // nprobe larger than k is clamped
        assert_eq!(
            nearest_centroids(&centroids, &[0.0, 0.0], 10),
            vec![0, 2, 1]
        );
        // nprobe of zero still probes one list
        assert_eq!(nearest_centroids(&centroids, &[5.0, 5.0], 0), vec![1]);
    }
}
