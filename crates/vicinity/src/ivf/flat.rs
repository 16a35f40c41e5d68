//! IVF-Flat: coarse k-means plus exact scans of the probed lists.

use crate::ivf::{default_train_subset, nearest_centroids};
use crate::kmeans::{self, KMeansParams};
use crate::topk::{self, Neighbor};
use crate::{simd, Matrix, VicinityError};

/// IVF-Flat parameters.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IvfFlatParams {
    /// Number of coarse clusters (inverted lists).
    pub kclusters: usize,
    /// Lists probed per query; clamped to `[1, kclusters]`.
    pub nprobe: usize,
    /// RNG seed for the coarse k-means.
    pub seed: u64,
    /// Coarse-training subset size; `None` picks `floor(sqrt(n))`.
    pub train_subset: Option<usize>,
}

impl Default for IvfFlatParams {
    fn default() -> Self {
        Self {
            kclusters: 50,
            nprobe: 5,
            seed: 1,
            train_subset: None,
        }
    }
}

/// IVF-Flat index: coarse centroids plus inverted lists of member IDs.
///
/// List order is construction order, i.e. ascending base ID.
pub struct IvfFlatIndex {
    base: Matrix,
    params: IvfFlatParams,
    centroids: Matrix,
    lists: Vec<Vec<u32>>,
}

impl IvfFlatIndex {
    /// Build an index over `base`.
    pub fn build(base: &Matrix, params: IvfFlatParams) -> Result<Self, VicinityError> {
        let train_subset = params
            .train_subset
            .unwrap_or_else(|| default_train_subset(base.n()));
        let km = kmeans::train(
            base,
            &KMeansParams {
                k: params.kclusters,
                seed: params.seed,
                train_subset: Some(train_subset),
                ..KMeansParams::default()
            },
        )?;

        let mut lists = vec![Vec::new(); params.kclusters];
        for (i, &c) in km.assign.iter().enumerate() {
            lists[c as usize].push(i as u32);
        }

        tracing::info!(
            n = base.n(),
            kclusters = params.kclusters,
            iters = km.iters,
            "ivf-flat index built"
        );

        Ok(Self {
            base: base.clone(),
            params,
            centroids: km.centroids,
            lists,
        })
    }

    fn check_query(&self, query: &[f32]) -> Result<(), VicinityError> {
        if query.len() != self.base.d() {
            return Err(VicinityError::DimensionMismatch {
                expected: self.base.d(),
                actual: query.len(),
            });
        }
        Ok(())
    }

    /// Approximate top-N: exact scan of the `nprobe` closest lists.
    pub fn search(&self, query: &[f32], n: usize) -> Result<Vec<Neighbor>, VicinityError> {
        self.check_query(query)?;

        let mut scored = Vec::new();
        for c in nearest_centroids(&self.centroids, query, self.params.nprobe) {
            for &id in &self.lists[c] {
                scored.push(Neighbor::new(
                    id,
                    simd::l2_sq(query, self.base.row(id as usize)),
                ));
            }
        }
        let mut result = topk::top_n(scored, n);
        for nb in &mut result {
            nb.dist = nb.dist.sqrt();
        }
        Ok(result)
    }

    /// Approximate range search over the probed lists, scan order.
    pub fn search_range(&self, query: &[f32], radius: f32) -> Result<Vec<u32>, VicinityError> {
        self.check_query(query)?;

        let r_sq = radius * radius;
        let mut out = Vec::new();
        for c in nearest_centroids(&self.centroids, query, self.params.nprobe) {
            for &id in &self.lists[c] {
                if simd::l2_sq(query, self.base.row(id as usize)) <= r_sq {
                    out.push(id);
                }
            }
        }
        Ok(out)
    }

    /// Coarse centroid matrix.
    pub fn centroids(&self) -> &Matrix {
        &self.centroids
    }

    /// Inverted list of cluster `c`.
    pub fn list(&self, c: usize) -> &[u32] {
        &self.lists[c]
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        self.base.d()
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.base.n()
    }

    /// True when the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pairs() -> Matrix {
        Matrix::from_rows(&[
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![10.0, 10.0],
            vec![10.0, 11.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_lists_partition_base() {
        let base = two_pairs();
        let index = IvfFlatIndex::build(
            &base,
            IvfFlatParams {
                kclusters: 2,
                train_subset: Some(4),
                ..IvfFlatParams::default()
            },
        )
        .unwrap();

        let mut all: Vec<u32> = (0..2).flat_map(|c| index.list(c).to_vec()).collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_range_uses_squared_comparison() {
        let base = two_pairs();
        let index = IvfFlatIndex::build(
            &base,
            IvfFlatParams {
                kclusters: 2,
                nprobe: 2,
                train_subset: Some(4),
                ..IvfFlatParams::default()
            },
        )
        .unwrap();

        let ids = index.search_range(&[0.0, 0.0], 1.1).unwrap();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_kclusters_larger_than_n_rejected() {
        let base = two_pairs();
        assert!(IvfFlatIndex::build(
            &base,
            IvfFlatParams {
                kclusters: 10,
                train_subset: Some(4),
                ..IvfFlatParams::default()
            }
        )
        .is_err());
    }
}
