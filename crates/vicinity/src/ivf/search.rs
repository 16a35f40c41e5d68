//! IVF-PQ index build and ADC search.

use crate::ivf::pq::ProductQuantizer;
use crate::ivf::{default_train_subset, nearest_centroids};
use crate::kmeans::{self, KMeansParams};
use crate::topk::{self, Neighbor};
use crate::{Matrix, VicinityError};

/// IVF-PQ parameters.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IvfPqParams {
    /// Number of coarse clusters (inverted lists).
    pub kclusters: usize,
    /// Lists probed per query; clamped to `[1, kclusters]`.
    pub nprobe: usize,
    /// PQ subspace count `m`; must divide the dimension.
    pub num_subspaces: usize,
    /// Bits per subspace; codes are one byte, so at most 8.
    pub nbits: u32,
    /// RNG seed for the coarse k-means (codebook streams derive from it).
    pub seed: u64,
    /// Coarse-training subset size; `None` picks `floor(sqrt(n))`.
    pub train_subset: Option<usize>,
}

impl Default for IvfPqParams {
    fn default() -> Self {
        Self {
            kclusters: 50,
            nprobe: 5,
            num_subspaces: 16,
            nbits: 8,
            seed: 1,
            train_subset: None,
        }
    }
}

/// IVF-PQ index: coarse centroids, shared PQ codebooks, and per-cluster
/// packed residual codes.
///
/// Queries never touch the base vectors again; distances are assembled from
/// per-subspace lookup tables, so reported values estimate the true L2.
pub struct IvfPqIndex {
    dimension: usize,
    params: IvfPqParams,
    centroids: Matrix,
    pq: ProductQuantizer,
    /// Inverted lists: `ids[c]` holds base IDs in construction order.
    ids: Vec<Vec<u32>>,
    /// Packed codes: `codes[c]` holds `m` bytes per member of `ids[c]`, in
    /// the same order.
    codes: Vec<Vec<u8>>,
}

impl IvfPqIndex {
    /// Build an index over `base`.
    pub fn build(base: &Matrix, params: IvfPqParams) -> Result<Self, VicinityError> {
        let d = base.d();
        let m = params.num_subspaces;

        // Coarse quantizer, identical to IVF-Flat.
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

        // Codebooks over residuals against the coarse assignment.
        let pq = ProductQuantizer::train(
            base,
            &km.assign,
            &km.centroids,
            m,
            params.nbits,
            params.seed,
        )?;

        // Encode every base point into its cluster's packed buffer.
        let sub_dim = pq.sub_dim();
        let mut ids = vec![Vec::new(); params.kclusters];
        let mut codes = vec![Vec::new(); params.kclusters];
        let mut residual = vec![0.0f32; sub_dim];
        for (i, &c) in km.assign.iter().enumerate() {
            let x = base.row(i);
            let centroid = km.centroids.row(c as usize);
            ids[c as usize].push(i as u32);
            let packed = &mut codes[c as usize];
            packed.reserve(m);
            for si in 0..m {
                let lo = si * sub_dim;
                for j in 0..sub_dim {
                    residual[j] = x[lo + j] - centroid[lo + j];
                }
                packed.push(pq.nearest_code(si, &residual));
            }
        }

        tracing::info!(
            n = base.n(),
            kclusters = params.kclusters,
            subspaces = m,
            codebook_size = pq.codebook_size(),
            "ivf-pq index built"
        );

        Ok(Self {
            dimension: d,
            params,
            centroids: km.centroids,
            pq,
            ids,
            codes,
        })
    }

    fn check_query(&self, query: &[f32]) -> Result<(), VicinityError> {
        if query.len() != self.dimension {
            return Err(VicinityError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        Ok(())
    }

    /// Score every member of the probed lists by ADC, reusing the LUT and
    /// residual scratch across probes.
    fn scan_probes(&self, query: &[f32]) -> Vec<Neighbor> {
        let m = self.pq.num_subspaces();
        let mut lut = Vec::new();
        let mut r_q = vec![0.0f32; self.dimension];
        let mut scored = Vec::new();

        for c in nearest_centroids(&self.centroids, query, self.params.nprobe) {
            let centroid = self.centroids.row(c);
            for (r, (qv, cv)) in r_q.iter_mut().zip(query.iter().zip(centroid)) {
                *r = qv - cv;
            }
            self.pq.build_lut(&r_q, &mut lut);

            for (k, &id) in self.ids[c].iter().enumerate() {
                let code = &self.codes[c][k * m..(k + 1) * m];
                scored.push(Neighbor::new(id, self.pq.adc(&lut, code)));
            }
        }
        scored
    }

    /// Approximate top-N by asymmetric distance; reported distances are
    /// square roots of the ADC estimates.
    pub fn search(&self, query: &[f32], n: usize) -> Result<Vec<Neighbor>, VicinityError> {
        self.check_query(query)?;
        let mut result = topk::top_n(self.scan_probes(query), n);
        for nb in &mut result {
            nb.dist = nb.dist.sqrt();
        }
        Ok(result)
    }

    /// Approximate range search: IDs whose ADC distance is within `radius`.
    /// The comparison happens on squared values, which is exact because ADC
    /// sums squared sub-distances.
    pub fn search_range(&self, query: &[f32], radius: f32) -> Result<Vec<u32>, VicinityError> {
        self.check_query(query)?;
        let r_sq = radius * radius;
        Ok(self
            .scan_probes(query)
            .into_iter()
            .filter(|nb| nb.dist <= r_sq)
            .map(|nb| nb.id)
            .collect())
    }

    /// The trained product quantizer.
    pub fn quantizer(&self) -> &ProductQuantizer {
        &self.pq
    }

    /// Coarse centroid matrix.
    pub fn centroids(&self) -> &Matrix {
        &self.centroids
    }

    /// Number of coarse clusters.
    pub fn num_clusters(&self) -> usize {
        self.ids.len()
    }

    /// Member IDs of cluster `c`, construction order.
    pub fn cluster_ids(&self, c: usize) -> &[u32] {
        &self.ids[c]
    }

    /// Packed codes of cluster `c`: `m` bytes per member, member order.
    pub fn cluster_codes(&self, c: usize) -> &[u8] {
        &self.codes[c]
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.ids.iter().map(Vec::len).sum()
    }

    /// True when the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
