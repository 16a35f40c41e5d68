//! LSH index build and search.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::lsh::hash::CombinedHash;
use crate::topk::{self, Neighbor};
use crate::{simd, Matrix, VicinityError};

/// LSH parameters.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LshParams {
    /// Projection hashes per table.
    pub k: usize,
    /// Number of hash tables.
    pub num_tables: usize,
    /// Bucket width `w` of each projection hash.
    pub width: f32,
    /// Buckets per table; `None` picks `max(1, n / 8)` at build time.
    pub table_size: Option<usize>,
    /// RNG seed.
    pub seed: u64,
}

impl Default for LshParams {
    fn default() -> Self {
        Self {
            k: 4,
            num_tables: 5,
            width: 4.0,
            table_size: None,
            seed: 1,
        }
    }
}

/// LSH index over a base matrix.
///
/// Each table maps a bucket index to `(base ID, identity)` pairs; the
/// identity is the full pre-modulus combined hash used for query-time
/// filtering.
pub struct LshIndex {
    base: Matrix,
    params: LshParams,
    table_size: usize,
    hashers: Vec<CombinedHash>,
    tables: Vec<HashMap<usize, Vec<(u32, u32)>>>,
}

impl LshIndex {
    /// Build an index over `base`.
    pub fn build(base: &Matrix, params: LshParams) -> Result<Self, VicinityError> {
        if params.k == 0 || params.num_tables == 0 {
            return Err(VicinityError::InvalidParameter(
                "lsh: k and L must be at least 1".to_string(),
            ));
        }
        if !(params.width > 0.0) {
            return Err(VicinityError::InvalidParameter(
                "lsh: w must be positive".to_string(),
            ));
        }
        if matches!(params.table_size, Some(0)) {
            return Err(VicinityError::InvalidParameter(
                "lsh: table size must be at least 1".to_string(),
            ));
        }

        let n = base.n();
        let table_size = params.table_size.unwrap_or_else(|| (n / 8).max(1));

        let mut rng = StdRng::seed_from_u64(params.seed);
        let hashers: Vec<CombinedHash> = (0..params.num_tables)
            .map(|_| CombinedHash::new(base.d(), params.width, params.k, &mut rng))
            .collect();

        let mut tables: Vec<HashMap<usize, Vec<(u32, u32)>>> =
            vec![HashMap::new(); params.num_tables];
        for (i, row) in base.rows().enumerate() {
            for (g, table) in hashers.iter().zip(&mut tables) {
                let id = g.identity(row);
                let bucket = g.bucket(id, table_size);
                table.entry(bucket).or_default().push((i as u32, id));
            }
        }

        tracing::info!(
            n,
            tables = params.num_tables,
            table_size,
            "lsh index built"
        );

        Ok(Self {
            base: base.clone(),
            params,
            table_size,
            hashers,
            tables,
        })
    }

    /// Candidate IDs for `query`: same-identity bucket entries unioned over
    /// all tables (deduplicated, table scan order). An empty union falls
    /// back to the entire base.
    fn candidates(&self, query: &[f32]) -> Vec<u32> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for (g, table) in self.hashers.iter().zip(&self.tables) {
            let query_id = g.identity(query);
            let bucket = g.bucket(query_id, self.table_size);
            let Some(entries) = table.get(&bucket) else {
                continue;
            };
            for &(id, entry_id) in entries {
                // querying trick: only same-identity entries count
                if entry_id == query_id && seen.insert(id) {
                    out.push(id);
                }
            }
        }

        if out.is_empty() {
            out.extend(0..self.base.n() as u32);
        }
        out
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

    /// Approximate top-N: exact L2 over the collected candidates, ascending.
    pub fn search(&self, query: &[f32], n: usize) -> Result<Vec<Neighbor>, VicinityError> {
        self.check_query(query)?;
        let scored = self
            .candidates(query)
            .into_iter()
            .map(|id| Neighbor::new(id, simd::l2_sq(self.base.row(id as usize), query)))
            .collect();
        let mut result = topk::top_n(scored, n);
        for nb in &mut result {
            nb.dist = nb.dist.sqrt();
        }
        Ok(result)
    }

    /// Approximate range search: candidate IDs within `radius` of `query`.
    pub fn search_range(&self, query: &[f32], radius: f32) -> Result<Vec<u32>, VicinityError> {
        self.check_query(query)?;
        let r_sq = radius * radius;
        Ok(self
            .candidates(query)
            .into_iter()
            .filter(|&id| simd::l2_sq(self.base.row(id as usize), query) <= r_sq)
            .collect())
    }

    /// Build-time parameters.
    pub fn params(&self) -> &LshParams {
        &self.params
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

    fn small_base() -> Matrix {
        Matrix::from_rows(&[
            vec![1.0, 2.0],
            vec![2.0, 1.0],
            vec![8.0, 9.0],
            vec![9.0, 8.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_finds_indexed_point_exactly() {
        let base = small_base();
        let index = LshIndex::build(&base, LshParams::default()).unwrap();

        // A base point hashes identically to itself in every table, so it is
        // always its own top candidate.
        for i in 0..base.n() {
            let top = index.search(base.row(i), 1).unwrap();
            assert_eq!(top[0].id, i as u32);
            assert_eq!(top[0].dist, 0.0);
        }
    }

    #[test]
    fn test_build_determinism() {
        let base = small_base();
        let a = LshIndex::build(&base, LshParams::default()).unwrap();
        let b = LshIndex::build(&base, LshParams::default()).unwrap();

        let query = [1.5, 2.0];
        assert_eq!(a.search(&query, 4).unwrap(), b.search(&query, 4).unwrap());
        assert_eq!(
            a.search_range(&query, 3.0).unwrap(),
            b.search_range(&query, 3.0).unwrap()
        );
    }

    #[test]
    fn test_rejects_bad_params() {
        let base = small_base();
        assert!(LshIndex::build(&base, LshParams { k: 0, ..LshParams::default() }).is_err());
        assert!(
            LshIndex::build(&base, LshParams { num_tables: 0, ..LshParams::default() }).is_err()
        );
        assert!(LshIndex::build(&base, LshParams { width: 0.0, ..LshParams::default() }).is_err());
        assert!(LshIndex::build(
            &base,
            LshParams { table_size: Some(0), ..LshParams::default() }
        )
        .is_err());
    }

    #[test]
    fn test_query_dimension_checked() {
        let base = small_base();
        let index = LshIndex::build(&base, LshParams::default()).unwrap();
        assert!(index.search(&[1.0], 1).is_err());
        assert!(index.search_range(&[1.0, 2.0, 3.0], 1.0).is_err());
    }

    #[test]
    fn test_auto_table_size_floor() {
        // n / 8 == 0 must clamp to one bucket rather than a zero-sized table
        let base = small_base();
        let index = LshIndex::build(&base, LshParams::default()).unwrap();
        assert_eq!(index.table_size, 1);
    }
}
