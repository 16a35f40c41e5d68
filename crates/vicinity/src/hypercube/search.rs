//! Hypercube index build and search.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::projection::L2Hash;
use crate::topk::{self, Neighbor};
use crate::{simd, Matrix, VicinityError};

/// Hypercube parameters.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HypercubeParams {
    /// Cube dimension: number of projection bits. At most 64.
    pub k: usize,
    /// Bucket width `w` of each projection hash.
    pub width: f32,
    /// Maximum candidates examined per query.
    pub max_candidates: usize,
    /// Maximum vertices visited per query, including the home vertex.
    pub probes: usize,
    /// RNG seed.
    pub seed: u64,
}

impl Default for HypercubeParams {
    fn default() -> Self {
        Self {
            k: 14,
            width: 4.0,
            max_candidates: 10,
            probes: 2,
            seed: 1,
        }
    }
}

/// The lazy bit labelings `f_i` plus the RNG that feeds them.
///
/// One lock guards both so that lookup-or-sample is atomic: concurrent
/// queries discovering the same unseen key agree on the first writer's draw,
/// and a written bit never changes.
struct BitLabels {
    tables: Vec<HashMap<i64, u64>>,
    rng: StdRng,
}

/// Hypercube index over a base matrix.
pub struct HypercubeIndex {
    base: Matrix,
    params: HypercubeParams,
    hashes: Vec<L2Hash>,
    labels: Mutex<BitLabels>,
    cube: HashMap<u64, Vec<u32>>,
}

impl HypercubeIndex {
    /// Build an index over `base`.
    pub fn build(base: &Matrix, params: HypercubeParams) -> Result<Self, VicinityError> {
        if params.k == 0 || params.k > 64 {
            return Err(VicinityError::InvalidParameter(format!(
                "hypercube: k must be in [1, 64], got {}",
                params.k
            )));
        }
        if !(params.width > 0.0) {
            return Err(VicinityError::InvalidParameter(
                "hypercube: w must be positive".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let hashes: Vec<L2Hash> = (0..params.k)
            .map(|_| L2Hash::new(base.d(), params.width, &mut rng))
            .collect();

        let mut index = Self {
            base: base.clone(),
            labels: Mutex::new(BitLabels {
                tables: vec![HashMap::new(); params.k],
                rng,
            }),
            params,
            hashes,
            cube: HashMap::new(),
        };

        let mut cube: HashMap<u64, Vec<u32>> = HashMap::new();
        for (i, row) in index.base.rows().enumerate() {
            cube.entry(index.vertex_of(row)).or_default().push(i as u32);
        }
        index.cube = cube;

        tracing::info!(
            n = index.base.n(),
            bits = index.params.k,
            vertices = index.cube.len(),
            "hypercube index built"
        );

        Ok(index)
    }

    /// Compute the packed vertex `g(p)`, sampling any unseen `f_i` bits.
    /// Bit `i` of the result is `f_i(h_i(p))`.
    fn vertex_of(&self, p: &[f32]) -> u64 {
        let h: Vec<i64> = self.hashes.iter().map(|hash| hash.hash(p)).collect();

        let mut guard = self.labels.lock().expect("bit label lock poisoned");
        let BitLabels { tables, rng } = &mut *guard;

        let mut vertex = 0u64;
        for (i, &hv) in h.iter().enumerate() {
            let bit = *tables[i].entry(hv).or_insert_with(|| rng.gen_range(0..2u64));
            vertex |= bit << i;
        }
        vertex
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

    /// Candidate IDs for `query`: vertices visited in Hamming order until
    /// the candidate budget or probe budget is exhausted. Deduplicated,
    /// visit order.
    fn candidates(&self, query: &[f32]) -> Vec<u32> {
        let home = self.vertex_of(query);
        let limit = self.params.probes.max(1);
        let budget = self.params.max_candidates;

        let mut seen = HashSet::new();
        let mut out = Vec::new();

        'probing: for vertex in enumerate_probes(home, self.params.k, limit) {
            let Some(ids) = self.cube.get(&vertex) else {
                continue;
            };
            for &id in ids {
                if out.len() >= budget {
                    break 'probing;
                }
                if seen.insert(id) {
                    out.push(id);
                }
            }
        }
        out
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

    /// Occupied vertices and their member IDs, sorted by vertex key.
    /// For testing/debugging.
    pub fn vertices(&self) -> Vec<(u64, Vec<u32>)> {
        let mut out: Vec<(u64, Vec<u32>)> = self
            .cube
            .iter()
            .map(|(&v, ids)| (v, ids.clone()))
            .collect();
        out.sort_unstable_by_key(|&(v, _)| v);
        out
    }
}

/// Up to `limit` vertices in non-decreasing Hamming distance from `home`:
/// home first, then single-bit flips in index order, then pair flips
/// `(i, j), i < j` in lexicographic order, then breadth-first expansion with
/// a visited set.
fn enumerate_probes(home: u64, k: usize, limit: usize) -> Vec<u64> {
    let mut order = vec![home];
    if limit <= 1 {
        return order;
    }

    // distance 1
    for i in 0..k {
        if order.len() >= limit {
            return order;
        }
        order.push(home ^ (1 << i));
    }

    // distance 2: pair flips
    for i in 0..k {
        for j in (i + 1)..k {
            if order.len() >= limit {
                return order;
            }
            order.push(home ^ (1 << i) ^ (1 << j));
        }
    }

    // distance 3+: breadth-first from the full distance-<=2 frontier
    let mut visited: HashSet<u64> = order.iter().copied().collect();
    let mut queue: VecDeque<u64> = order.iter().copied().collect();
    while let Some(current) = queue.pop_front() {
        for i in 0..k {
            let neighbor = current ^ (1 << i);
            if visited.insert(neighbor) {
                order.push(neighbor);
                if order.len() >= limit {
                    return order;
                }
                queue.push_back(neighbor);
            }
        }
    }
    order
}
