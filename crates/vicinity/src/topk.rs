//! Top-N selection shared by every query path.

use std::cmp::Ordering;

/// A scored candidate: base ID plus distance.
///
/// Whether `dist` is an exact L2 value, a squared L2 value, or an ADC
/// estimate depends on the pipeline stage; orderings agree because the
/// square root is monotone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub id: u32,
    pub dist: f32,
}

impl Neighbor {
    #[inline]
    pub fn new(id: u32, dist: f32) -> Self {
        Self { id, dist }
    }
}

fn cmp_neighbor(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.dist
        .partial_cmp(&b.dist)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.id.cmp(&b.id))
}

/// Keep the `n` smallest-distance candidates, ascending, ties broken by
/// ascending ID.
///
/// A select-nth partition bounds the work before the prefix is sorted; the
/// candidate list is never fully sorted when it is longer than `n`.
pub fn top_n(mut candidates: Vec<Neighbor>, n: usize) -> Vec<Neighbor> {
    if n == 0 {
        return Vec::new();
    }
    if candidates.len() > n {
        candidates.select_nth_unstable_by(n, cmp_neighbor);
        candidates.truncate(n);
    }
    candidates.sort_unstable_by(cmp_neighbor);
    candidates
}
