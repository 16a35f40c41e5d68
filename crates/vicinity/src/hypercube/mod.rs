//! Hypercube projection index for Euclidean distance.
//!
//! Each of `k` projection hashes `h_i` is folded to a single bit through a
//! lazy random labeling `f_i`; the concatenated bits address a vertex of a
//! `k`-dimensional Hamming cube. Queries visit the home vertex and up to
//! `probes - 1` nearby vertices in non-decreasing Hamming distance, then
//! re-score the collected candidates exactly.
//!
//! Vertices are packed `u64` keys (so `k <= 64`), which makes the
//! Hamming-order enumeration plain bit flips.

mod search;

pub use search::{HypercubeIndex, HypercubeParams};
