//! LSH (Locality Sensitive Hashing) for Euclidean distance.
//!
//! `L` hash tables, each keyed by a combination of `k` random-projection
//! hashes `h_i(p) = floor((v_i . p + t_i) / w)`. Bucket collisions are
//! filtered with the full pre-modulus hash identity (the "querying trick"),
//! which cheaply excludes points that collide only through the table-size
//! modulus.
//!
//! # References
//!
//! - Indyk & Motwani (1998): "Approximate nearest neighbors: towards removing
//!   the curse of dimensionality"
//! - Datar et al. (2004): "Locality-sensitive hashing scheme based on p-stable
//!   distributions"

mod hash;
mod search;

pub use search::{LshIndex, LshParams};
