//! Unified trait over the approximate index implementations.

use crate::hypercube::HypercubeIndex;
use crate::ivf::{IvfFlatIndex, IvfPqIndex};
use crate::lsh::LshIndex;
use crate::topk::Neighbor;
use crate::VicinityError;

/// Common query surface of every approximate index.
///
/// The concrete `build` constructors stay on the individual types since
/// their parameter sets differ; once built, all indexes answer the same two
/// questions.
pub trait AnnIndex {
    /// Approximate top-N neighbors of `query`, ascending distance.
    fn search(&self, query: &[f32], n: usize) -> Result<Vec<Neighbor>, VicinityError>;

    /// IDs of base points within `radius` of `query`.
    fn search_range(&self, query: &[f32], radius: f32) -> Result<Vec<u32>, VicinityError>;

    /// Vector dimension.
    fn dimension(&self) -> usize;

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    /// True when the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable method name.
    fn method(&self) -> &'static str;
}

impl AnnIndex for LshIndex {
    fn search(&self, query: &[f32], n: usize) -> Result<Vec<Neighbor>, VicinityError> {
        self.search(query, n)
    }

    fn search_range(&self, query: &[f32], radius: f32) -> Result<Vec<u32>, VicinityError> {
        self.search_range(query, radius)
    }

    fn dimension(&self) -> usize {
        self.dimension()
    }

    fn len(&self) -> usize {
        self.len()
    }

    fn method(&self) -> &'static str {
        "LSH"
    }
}

impl AnnIndex for HypercubeIndex {
    fn search(&self, query: &[f32], n: usize) -> Result<Vec<Neighbor>, VicinityError> {
        self.search(query, n)
    }

    fn search_range(&self, query: &[f32], radius: f32) -> Result<Vec<u32>, VicinityError> {
        self.search_range(query, radius)
    }

    fn dimension(&self) -> usize {
        self.dimension()
    }

    fn len(&self) -> usize {
        self.len()
    }

    fn method(&self) -> &'static str {
        "Hypercube"
    }
}

impl AnnIndex for IvfFlatIndex {
    fn search(&self, query: &[f32], n: usize) -> Result<Vec<Neighbor>, VicinityError> {
        self.search(query, n)
    }

    fn search_range(&self, query: &[f32], radius: f32) -> Result<Vec<u32>, VicinityError> {
        self.search_range(query, radius)
    }

    fn dimension(&self) -> usize {
        self.dimension()
    }

    fn len(&self) -> usize {
        self.len()
    }

    fn method(&self) -> &'static str {
        "IVFFlat"
    }
}

impl AnnIndex for IvfPqIndex {
    fn search(&self, query: &[f32], n: usize) -> Result<Vec<Neighbor>, VicinityError> {
        self.search(query, n)
    }

    fn search_range(&self, query: &[f32], radius: f32) -> Result<Vec<u32>, VicinityError> {
        self.search_range(query, radius)
    }

    fn dimension(&self) -> usize {
        self.dimension()
    }

    fn len(&self) -> usize {
        self.len()
    }

    fn method(&self) -> &'static str {
        "IVFPQ"
    }
}
