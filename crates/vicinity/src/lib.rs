//! Approximate nearest-neighbor search over dense f32 vectors under
//! Euclidean (L2) distance.
//!
//! Four index families share one numeric substrate (SIMD distance kernels,
//! k-means with k-means++ seeding, random-projection hashing, partial-sort
//! top-N selection):
//!
//! - **LSH**: `L` hash tables of combined random-projection hashes, with
//!   pre-modulus identity filtering of bucket collisions
//! - **Hypercube**: projection bits address vertices of a Hamming cube,
//!   probed in non-decreasing Hamming distance
//! - **IVF-Flat**: coarse k-means partitioning with exact re-scoring of the
//!   probed inverted lists
//! - **IVF-PQ**: coarse k-means plus product-quantized residual codes,
//!   scored through per-query lookup tables (ADC)
//!
//! A brute-force baseline ([`brute`]) provides exact results and the ground
//! truth for the evaluation helpers in [`eval`].
//!
//! Indexes are built once and read-only afterwards; built indexes are safe
//! to share across threads.
//!
//! # Example
//!
//! ```rust
//! use vicinity::ivf::{IvfFlatIndex, IvfFlatParams};
//! use vicinity::Matrix;
//!
//! let base = Matrix::from_rows(&[
//!     vec![0.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![10.0, 10.0],
//!     vec![10.0, 11.0],
//! ])?;
//!
//! let index = IvfFlatIndex::build(
//!     &base,
//!     IvfFlatParams { kclusters: 2, nprobe: 2, ..IvfFlatParams::default() },
//! )?;
//!
//! let nearest = index.search(&[0.0, 0.4], 1)?;
//! assert_eq!(nearest[0].id, 0);
//! # Ok::<(), vicinity::VicinityError>(())
//! ```

/// Exhaustive exact search; ground truth for the approximate methods.
pub mod brute;

/// MNIST and fvecs dataset decoders.
pub mod dataset;

/// Error types.
pub mod error;

/// Recall, approximation-factor, and timing aggregation.
pub mod eval;

/// Hypercube projection index.
pub mod hypercube;

/// Inverted-file indexes (IVF-Flat, IVF-PQ).
pub mod ivf;

/// K-means clustering with k-means++ seeding.
pub mod kmeans;

/// Locality-sensitive hashing index.
pub mod lsh;

/// Dense row-major matrix storage.
pub mod matrix;

pub(crate) mod projection;

/// SIMD-dispatched numeric kernels.
pub mod simd;

/// Top-N selection shared by every query path.
pub mod topk;

/// Unified index trait.
pub mod traits;

pub use error::VicinityError;
pub use matrix::Matrix;
pub use topk::Neighbor;
pub use traits::AnnIndex;

/// Common imports for typical use.
pub mod prelude {
    pub use crate::hypercube::{HypercubeIndex, HypercubeParams};
    pub use crate::ivf::{IvfFlatIndex, IvfFlatParams, IvfPqIndex, IvfPqParams};
    pub use crate::lsh::{LshIndex, LshParams};
    pub use crate::traits::AnnIndex;
    pub use crate::{Matrix, Neighbor, VicinityError};
}
