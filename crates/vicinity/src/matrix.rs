//! Dense row-major matrix of f32 vectors.

use crate::VicinityError;

/// An immutable dense table of `n` vectors in dimension `d`, stored in one
/// contiguous row-major buffer of length `n * d`.
///
/// This is the storage shape every index in the crate builds from: base sets,
/// centroid sets, and PQ codebooks are all `Matrix` values.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    n: usize,
    d: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// Create a matrix from a flat row-major buffer.
    ///
    /// Fails when `d == 0`, when `n * d` overflows, or when the buffer length
    /// is not exactly `n * d`.
    pub fn new(n: usize, d: usize, data: Vec<f32>) -> Result<Self, VicinityError> {
        if d == 0 {
            return Err(VicinityError::InvalidParameter(
                "matrix dimension must be at least 1".to_string(),
            ));
        }
        let expected = n.checked_mul(d).ok_or_else(|| {
            VicinityError::InvalidParameter(format!("matrix shape {}x{} overflows", n, d))
        })?;
        if data.len() != expected {
            return Err(VicinityError::InvalidParameter(format!(
                "buffer length {} does not match shape {}x{}",
                data.len(),
                n,
                d
            )));
        }
        Ok(Self { n, d, data })
    }

    /// Create a matrix by copying a slice of equal-length rows.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self, VicinityError> {
        let d = match rows.first() {
            Some(row) => row.len(),
            None => {
                return Err(VicinityError::InvalidParameter(
                    "cannot infer dimension from zero rows".to_string(),
                ))
            }
        };
        let mut data = Vec::with_capacity(rows.len() * d);
        for row in rows {
            if row.len() != d {
                return Err(VicinityError::DimensionMismatch {
                    expected: d,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Matrix::new(rows.len(), d, data)
    }

    /// Number of rows.
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Dimension (columns).
    #[inline]
    pub fn d(&self) -> usize {
        self.d
    }

    /// True when the matrix has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Row `i` as a read-only view of length `d`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        let start = i * self.d;
        &self.data[start..start + self.d]
    }

    /// Iterate over all rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.d)
    }

    /// The flat row-major buffer.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
