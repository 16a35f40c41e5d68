//! Error types for vicinity.

use std::fmt;
use std::io;

/// Errors that can occur while loading datasets or building and querying
/// indexes.
#[derive(Debug)]
pub enum VicinityError {
    /// Index contains no vectors.
    EmptyIndex,
    /// Invalid build or query parameter.
    InvalidParameter(String),
    /// Dimension mismatch between a query (or row) and the index.
    DimensionMismatch { expected: usize, actual: usize },
    /// A dataset file violates its format (bad magic, short read, mixed
    /// dimensions).
    MalformedDataset(String),
    /// Underlying I/O failure.
    Io(io::Error),
}

impl fmt::Display for VicinityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VicinityError::EmptyIndex => write!(f, "Index is empty"),
            VicinityError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            VicinityError::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "Dimension mismatch: expected {} dimensions, got {}",
                    expected, actual
                )
            }
            VicinityError::MalformedDataset(msg) => write!(f, "Malformed dataset: {}", msg),
            VicinityError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for VicinityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VicinityError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for VicinityError {
    fn from(err: io::Error) -> Self {
        VicinityError::Io(err)
    }
}
