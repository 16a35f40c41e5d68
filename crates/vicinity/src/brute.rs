//! Exhaustive (exact) nearest-neighbor search.
//!
//! Used as the ground truth when evaluating the approximate indexes, and to
//! build full k-NN graphs over a base set.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::topk::{self, Neighbor};
use crate::{simd, Matrix, VicinityError};

/// Neighbor-ID sentinel used to pad k-NN graph rows when fewer than `k`
/// neighbors exist.
pub const NO_NEIGHBOR: i32 = -1;

fn scan(base: &Matrix, query: &[f32]) -> Vec<Neighbor> {
    base.rows()
        .enumerate()
        .map(|(i, row)| Neighbor::new(i as u32, simd::l2_sq(row, query)))
        .collect()
}

/// Exact top-N: the `n` closest base points by L2 distance, ascending, ties
/// broken by ascending ID.
pub fn top_n(base: &Matrix, query: &[f32], n: usize) -> Result<Vec<Neighbor>, VicinityError> {
    if query.len() != base.d() {
        return Err(VicinityError::DimensionMismatch {
            expected: base.d(),
            actual: query.len(),
        });
    }
    let mut result = topk::top_n(scan(base, query), n);
    for nb in &mut result {
        nb.dist = nb.dist.sqrt();
    }
    Ok(result)
}

/// Exact range search: IDs of all base points with L2 distance `<= radius`,
/// in scan order.
pub fn range(base: &Matrix, query: &[f32], radius: f32) -> Result<Vec<u32>, VicinityError> {
    if query.len() != base.d() {
        return Err(VicinityError::DimensionMismatch {
            expected: base.d(),
            actual: query.len(),
        });
    }
    let r_sq = radius * radius;
    Ok(base
        .rows()
        .enumerate()
        .filter(|(_, row)| simd::l2_sq(row, query) <= r_sq)
        .map(|(i, _)| i as u32)
        .collect())
}

/// Full k-NN graph over the base set, flattened row-major to `n * k` entries.
///
/// Each point's row holds its `k` nearest neighbors excluding the point
/// itself, padded with [`NO_NEIGHBOR`] when fewer exist.
pub fn knn_graph(base: &Matrix, k: usize) -> Vec<i32> {
    if base.is_empty() || k == 0 {
        return Vec::new();
    }
    let n = base.n();
    let mut graph = vec![NO_NEIGHBOR; n * k];
    for i in 0..n {
        // k+1 because the point itself is among its own nearest neighbors
        let neighbors = topk::top_n(scan(base, base.row(i)), k + 1);
        let row = &mut graph[i * k..(i + 1) * k];
        let mut filled = 0;
        for nb in neighbors {
            if nb.id as usize == i {
                continue;
            }
            row[filled] = nb.id as i32;
            filled += 1;
            if filled == k {
                break;
            }
        }
    }
    graph
}

/// Write a k-NN graph as little-endian binary: `i32 n`, `i32 k`, then the
/// `n * k` neighbor IDs (sentinel padding included).
pub fn save_knn_graph(
    path: &Path,
    graph: &[i32],
    n: usize,
    k: usize,
) -> Result<(), VicinityError> {
    if graph.len() != n * k {
        return Err(VicinityError::InvalidParameter(format!(
            "graph length {} does not match {}x{}",
            graph.len(),
            n,
            k
        )));
    }
    let mut out = BufWriter::new(File::create(path)?);
    out.write_i32::<LittleEndian>(n as i32)?;
    out.write_i32::<LittleEndian>(k as i32)?;
    for &id in graph {
        out.write_i32::<LittleEndian>(id)?;
    }
    out.flush()?;
    Ok(())
}
