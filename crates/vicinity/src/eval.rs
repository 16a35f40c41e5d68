//! Evaluation metrics against brute-force ground truth.

use std::collections::HashSet;
use std::time::Duration;

use crate::topk::Neighbor;

/// Recall@N: `|retrieved ∩ ground_truth| / min(n, |ground_truth|)`.
///
/// Only the first `n` entries of either list participate.
pub fn recall_at_n(ground_truth: &[u32], retrieved: &[u32], n: usize) -> f32 {
    let denom = ground_truth.len().min(n);
    if denom == 0 {
        return 0.0;
    }
    let truth: HashSet<u32> = ground_truth.iter().take(n).copied().collect();
    let hits = retrieved
        .iter()
        .take(n)
        .filter(|id| truth.contains(id))
        .count();
    hits as f32 / denom as f32
}

/// Approximation factor of one query: approximate top-1 distance over true
/// top-1 distance.
///
/// `None` when either list is empty or when the true distance is zero but
/// the approximate one is not (the ratio is undefined).
pub fn approximation_factor(approx: &[Neighbor], truth: &[Neighbor]) -> Option<f32> {
    let a = approx.first()?.dist;
    let t = truth.first()?.dist;
    if t > 0.0 {
        Some(a / t)
    } else if a == 0.0 {
        Some(1.0)
    } else {
        None
    }
}

/// Aggregated figures for a full query run.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvalSummary {
    /// Mean approximation factor over queries where it is defined.
    pub average_af: f32,
    /// Mean recall@N over all queries.
    pub recall_at_n: f32,
    /// Approximate-search throughput, queries per second.
    pub qps: f32,
    /// Mean approximate query time, milliseconds.
    pub t_approx_ms: f32,
    /// Mean brute-force query time, milliseconds.
    pub t_true_ms: f32,
}

/// Accumulates per-query results into an [`EvalSummary`].
#[derive(Default)]
pub struct EvalAccumulator {
    queries: usize,
    af_sum: f64,
    af_count: usize,
    recall_sum: f64,
    approx_time: Duration,
    true_time: Duration,
}

impl EvalAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one query: approximate and ground-truth top-N lists plus the
    /// time each took.
    pub fn record(
        &mut self,
        approx: &[Neighbor],
        truth: &[Neighbor],
        n: usize,
        t_approx: Duration,
        t_true: Duration,
    ) {
        self.queries += 1;
        self.approx_time += t_approx;
        self.true_time += t_true;

        if let Some(af) = approximation_factor(approx, truth) {
            self.af_sum += af as f64;
            self.af_count += 1;
        }

        let truth_ids: Vec<u32> = truth.iter().map(|nb| nb.id).collect();
        let approx_ids: Vec<u32> = approx.iter().map(|nb| nb.id).collect();
        self.recall_sum += recall_at_n(&truth_ids, &approx_ids, n) as f64;
    }

    /// Number of recorded queries.
    pub fn queries(&self) -> usize {
        self.queries
    }

    pub fn summary(&self) -> EvalSummary {
        let q = self.queries.max(1) as f64;
        let approx_secs = self.approx_time.as_secs_f64();
        EvalSummary {
            average_af: if self.af_count > 0 {
                (self.af_sum / self.af_count as f64) as f32
            } else {
                0.0
            },
            recall_at_n: (self.recall_sum / q) as f32,
            qps: if approx_secs > 0.0 {
                (self.queries as f64 / approx_secs) as f32
            } else {
                0.0
            },
            t_approx_ms: (self.approx_time.as_secs_f64() * 1000.0 / q) as f32,
            t_true_ms: (self.true_time.as_secs_f64() * 1000.0 / q) as f32,
        }
    }
}
