use super::model::{AccessibilityMatrix, Sets};
use crate::error::{DataError, Result};

/// Share of demand nodes each POD should cover at the chosen threshold.
pub const DEFAULT_TARGET_COVERAGE: f64 = 0.5;
/// Number of evenly spaced candidates in the default τ search range.
pub const DEFAULT_TAU_STEPS: usize = 100;

/// `num` evenly spaced values from `start` to `stop`, both ends included.
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num)
                .map(|k| if k == num - 1 { stop } else { start + step * k as f64 })
                .collect()
        }
    }
}

/// Default τ candidates: 100 values over `[0, 1]`.
pub fn default_tau_range() -> Vec<f64> {
    linspace(0.0, 1.0, DEFAULT_TAU_STEPS)
}

// ---------------------------------------------------------------------------
// Coverage counting
// ---------------------------------------------------------------------------

/// All scores of each POD across every scenario, sorted ascending so the
/// number of scores at or above a threshold is a binary search away.
struct PodScoreIndex {
    per_pod: Vec<Vec<f64>>,
}

impl PodScoreIndex {
    fn build<'a>(matrices: impl IntoIterator<Item = &'a AccessibilityMatrix>, sets: &Sets) -> Self {
        let mut per_pod = vec![Vec::new(); sets.pods as usize];
        for matrix in matrices {
            for (pod, _node, score) in matrix.entries() {
                if let Some(scores) = per_pod.get_mut(pod as usize - 1) {
                    scores.push(score);
                }
            }
        }
        for scores in &mut per_pod {
            scores.sort_by(f64::total_cmp);
        }
        Self { per_pod }
    }

    /// Entries of `pod_idx` whose score is `>= tau`.
    fn covered(&self, pod_idx: usize, tau: f64) -> usize {
        let scores = &self.per_pod[pod_idx];
        scores.len() - scores.partition_point(|&s| s < tau)
    }
}

/// Mean absolute gap between each POD's coverage share and the target, for
/// every candidate τ in order.
///
/// A POD covers an entry when the entry's score is at least τ. Coverage is
/// counted over all scenarios and divided by |I|.
pub fn tau_deviations<'a>(
    matrices: impl IntoIterator<Item = &'a AccessibilityMatrix>,
    sets: &Sets,
    target_coverage: f64,
    tau_range: &[f64],
) -> Vec<(f64, f64)> {
    let index = PodScoreIndex::build(matrices, sets);
    let demand_points = sets.demand_nodes.max(1) as f64;
    let pods = sets.pods.max(1) as f64;

    tau_range
        .iter()
        .map(|&tau| {
            let total: f64 = (0..index.per_pod.len())
                .map(|j| (index.covered(j, tau) as f64 / demand_points - target_coverage).abs())
                .sum();
            (tau, total / pods)
        })
        .collect()
}

/// The τ from `tau_range` with the smallest coverage deviation. Ties go to
/// the candidate that comes first in `tau_range`.
pub fn find_optimal_tau<'a>(
    matrices: impl IntoIterator<Item = &'a AccessibilityMatrix>,
    sets: &Sets,
    target_coverage: f64,
    tau_range: &[f64],
) -> Result<f64> {
    tau_deviations(matrices, sets, target_coverage, tau_range)
        .into_iter()
        .fold(None, |best: Option<(f64, f64)>, (tau, dev)| match best {
            Some((_, best_dev)) if best_dev <= dev => best,
            _ => Some((tau, dev)),
        })
        .map(|(tau, _)| tau)
        .ok_or(DataError::EmptyTauRange)
}
