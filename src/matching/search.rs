use serde::Serialize;

use super::regression::{fit, interpolate};
use crate::config::MatchParams;

/// Fewest interpolated points a candidate shift needs to be scored.
pub const MIN_POINTS: usize = 3;

/// R² values closer than this are considered tied.
const SCORE_EPS: f64 = 1e-12;

/// Winning shift of one group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShiftEstimate {
    pub delta: f64,
    pub r2: f64,
}

/// Grid `delta_from, delta_from + step, …, ≤ delta_to`, restricted to `|δ| ≤ max_shift`.
pub fn candidate_shifts(params: &MatchParams) -> Vec<f64> {
    let steps = ((params.delta_to - params.delta_from) / params.delta_step + 1e-9).floor() as usize;
    (0..=steps)
        .map(|i| params.delta_from + i as f64 * params.delta_step)
        // keep the grid on clean decimals, `-3 + 31 * 0.1` is not `0.1`
        .map(|d| (d * 1e9).round() / 1e9)
        .filter(|d| d.abs() <= params.max_shift + 1e-9)
        .collect()
}

/// R² of the wireline log (interpolated at core depths shifted by `delta`)
/// explaining the core log. Core points falling outside the wireline log are ignored.
pub fn score_shift(wireline: &[(f64, f64)], core: &[(f64, f64)], delta: f64) -> Option<f64> {
    let (x, y): (Vec<f64>, Vec<f64>) = core
        .iter()
        .filter_map(|&(depth, value)| interpolate(wireline, depth + delta).map(|w| (w, value)))
        .unzip();
    if x.len() < MIN_POINTS {
        return None;
    }
    fit(&x, &y).map(|f| f.r2)
}

/// Highest-scoring candidate. Ties go to the smallest `|δ|`, then the smaller `δ`.
pub fn best_shift(
    wireline: &[(f64, f64)],
    core: &[(f64, f64)],
    candidates: &[f64],
) -> Option<ShiftEstimate> {
    candidates
        .iter()
        .filter_map(|&delta| score_shift(wireline, core, delta).map(|r2| ShiftEstimate { delta, r2 }))
        .reduce(|best, next| if beats(&next, &best) { next } else { best })
}

fn beats(a: &ShiftEstimate, b: &ShiftEstimate) -> bool {
    if (a.r2 - b.r2).abs() > SCORE_EPS {
        return a.r2 > b.r2;
    }
    match a.delta.abs().total_cmp(&b.delta.abs()) {
        std::cmp::Ordering::Equal => a.delta < b.delta,
        ord => ord.is_lt(),
    }
}
