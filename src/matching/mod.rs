/// Core-to-log depth matching.
///
/// ```text
///  boring_intervals ──► grouping (gap ≤ 2·max_shift)
///                           │
///                           ▼  one group at a time (rayon)
///   logs[mnemonic] ───► search: grid over δ, R² of OLS fit
///   core_logs[mnemonic]     │
///                           ▼
///  core_lithology ────► DepthShift per lithology interval
///                           │
///                           ▼
///                       apply: core_logs, core_properties, core_lithology
/// ```

pub mod apply;
pub mod grouping;
pub mod regression;
pub mod search;

use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::MatchParams;
use crate::data::model::Interval;
use crate::error::Result;

use apply::{DepthShift, ShiftStats};
use grouping::{group_contiguous, span};
use search::{best_shift, candidate_shifts, ShiftEstimate};

/// Outcome of one contiguous group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMatch {
    pub depth_from: f64,
    pub depth_to: f64,
    pub boring_intervals: usize,
    pub core_points: usize,
    /// `None` when no candidate shift could be scored; the group is left unshifted.
    pub estimate: Option<ShiftEstimate>,
}

impl GroupMatch {
    pub fn skipped(&self) -> bool {
        self.estimate.is_none()
    }
}

/// Everything `match_core_logs` decided and did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchReport {
    pub mnemonic: String,
    pub groups: Vec<GroupMatch>,
    pub shifts: Vec<DepthShift>,
    pub core_logs: ShiftStats,
    pub core_properties: Option<ShiftStats>,
}

/// Search a shift per group and turn the winners into per-lithology records.
///
/// `wireline` and `core` are `(depth, value)` points sorted by depth;
/// `boring` and `lithology` are sorted by top.
pub fn plan_shifts(
    wireline: &[(f64, f64)],
    core: &[(f64, f64)],
    boring: &[Interval],
    lithology: &[Interval],
    params: &MatchParams,
) -> Result<(Vec<GroupMatch>, Vec<DepthShift>)> {
    params.validate()?;
    let candidates = candidate_shifts(params);
    let groups = group_contiguous(boring, params.gap_threshold())?;

    let matches: Vec<GroupMatch> = groups
        .par_iter()
        .filter_map(|group| span(group).map(|s| (group.len(), s)))
        .map(|(boring_intervals, s)| {
            let group_core: Vec<(f64, f64)> =
                core.iter().copied().filter(|&(d, _)| s.contains(d)).collect();
            GroupMatch {
                depth_from: s.depth_from,
                depth_to: s.depth_to,
                boring_intervals,
                core_points: group_core.len(),
                estimate: best_shift(wireline, &group_core, &candidates),
            }
        })
        .collect();

    let mut shifts = Vec::new();
    for m in &matches {
        let Some(estimate) = m.estimate else {
            warn!(
                "no shift found for [{}, {}) ({} core points), leaving it unshifted",
                m.depth_from, m.depth_to, m.core_points
            );
            continue;
        };
        info!(
            "[{}, {}): δ = {} (R² = {:.4})",
            m.depth_from, m.depth_to, estimate.delta, estimate.r2
        );
        let group_span = Interval::new(m.depth_from, m.depth_to);
        shifts.extend(
            lithology
                .iter()
                .filter(|iv| group_span.contains(iv.depth_from))
                .map(|iv| DepthShift {
                    depth_from: iv.depth_from,
                    depth_to: iv.depth_to,
                    delta: estimate.delta,
                }),
        );
    }
    Ok((matches, shifts))
}

/// R² of a core log against a wireline log with no shift applied.
pub fn matching_r2(wireline: &[(f64, f64)], core: &[(f64, f64)]) -> Option<f64> {
    search::score_shift(wireline, core, 0.0)
}
