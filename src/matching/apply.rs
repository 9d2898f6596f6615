use serde::Serialize;

use crate::config::UncoveredRows;
use crate::data::model::{DepthFrame, Interval, IntervalFrame};

/// Add `delta` to any core-derived depth originally inside `[depth_from, depth_to)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepthShift {
    pub depth_from: f64,
    pub depth_to: f64,
    pub delta: f64,
}

impl DepthShift {
    pub fn interval(&self) -> Interval {
        Interval::new(self.depth_from, self.depth_to)
    }
}

/// Row counts of one shifted dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShiftStats {
    pub shifted: usize,
    pub uncovered: usize,
    pub dropped: usize,
}

/// Shift every row by the first record containing its depth and re-sort.
///
/// Rows no record covers follow `policy`.
pub fn shift_depth_frame(
    frame: &DepthFrame,
    shifts: &[DepthShift],
    policy: UncoveredRows,
) -> (DepthFrame, ShiftStats) {
    let mut stats = ShiftStats::default();
    let mut out = DepthFrame {
        columns: frame.columns.clone(),
        depths: Vec::with_capacity(frame.len()),
        rows: Vec::with_capacity(frame.len()),
    };

    for (&depth, row) in frame.depths.iter().zip(&frame.rows) {
        let new_depth = match shifts.iter().find(|s| s.interval().contains(depth)) {
            Some(shift) => {
                stats.shifted += 1;
                depth + shift.delta
            }
            None => {
                stats.uncovered += 1;
                if policy == UncoveredRows::Drop {
                    stats.dropped += 1;
                    continue;
                }
                depth
            }
        };
        out.depths.push(new_depth);
        out.rows.push(row.clone());
    }

    out.sort_by_depth();
    (out, stats)
}

/// Move each interval that has a record for exactly its original bounds.
pub fn shift_interval_frame(frame: &IntervalFrame, shifts: &[DepthShift]) -> IntervalFrame {
    let mut order: Vec<(Interval, usize)> = frame
        .intervals
        .iter()
        .enumerate()
        .map(|(i, iv)| {
            let moved = shifts
                .iter()
                .find(|s| s.interval() == *iv)
                .map_or(*iv, |s| Interval::new(iv.depth_from + s.delta, iv.depth_to + s.delta));
            (moved, i)
        })
        .collect();
    order.sort_by(|a, b| a.0.depth_from.total_cmp(&b.0.depth_from));

    IntervalFrame {
        columns: frame.columns.clone(),
        intervals: order.iter().map(|(iv, _)| *iv).collect(),
        rows: order.iter().map(|(_, i)| frame.rows[*i].clone()).collect(),
    }
}
