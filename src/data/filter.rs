use super::model::{Dataset, DepthFrame, IntervalFrame};

// ---------------------------------------------------------------------------
// Depth-range predicates shared by `load` and `slice`
// ---------------------------------------------------------------------------

/// Rows whose depth lies in `[depth_from, depth_to)`.
pub fn filter_depth_frame(frame: &DepthFrame, depth_from: f64, depth_to: f64) -> DepthFrame {
    let keep: Vec<usize> = frame
        .depths
        .iter()
        .enumerate()
        .filter(|&(_, &d)| depth_from <= d && d < depth_to)
        .map(|(i, _)| i)
        .collect();

    DepthFrame {
        columns: frame.columns.clone(),
        depths: keep.iter().map(|&i| frame.depths[i]).collect(),
        rows: keep.iter().map(|&i| frame.rows[i].clone()).collect(),
    }
}

/// Rows whose interval intersects `[depth_from, depth_to)`.
///
/// Intervals are kept whole, not clipped to the range.
pub fn filter_interval_frame(
    frame: &IntervalFrame,
    depth_from: f64,
    depth_to: f64,
) -> IntervalFrame {
    let keep: Vec<usize> = frame
        .intervals
        .iter()
        .enumerate()
        .filter(|(_, iv)| iv.overlaps(depth_from, depth_to))
        .map(|(i, _)| i)
        .collect();

    IntervalFrame {
        columns: frame.columns.clone(),
        intervals: keep.iter().map(|&i| frame.intervals[i]).collect(),
        rows: keep.iter().map(|&i| frame.rows[i].clone()).collect(),
    }
}

/// Apply the predicate matching the dataset's kind. Unindexed data is copied verbatim.
pub fn filter_dataset(dataset: &Dataset, depth_from: f64, depth_to: f64) -> Dataset {
    match dataset {
        Dataset::Depth(f) => Dataset::Depth(filter_depth_frame(f, depth_from, depth_to)),
        Dataset::Interval(f) => Dataset::Interval(filter_interval_frame(f, depth_from, depth_to)),
        Dataset::Plain(t) => Dataset::Plain(t.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Interval, Value};

    #[test]
    fn depth_filter_is_half_open() {
        let frame = DepthFrame {
            columns: vec!["GK".into()],
            depths: vec![99.0, 100.0, 150.0, 200.0],
            rows: (0..4).map(|i| vec![Value::Integer(i)]).collect(),
        };
        let f = filter_depth_frame(&frame, 100.0, 200.0);
        assert_eq!(f.depths, vec![100.0, 150.0]);
        assert_eq!(f.rows, vec![vec![Value::Integer(1)], vec![Value::Integer(2)]]);
    }

    #[test]
    fn interval_filter_keeps_overlapping_rows_whole() {
        let frame = IntervalFrame {
            columns: vec![],
            intervals: vec![
                Interval::new(50.0, 100.0),
                Interval::new(90.0, 110.0),
                Interval::new(150.0, 250.0),
                Interval::new(200.0, 300.0),
            ],
            rows: vec![vec![]; 4],
        };
        let f = filter_interval_frame(&frame, 100.0, 200.0);
        assert_eq!(
            f.intervals,
            vec![Interval::new(90.0, 110.0), Interval::new(150.0, 250.0)]
        );
    }
}
