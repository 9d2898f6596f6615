use crate::data::model::Interval;
use crate::error::{Result, WellError};

/// Split sorted, non-overlapping boring intervals into maximal runs whose
/// consecutive gaps (`next.depth_from - prev.depth_to`) are at most `threshold`.
///
/// Every input interval lands in exactly one group, order is preserved.
pub fn group_contiguous(intervals: &[Interval], threshold: f64) -> Result<Vec<Vec<Interval>>> {
    if threshold.is_nan() || threshold < 0.0 {
        return Err(WellError::validation(format!(
            "gap threshold must be non-negative, got {threshold}"
        )));
    }

    let mut groups: Vec<Vec<Interval>> = Vec::new();
    for &interval in intervals {
        let joins = groups
            .last()
            .and_then(|group| group.last())
            .is_some_and(|prev| interval.depth_from - prev.depth_to <= threshold);
        match groups.last_mut() {
            Some(group) if joins => group.push(interval),
            _ => groups.push(vec![interval]),
        }
    }
    Ok(groups)
}

/// Combined span `[min depth_from, max depth_to)` of a group.
pub fn span(group: &[Interval]) -> Option<Interval> {
    let first = group.first()?;
    Some(group.iter().fold(*first, |acc, iv| {
        Interval::new(acc.depth_from.min(iv.depth_from), acc.depth_to.max(iv.depth_to))
    }))
}
