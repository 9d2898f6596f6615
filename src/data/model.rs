use std::fmt;

use anyhow::{bail, Context, Result};

/// Depth column of depth-indexed tables.
pub const DEPTH: &str = "DEPTH";
/// Interval columns of interval-indexed tables.
pub const DEPTH_FROM: &str = "DEPTH_FROM";
pub const DEPTH_TO: &str = "DEPTH_TO";

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes found in well data files.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Integer(i64),
    String(String),
    Bool(bool),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{v}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    /// Interpret the value as an `f64`; nulls and text don't convert.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Table – what a format loader returns
// ---------------------------------------------------------------------------

/// Rows as parsed from a file, no index applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Table { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Pull `name` out of every row as a depth value.
    fn take_depth_column(&mut self, name: &str) -> Result<Vec<f64>> {
        let idx = self
            .column_index(name)
            .with_context(|| format!("missing '{name}' column"))?;
        self.columns.remove(idx);
        self.rows
            .iter_mut()
            .enumerate()
            .map(|(i, row)| {
                let cell = row.remove(idx);
                match cell.as_f64() {
                    Some(d) if d.is_finite() => Ok(d),
                    _ => bail!("row {i}: '{name}' is not a finite number ({cell})"),
                }
            })
            .collect()
    }

    /// Index the table by its `DEPTH` column, sorted by depth.
    pub fn into_depth_frame(mut self) -> Result<DepthFrame> {
        let depths = self.take_depth_column(DEPTH)?;
        let mut frame = DepthFrame {
            columns: self.columns,
            depths,
            rows: self.rows,
        };
        frame.sort_by_depth();
        Ok(frame)
    }

    /// Index the table by its `DEPTH_FROM`/`DEPTH_TO` columns, sorted by top.
    pub fn into_interval_frame(mut self) -> Result<IntervalFrame> {
        let tops = self.take_depth_column(DEPTH_FROM)?;
        let bottoms = self.take_depth_column(DEPTH_TO)?;
        let intervals = tops
            .into_iter()
            .zip(bottoms)
            .enumerate()
            .map(|(i, (depth_from, depth_to))| {
                if depth_from > depth_to {
                    bail!("row {i}: {DEPTH_FROM} {depth_from} is below {DEPTH_TO} {depth_to}");
                }
                Ok(Interval::new(depth_from, depth_to))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut order: Vec<usize> = (0..intervals.len()).collect();
        order.sort_by(|&a, &b| intervals[a].depth_from.total_cmp(&intervals[b].depth_from));
        let mut rows: Vec<Option<Vec<Value>>> = self.rows.into_iter().map(Some).collect();
        Ok(IntervalFrame {
            columns: self.columns,
            intervals: order.iter().map(|&i| intervals[i]).collect(),
            rows: order.iter().filter_map(|&i| rows[i].take()).collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Interval
// ---------------------------------------------------------------------------

/// Half-open depth interval `[depth_from, depth_to)` in centimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub depth_from: f64,
    pub depth_to: f64,
}

impl Interval {
    pub fn new(depth_from: f64, depth_to: f64) -> Self {
        Interval {
            depth_from,
            depth_to,
        }
    }

    pub fn len(&self) -> f64 {
        self.depth_to - self.depth_from
    }

    pub fn is_empty(&self) -> bool {
        self.depth_to <= self.depth_from
    }

    pub fn contains(&self, depth: f64) -> bool {
        self.depth_from <= depth && depth < self.depth_to
    }

    pub fn overlaps(&self, depth_from: f64, depth_to: f64) -> bool {
        self.depth_from < depth_to && depth_from < self.depth_to
    }
}

// ---------------------------------------------------------------------------
// DepthFrame – depth-indexed rows
// ---------------------------------------------------------------------------

/// Rows keyed by a single depth, kept sorted by depth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepthFrame {
    pub columns: Vec<String>,
    pub depths: Vec<f64>,
    pub rows: Vec<Vec<Value>>,
}

impl DepthFrame {
    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// A numeric column as `(depth, value)` pairs; nulls and text are skipped.
    pub fn series(&self, name: &str) -> Option<Vec<(f64, f64)>> {
        let idx = self.column_index(name)?;
        Some(
            self.depths
                .iter()
                .zip(&self.rows)
                .filter_map(|(&d, row)| row[idx].as_f64().filter(|v| v.is_finite()).map(|v| (d, v)))
                .collect(),
        )
    }

    /// Stable sort of rows by depth.
    pub fn sort_by_depth(&mut self) {
        if self.depths.windows(2).all(|w| w[0] <= w[1]) {
            return;
        }
        let mut order: Vec<usize> = (0..self.depths.len()).collect();
        order.sort_by(|&a, &b| self.depths[a].total_cmp(&self.depths[b]));
        let depths = order.iter().map(|&i| self.depths[i]).collect();
        let mut rows: Vec<Option<Vec<Value>>> = std::mem::take(&mut self.rows)
            .into_iter()
            .map(Some)
            .collect();
        self.rows = order.iter().filter_map(|&i| rows[i].take()).collect();
        self.depths = depths;
    }

    /// Keep only the named columns, in the given order.
    pub fn select_columns(&self, names: &[&str]) -> Option<DepthFrame> {
        let indices = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Option<Vec<_>>>()?;
        Some(DepthFrame {
            columns: names.iter().map(|n| n.to_string()).collect(),
            depths: self.depths.clone(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// IntervalFrame – interval-indexed rows
// ---------------------------------------------------------------------------

/// Rows keyed by `(depth_from, depth_to)`, sorted by `depth_from`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalFrame {
    pub columns: Vec<String>,
    pub intervals: Vec<Interval>,
    pub rows: Vec<Vec<Value>>,
}

impl IntervalFrame {
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, aligned with `intervals`.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }
}

// ---------------------------------------------------------------------------
// Dataset – one loaded, filtered dataset of a segment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Depth(DepthFrame),
    Interval(IntervalFrame),
    Plain(Table),
}

impl Dataset {
    pub fn len(&self) -> usize {
        match self {
            Dataset::Depth(f) => f.len(),
            Dataset::Interval(f) => f.len(),
            Dataset::Plain(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_depth(&self) -> Option<&DepthFrame> {
        match self {
            Dataset::Depth(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_interval(&self) -> Option<&IntervalFrame> {
        match self {
            Dataset::Interval(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_plain(&self) -> Option<&Table> {
        match self {
            Dataset::Plain(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
        Table::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn depth_frame_is_sorted_and_drops_index_column() {
        let t = table(
            &["GK", DEPTH],
            vec![
                vec![Value::Float(2.0), Value::Integer(110)],
                vec![Value::Float(1.0), Value::Float(100.5)],
            ],
        );
        let f = t.into_depth_frame().unwrap();
        assert_eq!(f.columns, vec!["GK"]);
        assert_eq!(f.depths, vec![100.5, 110.0]);
        assert_eq!(f.rows[0], vec![Value::Float(1.0)]);
        assert_eq!(f.series("GK").unwrap(), vec![(100.5, 1.0), (110.0, 2.0)]);
    }

    #[test]
    fn missing_or_null_depth_is_an_error() {
        let t = table(&["GK"], vec![vec![Value::Float(1.0)]]);
        assert!(t.into_depth_frame().is_err());

        let t = table(&[DEPTH], vec![vec![Value::Null]]);
        assert!(t.into_depth_frame().is_err());
    }

    #[test]
    fn interval_frame_sorted_by_top() {
        let t = table(
            &[DEPTH_FROM, DEPTH_TO, "FORMATION"],
            vec![
                vec![Value::Integer(20), Value::Integer(30), Value::String("b".into())],
                vec![Value::Integer(0), Value::Integer(20), Value::String("a".into())],
            ],
        );
        let f = t.into_interval_frame().unwrap();
        assert_eq!(f.intervals, vec![Interval::new(0.0, 20.0), Interval::new(20.0, 30.0)]);
        assert_eq!(f.column("FORMATION").unwrap()[0], &Value::String("a".into()));
    }

    #[test]
    fn interval_predicates_are_half_open() {
        let i = Interval::new(10.0, 20.0);
        assert!(i.contains(10.0));
        assert!(!i.contains(20.0));
        assert!(i.overlaps(19.0, 25.0));
        assert!(!i.overlaps(20.0, 25.0));
        assert!(!i.overlaps(0.0, 10.0));
    }
}
