/// Data layer: tabular model, format loading, and depth filtering.
///
/// Architecture:
/// ```text
///  <name>.las / .csv / .feather / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  resolve file, dispatch by extension → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model    │  Table → DepthFrame / IntervalFrame / Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  restrict to [depth_from, depth_to)
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
