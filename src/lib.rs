//! Depth-indexed well data for one borehole segment: wireline logs,
//! core-derived logs, lithology intervals and core photographs, plus the
//! correction of core depths against the wireline log.

pub mod config;
pub mod core_image;
pub mod data;
pub mod depth;
pub mod error;
pub mod matching;
pub mod segment;

pub use config::{MatchParams, SegmentMeta, SegmentOptions, UncoveredRows};
pub use core_image::{CoreImage, CoreImagePair};
pub use data::model::{Dataset, DepthFrame, Interval, IntervalFrame, Table, Value};
pub use error::{Result, WellError};
pub use matching::MatchReport;
pub use segment::{MatchState, Segment};
