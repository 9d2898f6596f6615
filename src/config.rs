//! Segment metadata, segment options and depth-matching parameters.
//!
//! All depths are centimetres. Metadata depths may also be written as
//! `<value><unit>` strings (`"1500m"`), parsed with [`crate::depth::parse_depth`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::depth::parse_depth;
use crate::error::{Result, WellError};

// ---------------------------------------------------------------------------
// meta.json
// ---------------------------------------------------------------------------

/// A depth as written in metadata: whole centimetres or a unit string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DepthSpec {
    Centimeters(i64),
    Text(String),
}

impl DepthSpec {
    pub fn to_cm(&self) -> Result<i64> {
        match self {
            DepthSpec::Centimeters(cm) => Ok(*cm),
            DepthSpec::Text(text) => parse_depth(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RawMeta {
    name: String,
    #[serde(default)]
    field: String,
    depth_from: DepthSpec,
    depth_to: DepthSpec,
}

/// Per-segment record stored as `meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub name: String,
    pub field: String,
    pub depth_from: i64,
    pub depth_to: i64,
}

impl SegmentMeta {
    pub fn new(name: &str, field: &str, depth_from: i64, depth_to: i64) -> Result<Self> {
        let meta = SegmentMeta {
            name: name.to_string(),
            field: field.to_string(),
            depth_from,
            depth_to,
        };
        meta.validate()?;
        Ok(meta)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawMeta = serde_json::from_str(text)?;
        SegmentMeta::new(
            &raw.name,
            &raw.field,
            raw.depth_from.to_cm()?,
            raw.depth_to.to_cm()?,
        )
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        SegmentMeta::from_json(&text)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.depth_from >= self.depth_to {
            return Err(WellError::validation(format!(
                "segment {}: depth_from {} must be above depth_to {}",
                self.name, self.depth_from, self.depth_to
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Segment options
// ---------------------------------------------------------------------------

/// Raster geometry of the registered core images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentOptions {
    /// Physical core width in centimetres.
    pub core_width: u32,
    /// Vertical and horizontal resolution.
    pub pixels_per_cm: u32,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        SegmentOptions {
            core_width: 10,
            pixels_per_cm: 5,
        }
    }
}

impl SegmentOptions {
    pub fn width_px(&self) -> u32 {
        self.core_width * self.pixels_per_cm
    }

    pub fn validate(&self) -> Result<()> {
        if self.core_width == 0 || self.pixels_per_cm == 0 {
            return Err(WellError::validation(
                "core_width and pixels_per_cm must be positive",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Match parameters
// ---------------------------------------------------------------------------

/// What happens to core-derived rows outside every lithology interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UncoveredRows {
    /// Row keeps its original depth.
    #[default]
    Keep,
    /// Row is removed from the dataset.
    Drop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Log mnemonic present in both `logs` and `core_logs`.
    pub mnemonic: String,
    /// Largest absolute shift any core row may receive.
    pub max_shift: f64,
    pub delta_from: f64,
    pub delta_to: f64,
    pub delta_step: f64,
    pub uncovered_rows: UncoveredRows,
    /// Allow matching a segment whose depths were already corrected.
    pub allow_rematch: bool,
}

impl Default for MatchParams {
    fn default() -> Self {
        MatchParams {
            mnemonic: "GK".to_string(),
            max_shift: 400.0,
            delta_from: -300.0,
            delta_to: 300.0,
            delta_step: 10.0,
            uncovered_rows: UncoveredRows::Keep,
            allow_rematch: false,
        }
    }
}

impl MatchParams {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let params: MatchParams = serde_json::from_str(&text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        let values = [self.max_shift, self.delta_from, self.delta_to, self.delta_step];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(WellError::validation("match parameters must be finite"));
        }
        if self.max_shift < 0.0 {
            return Err(WellError::validation(format!(
                "max_shift must be non-negative, got {}",
                self.max_shift
            )));
        }
        if self.delta_step <= 0.0 {
            return Err(WellError::validation(format!(
                "delta_step must be positive, got {}",
                self.delta_step
            )));
        }
        if self.delta_from > self.delta_to {
            return Err(WellError::validation(format!(
                "empty shift range [{}, {}]",
                self.delta_from, self.delta_to
            )));
        }
        if self.delta_from > self.max_shift || self.delta_to < -self.max_shift {
            return Err(WellError::validation(format!(
                "shift range [{}, {}] lies outside ±{}",
                self.delta_from, self.delta_to, self.max_shift
            )));
        }
        if self.mnemonic.is_empty() {
            return Err(WellError::validation("mnemonic must not be empty"));
        }
        Ok(())
    }

    /// Gap above which two boring intervals are matched independently.
    pub fn gap_threshold(&self) -> f64 {
        2.0 * self.max_shift
    }
}
