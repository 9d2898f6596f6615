//! Depth strings: `<value><unit>` → whole centimetres.
//!
//! The grammar is a decimal number (optional sign, fraction and exponent)
//! immediately followed by an alphabetic unit, e.g. `1500m`, `152cm`,
//! `-2e1mm`. Units are converted with a fixed table.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, WellError};

static DEPTH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<value>[-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?)(?P<units>[a-zA-Z]+)$")
        .expect("depth pattern is valid")
});

/// Relative tolerance used when deciding that a value is a whole centimetre.
const INTEGRAL_EPS: f64 = 1e-9;

/// Centimetres per unit, or `None` if `unit` is not a length.
pub fn unit_to_cm(unit: &str) -> Option<f64> {
    let factor = match unit {
        "mm" | "millimeter" | "millimeters" | "millimetre" | "millimetres" => 0.1,
        "cm" | "centimeter" | "centimeters" | "centimetre" | "centimetres" => 1.0,
        "dm" | "decimeter" | "decimeters" | "decimetre" | "decimetres" => 10.0,
        "m" | "meter" | "meters" | "metre" | "metres" => 100.0,
        "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => 100_000.0,
        "in" | "inch" | "inches" => 2.54,
        "ft" | "foot" | "feet" => 30.48,
        "yd" | "yard" | "yards" => 91.44,
        "mi" | "mile" | "miles" => 160_934.4,
        _ => return None,
    };
    Some(factor)
}

/// Parse a depth string into a whole number of centimetres.
///
/// Fails if the text doesn't follow the grammar, the unit isn't a length,
/// or the value isn't an integral number of centimetres.
pub fn parse_depth(text: &str) -> Result<i64> {
    let cm = parse_depth_cm(text)?;
    let rounded = cm.round();
    if (cm - rounded).abs() > INTEGRAL_EPS * rounded.abs().max(1.0) {
        return Err(WellError::validation(format!(
            "depth {text:?} is {cm} cm, which is not a whole number of centimetres"
        )));
    }
    Ok(rounded as i64)
}

/// Like [`parse_depth`], but rounds to the nearest centimetre instead of failing.
pub fn parse_depth_rounded(text: &str) -> Result<i64> {
    Ok(parse_depth_cm(text)?.round() as i64)
}

/// Reject zero and negative depths/lengths.
pub fn check_positive(depth: i64, var_name: &str) -> Result<i64> {
    if depth <= 0 {
        return Err(WellError::validation(format!(
            "{var_name} must be positive, got {depth}"
        )));
    }
    Ok(depth)
}

fn parse_depth_cm(text: &str) -> Result<f64> {
    let malformed = || {
        WellError::validation(format!(
            "depth {text:?} must be specified in a <value><units> format"
        ))
    };

    let caps = DEPTH_PATTERN.captures(text.trim()).ok_or_else(malformed)?;
    let value: f64 = caps["value"].parse().map_err(|_| malformed())?;
    let unit = &caps["units"];
    let factor = unit_to_cm(unit).ok_or_else(|| {
        WellError::validation(format!("unit {unit:?} in {text:?} is not a length unit"))
    })?;

    let cm = value * factor;
    if !cm.is_finite() {
        return Err(malformed());
    }
    Ok(cm)
}
