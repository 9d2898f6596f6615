use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience `Result` for segment operations.
pub type Result<T> = std::result::Result<T, WellError>;

// ---------------------------------------------------------------------------
// WellError – every failure surfaced by the library
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum WellError {
    /// No backing file (or no image) for a requested item.
    #[error("{what} not found in {location}")]
    NotFound { what: String, location: String },

    /// More than one backing file matches one logical dataset.
    #[error("several files called {name} are found in {}: {candidates:?}", .dir.display())]
    Conflict {
        name: String,
        dir: PathBuf,
        candidates: Vec<PathBuf>,
    },

    /// No loader is registered for the file extension.
    #[error("a loader for data in .{0} format is not implemented")]
    UnsupportedFormat(String),

    /// Bad input caught at the boundary (depths, bounds, samples, parameters).
    #[error("{0}")]
    Validation(String),

    /// `match_core_logs` called on a segment whose depths were already corrected.
    #[error("segment {0} has already been matched; set allow_rematch to match again")]
    AlreadyMatched(String),

    /// A format loader failed to parse a file.
    #[error("failed to load {}: {source:#}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl WellError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        WellError::Validation(msg.into())
    }

    pub(crate) fn not_found(what: impl Into<String>, location: impl Into<String>) -> Self {
        WellError::NotFound {
            what: what.into(),
            location: location.into(),
        }
    }
}
