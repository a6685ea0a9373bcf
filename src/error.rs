//! Map loading and parsing errors.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Error type for map loading and parsing.
#[derive(Debug)]
pub enum MapError {
    /// File I/O error, with the offending path.
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// JSON parse error, with the offending path.
    Json {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },
    /// JSON parse error for an in-memory document.
    Parse(serde_json::Error),
    /// A tile layer's data length does not match its width * height.
    InvalidLayerSize(String),
    /// Unsupported file format (non-JSON extension).
    UnsupportedFormat(String),
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Io { path, source } => {
                write!(f, "I/O error reading {}: {}", path.display(), source)
            }
            MapError::Json { path, source } => {
                write!(f, "JSON parse error in {}: {}", path.display(), source)
            }
            MapError::Parse(source) => write!(f, "JSON parse error: {}", source),
            MapError::InvalidLayerSize(name) => write!(
                f,
                "Invalid layer size for layer '{}': data length does not match width * height",
                name
            ),
            MapError::UnsupportedFormat(path) => write!(f, "Unsupported file format: {}", path),
        }
    }
}

impl From<serde_json::Error> for MapError {
    fn from(err: serde_json::Error) -> Self {
        MapError::Parse(err)
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::Io { source, .. } => Some(source),
            MapError::Json { source, .. } | MapError::Parse(source) => Some(source),
            _ => None,
        }
    }
}
