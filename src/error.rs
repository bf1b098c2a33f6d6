//! Error types for the geofencing engine.
//!
//! Validation failures surface at the boundaries (classification entry,
//! drawing commit, import) instead of degrading into a "no match" answer.

use std::io;
use thiserror::Error;

/// Errors produced by classification, drawing, registry and persistence.
#[derive(Error, Debug)]
pub enum ZoneError {
    /// Latitude or longitude was missing, NaN or infinite.
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// A polygon commit was attempted with fewer than three vertices.
    #[error("Insufficient vertices: need at least 3, got {count}")]
    InsufficientVertices { count: usize },

    /// A polygon commit was attempted without a required metadata field.
    #[error("Incomplete metadata: missing {field}")]
    IncompleteMetadata { field: &'static str },

    /// An imported region record is structurally malformed.
    #[error("Invalid region format in record {index}: {reason}")]
    InvalidRegionFormat { index: usize, reason: String },

    /// A region violates a registry invariant.
    #[error("Invalid region '{name}': {reason}")]
    InvalidRegion { name: String, reason: String },

    /// No region with the given id exists.
    #[error("Region not found: {0}")]
    RegionNotFound(String),

    /// A region id is already present in the registry.
    #[error("Duplicate region id: {0}")]
    DuplicateRegionId(String),

    /// The change feed could not be set up or used.
    #[error("Region feed error: {0}")]
    Feed(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for geofencing operations.
pub type Result<T> = std::result::Result<T, ZoneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ZoneError::InsufficientVertices { count: 2 };
        assert_eq!(err.to_string(), "Insufficient vertices: need at least 3, got 2");

        let err = ZoneError::IncompleteMetadata { field: "fee" };
        assert_eq!(err.to_string(), "Incomplete metadata: missing fee");

        let err = ZoneError::InvalidRegionFormat {
            index: 4,
            reason: "polygon has 2 vertices".into(),
        };
        assert!(err.to_string().contains("record 4"));
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: ZoneError = io_err.into();
        assert!(matches!(err, ZoneError::Io(_)));
    }
}
