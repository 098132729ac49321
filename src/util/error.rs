//! Error types for the s-rep library.

use std::path::PathBuf;
use thiserror::Error;

use crate::srep::SpokeKind;

/// Main error type for s-rep operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Malformed header or point-set document
    #[error("Parse error: {0}")]
    Parse(String),

    /// Required per-point attribute absent at access time
    #[error("Missing point attribute: {0}")]
    MissingAttribute(String),

    /// Spoke index out of bounds
    #[error("Spoke index {index} out of bounds (count: {count})")]
    IndexOutOfBounds { index: usize, count: usize },

    /// Zero-length spoke encountered during reconstruction
    #[error("Degenerate {kind} spoke at index {index}: medial and boundary points coincide")]
    DegenerateSpoke { kind: SpokeKind, index: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a parse error from a message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a missing-attribute error from an attribute name.
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingAttribute(name.into())
    }
}

/// Result type alias for s-rep operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::IndexOutOfBounds { index: 5, count: 3 };
        assert!(e.to_string().contains("5"));
        assert!(e.to_string().contains("3"));

        let e = Error::DegenerateSpoke { kind: SpokeKind::Crest, index: 0 };
        assert!(e.to_string().contains("crest"));

        let e = Error::missing("spokeLength");
        assert!(e.to_string().contains("spokeLength"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
