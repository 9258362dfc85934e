//! Error types for NextStat

use std::path::PathBuf;
use thiserror::Error;

/// NextStat error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input file does not exist or cannot be opened
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A named object (workspace, dataset, model config) is absent
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Object kind, e.g. "dataset".
        kind: &'static str,
        /// Requested name.
        name: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound { kind, name: name.into() }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let e = Error::not_found("dataset", "obsData");
        assert_eq!(e.to_string(), "dataset 'obsData' not found");
    }

    #[test]
    fn test_file_not_found_message() {
        let e = Error::FileNotFound(PathBuf::from("/no/such/file.json"));
        assert_eq!(e.to_string(), "file not found: /no/such/file.json");
    }
}
