//! Error types for the vhdxmeta core library.

use std::path::PathBuf;

/// The main error type for metadata decoding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error with optional path context.
    #[error("I/O error{}: {source}", path.as_ref().map(|p| format!(" at '{}'", p.display())).unwrap_or_default())]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    /// Fewer bytes were available than a record or entry requires.
    #[error("truncated read at offset {offset}: expected {expected} bytes, got {actual}")]
    TruncatedRead {
        offset: u64,
        expected: u64,
        actual: u64,
    },

    /// GUID text that is not 32 hex digits once hyphens are removed.
    #[error("malformed GUID: '{input}'")]
    MalformedGuid { input: String },

    /// No region-table entry carries the metadata region identifier.
    #[error("metadata region not found in region table")]
    RegionNotFound,

    /// The metadata table header does not start with the expected signature.
    #[error("invalid metadata table signature: expected {expected:?}, found {found:?}")]
    InvalidSignature { expected: String, found: String },
}

/// A specialized Result type for metadata decoding.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an I/O error with path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
        }
    }

    /// Create an I/O error without path context.
    pub fn io_simple(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }

    /// Create a truncated read error.
    pub fn truncated(offset: u64, expected: u64, actual: u64) -> Self {
        Self::TruncatedRead {
            offset,
            expected,
            actual,
        }
    }

    /// Create a malformed GUID error.
    pub fn malformed_guid(input: impl Into<String>) -> Self {
        Self::MalformedGuid {
            input: input.into(),
        }
    }

    /// Create an invalid signature error, rendering the raw bytes lossily.
    pub fn invalid_signature(expected: &[u8], found: &[u8]) -> Self {
        Self::InvalidSignature {
            expected: String::from_utf8_lossy(expected).into_owned(),
            found: String::from_utf8_lossy(found).into_owned(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::io_simple(source)
    }
}
