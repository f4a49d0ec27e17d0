//! Error types for imprint operations.

use thiserror::Error;

/// Main error type for imprint operations.
///
/// Refusing to touch a file because it was changed by the user is *not* an
/// error; unsafe operations are skipped and logged instead. Errors are
/// reserved for invalid arguments, missing files the caller did not opt out
/// of, ambiguous ownership and real I/O failures.
#[derive(Error, Debug)]
pub enum ImprintError {
    /// Invalid argument passed to an operation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File expected to exist but missing
    #[error("File not found: {0}")]
    NotFound(String),

    /// File ownership is ambiguous because the user changed it
    #[error("File was changed outside of tracking: {path}: {reason}")]
    ModifiedByUser { path: String, reason: String },

    /// Serialization format could not be resolved for a path
    #[error("Cannot determine format: {0}")]
    UnknownFormat(String),

    /// Structured content could not be parsed
    #[error("Cannot parse {path}: {message}")]
    Parse { path: String, message: String },

    /// Filesystem operation failed
    #[error("Cannot {op} {path}: {source}")]
    Io {
        op: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization of structured content failed
    #[error("Cannot serialize {path}: {message}")]
    Serialize { path: String, message: String },
}

/// Result type alias for imprint operations.
pub type ImprintResult<T> = Result<T, ImprintError>;

impl ImprintError {
    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(path: S) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a modified-by-user error
    pub fn modified<S: Into<String>, R: Into<String>>(path: S, reason: R) -> Self {
        Self::ModifiedByUser {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown format error
    pub fn unknown_format<S: Into<String>>(path: S) -> Self {
        Self::UnknownFormat(path.into())
    }

    /// Create a parse error
    pub fn parse<S: Into<String>, M: Into<String>>(path: S, message: M) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error carrying the operation and path it failed on
    pub fn io<S: Into<String>>(op: &'static str, path: S, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialize<S: Into<String>, M: Into<String>>(path: S, message: M) -> Self {
        Self::Serialize {
            path: path.into(),
            message: message.into(),
        }
    }
}
