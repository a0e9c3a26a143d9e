//! Error types for the concourse crate.

use std::fmt;

use crate::glb::GlbError;

/// Result type for concourse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, caching or decoding an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// HTTP request failed.
    Http {
        /// The URL that failed.
        url: String,
        /// The error message.
        message: String,
    },
    /// HTTP response had a non-success status code.
    HttpStatus {
        /// The URL that returned the error.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
    /// The payload is not a valid binary glTF container.
    Parse(GlbError),
    /// Cache operation failed.
    Cache {
        /// The operation that failed.
        operation: &'static str,
        /// The error message.
        message: String,
    },
    /// A bounded wait expired.
    Timeout {
        /// The operation that timed out.
        operation: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http { url, message } => {
                write!(f, "http request to {url} failed: {message}")
            }
            Error::HttpStatus { url, status } => {
                write!(f, "http request to {url} returned status {status}")
            }
            Error::Parse(e) => write!(f, "parse error: {e}"),
            Error::Cache { operation, message } => {
                write!(f, "cache {operation} failed: {message}")
            }
            Error::Timeout { operation } => write!(f, "{operation} timed out"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GlbError> for Error {
    fn from(e: GlbError) -> Self {
        Error::Parse(e)
    }
}
