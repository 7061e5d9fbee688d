//! Error type for the persistence seam
//!
//! Every record lookup a build performs goes through a store. Absence of a
//! record is not an error (lookups return `Option`), so this type only covers
//! the store itself failing.

use thiserror::Error;

/// Failure reported by a record store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected or failed the query
    #[error("store backend error: {message}")]
    Backend {
        /// Description of what failed
        message: String,
    },

    /// Reading the backing file or socket failed
    #[error("store io error: {source}")]
    Io {
        /// The underlying io error
        #[from]
        source: std::io::Error,
    },

    /// A stored record could not be decoded
    #[error("failed to decode {kind} record: {message}")]
    Decode {
        /// Record kind being decoded (e.g. "HttpRule")
        kind: String,
        /// Decoder message
        message: String,
    },
}

impl StoreError {
    /// Create a backend error with the given message
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend {
            message: msg.into(),
        }
    }

    /// Create a decode error for a record kind
    pub fn decode(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            kind: kind.into(),
            message: msg.into(),
        }
    }
}
