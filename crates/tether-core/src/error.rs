//! Error types for Tether.
//!
//! Errors are grouped by the layer that raises them and folded into the
//! crate-level [`Error`] with `#[from]`:
//!
//! - [`PathError`]: a user-supplied path without a recognized scheme
//! - [`EnvelopeError`]: an envelope that cannot be encoded or decoded
//! - [`StorageError`]: a read or write against a storage namespace failed
//! - [`ChannelError`]: the message channel rejected or could not carry a request

use std::io;

use thiserror::Error;

use crate::path::Namespace;
use crate::record::ReadyState;

/// Errors raised by Tether operations
#[derive(Debug, Error)]
pub enum Error {
    /// Path does not start with `assets://` or `data://`
    #[error(transparent)]
    Path(#[from] PathError),

    /// Storage stat found nothing at the path
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// File is larger than the configured limit
    #[error("file too large: {path} is {size} bytes (limit {limit})")]
    FileTooLarge {
        /// Qualified path of the file
        path: String,
        /// Size reported by storage
        size: u64,
        /// Configured maximum
        limit: u64,
    },

    /// Envelope could not be encoded or decoded
    #[error("malformed envelope: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Storage read or write failed
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    /// Message channel failed to carry a request
    #[error("channel failure: {0}")]
    Channel(#[from] ChannelError),

    /// Cancel was requested on a record that is no longer pending
    #[error("transfer cannot be canceled in state {0}")]
    NotCancelable(ReadyState),

    /// Configuration rejected by validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Returns true if the failure happened on this side, before or without
    /// involving the peer
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::Path(_)
                | Error::FileNotFound(_)
                | Error::FileTooLarge { .. }
                | Error::Envelope(_)
                | Error::Storage(_)
                | Error::NotCancelable(_)
                | Error::InvalidConfig(_)
        )
    }

    /// Returns true if the failure came from the channel or the peer behind it
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Channel(_))
    }
}

/// Path classification errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Neither `assets://` nor `data://` prefix present
    #[error("invalid path {0:?}: expected an assets:// or data:// prefix")]
    InvalidPath(String),
}

/// Envelope encoding and decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Buffer shorter than the fixed header
    #[error("envelope too short: expected at least {expected}, got {actual}")]
    TooShort {
        /// Expected minimum size
        expected: usize,
        /// Actual size received
        actual: usize,
    },

    /// A declared field length runs past the end of the buffer
    #[error("{field} overflows envelope: {length} bytes at offset {offset}, {available} available")]
    FieldOverflow {
        /// Field being read
        field: &'static str,
        /// Offset the field starts at
        offset: usize,
        /// Declared length in bytes
        length: usize,
        /// Bytes left in the buffer from `offset`
        available: usize,
    },

    /// A field does not fit its 32-bit length slot
    #[error("{field} too large for envelope: {length} bytes")]
    FieldTooLarge {
        /// Field being written
        field: &'static str,
        /// Encoded length in bytes
        length: usize,
    },

    /// Params could not be serialized as JSON
    #[error("params not serializable: {0}")]
    Params(String),
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Nothing stored at the path
    #[error("{0} not found")]
    NotFound(String),

    /// Write attempted against a read-only namespace
    #[error("{0} namespace is read-only")]
    ReadOnly(Namespace),

    /// Path escapes the namespace root
    #[error("path {0:?} escapes its namespace root")]
    OutsideRoot(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Message channel errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Channel is closed
    #[error("channel is closed")]
    Closed,

    /// Peer rejected the request
    #[error("request rejected: {0}")]
    Rejected(String),

    /// No handler on the peer answered the request
    #[error("no handler answered the request")]
    Unhandled,

    /// Response is not a transfer reply
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for Tether operations
pub type Result<T> = std::result::Result<T, Error>;
