//! Error types for the durable page tier.

use revtree_common::{PageKey, RevtreeError};
use thiserror::Error;

/// Result type for page store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a [`PageStore`](crate::persistent::PageStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error from the underlying file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The store file is damaged before its last entry.
    #[error("store corrupted at offset {offset}: {reason}")]
    Corrupted {
        /// File offset of the damaged entry.
        offset: u64,
        /// What was wrong with it.
        reason: String,
    },

    /// An entry failed checksum verification on read.
    #[error("checksum mismatch for page {key}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Key of the entry.
        key: PageKey,
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },

    /// A stored payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A payload does not fit the entry's `u32` length field.
    #[error("payload of page {key} is {size} bytes, above the entry limit")]
    PayloadTooLarge {
        /// Key of the entry.
        key: PageKey,
        /// Payload size in bytes.
        size: usize,
    },

    /// Removal of a key the store does not hold.
    #[error("page {key} not found in store")]
    KeyNotFound {
        /// The missing key.
        key: PageKey,
    },

    /// The operation is not offered by this store.
    #[error("operation not supported by this store: {operation}")]
    Unsupported {
        /// Name of the operation.
        operation: &'static str,
    },

    /// The store was cleared or closed.
    #[error("store closed")]
    Closed,
}

impl StoreError {
    /// Returns true if the error reports caller misuse rather than an
    /// environmental fault.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::KeyNotFound { .. } | Self::Unsupported { .. } | Self::Closed
        )
    }

    /// Creates a corruption error.
    pub fn corrupted(offset: u64, reason: impl Into<String>) -> Self {
        Self::Corrupted {
            offset,
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for RevtreeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(source) => RevtreeError::Io { source },
            StoreError::KeyNotFound { key } => RevtreeError::KeyNotFound { page_key: key },
            StoreError::Unsupported { operation } => RevtreeError::not_supported(operation),
            StoreError::Closed => RevtreeError::StoreClosed,
            other @ StoreError::PayloadTooLarge { .. } => {
                RevtreeError::invalid_argument(other.to_string())
            }
            other @ (StoreError::Corrupted { .. }
            | StoreError::ChecksumMismatch { .. }
            | StoreError::Decode(_)) => RevtreeError::corruption(other.to_string()),
        }
    }
}

/// Errors raised while decoding page bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The input ended early.
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes required by the next field.
        needed: usize,
        /// Bytes left in the input.
        remaining: usize,
    },

    /// A tag byte has no known meaning.
    #[error("unknown {what} tag {tag}")]
    UnknownTag {
        /// The kind of tag being read.
        what: &'static str,
        /// The offending value.
        tag: u8,
    },

    /// A string field is not valid UTF-8.
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,

    /// An order label is malformed.
    #[error("invalid order label: {reason}")]
    InvalidLabel {
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Bytes were left over after the value.
    #[error("{count} trailing bytes after value")]
    TrailingBytes {
        /// Number of unread bytes.
        count: usize,
    },
}
