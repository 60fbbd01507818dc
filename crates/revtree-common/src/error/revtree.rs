//! Resource error types.
//!
//! Provides the error taxonomy for page resolution, persistence and cursor
//! misuse.

use std::fmt;
use thiserror::Error;

use crate::types::{PageKey, TrxId};

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Internal error (bug).
    Internal = 0x0001,
    /// Operation not supported.
    NotSupported = 0x0002,
    /// Invalid argument provided.
    InvalidArgument = 0x0003,

    // I/O errors (0x0100 - 0x01FF)
    /// General I/O error.
    Io = 0x0100,
    /// Data corruption detected.
    Corruption = 0x0104,

    // Storage errors (0x0200 - 0x02FF)
    /// Page not found in any tier.
    PageNotFound = 0x0200,
    /// Removal of a key the store does not hold.
    KeyNotFound = 0x0203,
    /// The store was closed or destroyed.
    StoreClosed = 0x0207,

    // Revision errors (0x0300 - 0x03FF)
    /// Requested revision does not exist.
    RevisionNotFound = 0x0300,
    /// Requested node does not exist.
    NodeNotFound = 0x0301,

    // Transaction errors (0x0400 - 0x04FF)
    /// Operation on a closed transaction.
    ClosedTransaction = 0x0400,
    /// A second writer tried to start.
    ConcurrentWriter = 0x0401,

    // Configuration errors (0x0500 - 0x05FF)
    /// Invalid configuration.
    InvalidConfig = 0x0500,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "I/O",
            0x02 => "Storage",
            0x03 => "Revision",
            0x04 => "Transaction",
            0x05 => "Config",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The main error type for revtree.
///
/// Misses are not errors: a node that does not exist in a revision is
/// reported as `Move::NotMoved` or `Ok(None)`. This enum covers real faults
/// and caller misuse.
///
/// # Example
///
/// ```rust
/// use revtree_common::error::{RevtreeError, RevtreeResult};
/// use revtree_common::types::PageKey;
///
/// fn read_page(page_key: PageKey) -> RevtreeResult<Vec<u8>> {
///     Err(RevtreeError::PageNotFound { page_key })
/// }
/// ```
#[derive(Debug, Error)]
pub enum RevtreeError {
    // ==========================================================================
    // General Errors
    // ==========================================================================
    /// Internal error - this indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// Operation not supported.
    #[error("operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: String,
    },

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
    },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// I/O error from the underlying system.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Data corruption detected.
    #[error("data corruption detected: {message}")]
    Corruption {
        /// Description of the corruption.
        message: String,
    },

    // ==========================================================================
    // Storage Errors
    // ==========================================================================
    /// A page reference could not be resolved by any tier.
    #[error("page {page_key} not found")]
    PageNotFound {
        /// The missing page key.
        page_key: PageKey,
    },

    /// Removal of a key the durable store does not hold.
    #[error("page {page_key} is not in the store")]
    KeyNotFound {
        /// The key that was removed.
        page_key: PageKey,
    },

    /// The durable store was closed or destroyed.
    #[error("page store is closed")]
    StoreClosed,

    // ==========================================================================
    // Revision Errors
    // ==========================================================================
    /// Requested revision does not exist.
    #[error("revision {revision} not found (latest is {latest})")]
    RevisionNotFound {
        /// The requested revision.
        revision: u32,
        /// The most recent committed revision.
        latest: u32,
    },

    /// Requested node does not exist in the revision being written.
    #[error("node {node_key} not found")]
    NodeNotFound {
        /// The missing node key.
        node_key: i64,
    },

    // ==========================================================================
    // Transaction Errors
    // ==========================================================================
    /// Operation on a transaction that has been closed.
    #[error("transaction is already closed")]
    ClosedTransaction,

    /// A writer is already active on the resource.
    #[error("a write transaction is already active (trx {active})")]
    ConcurrentWriter {
        /// Id of the writer that holds the resource.
        active: TrxId,
    },

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },
}

impl RevtreeError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Internal { .. } => ErrorCode::Internal,
            Self::NotSupported { .. } => ErrorCode::NotSupported,
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::Io { .. } => ErrorCode::Io,
            Self::Corruption { .. } => ErrorCode::Corruption,
            Self::PageNotFound { .. } => ErrorCode::PageNotFound,
            Self::KeyNotFound { .. } => ErrorCode::KeyNotFound,
            Self::StoreClosed => ErrorCode::StoreClosed,
            Self::RevisionNotFound { .. } => ErrorCode::RevisionNotFound,
            Self::NodeNotFound { .. } => ErrorCode::NodeNotFound,
            Self::ClosedTransaction => ErrorCode::ClosedTransaction,
            Self::ConcurrentWriter { .. } => ErrorCode::ConcurrentWriter,
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig,
        }
    }

    /// Returns true if this error signals caller misuse rather than an
    /// environmental failure. Such errors are never retried.
    #[must_use]
    pub const fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::NotSupported { .. }
                | Self::InvalidArgument { .. }
                | Self::KeyNotFound { .. }
                | Self::ClosedTransaction
                | Self::ConcurrentWriter { .. }
        )
    }

    /// Returns true if this error was raised while reading or writing
    /// durable state.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::Corruption { .. } | Self::PageNotFound { .. }
        )
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a not-supported error.
    #[must_use]
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }

    /// Creates a corruption error.
    #[must_use]
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = RevtreeError::PageNotFound {
            page_key: PageKey::new(42),
        };
        assert_eq!(err.code(), ErrorCode::PageNotFound);
        assert_eq!(err.code().category(), "Storage");
        assert_eq!(RevtreeError::ClosedTransaction.code().category(), "Transaction");
    }

    #[test]
    fn test_error_display() {
        let err = RevtreeError::PageNotFound {
            page_key: PageKey::new(42),
        };
        assert_eq!(err.to_string(), "page 42 not found");

        let err = RevtreeError::RevisionNotFound {
            revision: 7,
            latest: 3,
        };
        assert_eq!(err.to_string(), "revision 7 not found (latest is 3)");
    }

    #[test]
    fn test_programming_errors() {
        assert!(RevtreeError::ClosedTransaction.is_programming_error());
        assert!(RevtreeError::not_supported("get_all").is_programming_error());
        assert!(RevtreeError::KeyNotFound {
            page_key: PageKey::new(1)
        }
        .is_programming_error());
        assert!(!RevtreeError::corruption("bad crc").is_programming_error());
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RevtreeError = io_err.into();
        assert_eq!(err.code(), ErrorCode::Io);
        assert!(err.is_io());
    }
}
