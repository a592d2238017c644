//! Error types for the reference index.
//!
//! Three layers, from the disk up:
//! - [`StorageError`]: the on-disk store could not be opened or decoded
//! - [`ReaderError`]: a reader query hit a storage fault or was cancelled
//! - [`QueryError`]: what the service reports to its callers; storage
//!   faults never cross this boundary, they become `Unavailable`
//!
//! "Ambiguous" and "not applicable" outcomes are not errors and are
//! reported as `None` by the query methods.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::index::types::IndexKind;

/// The on-disk index could not be opened or decoded.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no index found at {}", .0.display())]
    Missing(PathBuf),

    #[error("index version {found} does not match expected version {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("corrupted {index:?} index: {detail}")]
    Corrupted { index: IndexKind, detail: String },

    #[error("malformed index metadata: {0}")]
    Meta(#[from] serde_json::Error),

    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn corrupted(index: IndexKind, detail: impl Into<String>) -> Self {
        StorageError::Corrupted {
            index,
            detail: detail.into(),
        }
    }

    /// True when the index simply is not there (or is from another
    /// version): not a fault, the service just stays closed.
    pub fn is_absent(&self) -> bool {
        matches!(
            self,
            StorageError::Missing(_) | StorageError::VersionMismatch { .. }
        )
    }
}

/// Failure of a single reader query.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("query cancelled")]
    Cancelled,
}

/// Why the service could not answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// Indexing is switched off in the configuration
    Disabled,
    /// No reader is open: no index built yet, or a build is running
    Closed,
    /// An open/close transition holds the lock right now
    Busy,
    /// The index was torn down after a storage fault
    StorageFault,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UnavailableReason::Disabled => "indexing disabled",
            UnavailableReason::Closed => "index closed",
            UnavailableReason::Busy => "index busy",
            UnavailableReason::StorageFault => "index storage fault",
        };
        f.write_str(text)
    }
}

/// Error returned across the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Try again later; distinct from an empty answer
    #[error("reference index unavailable: {0}")]
    Unavailable(UnavailableReason),

    /// The caller cancelled the query
    #[error("query cancelled")]
    Cancelled,
}

pub type QueryResult<T> = Result<T, QueryError>;
