use std::fmt;

use thiserror::Error;

use crate::Handle;

/// Result type for blob store operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Result type for transfer jobs
pub type TransferResult<T> = Result<T, TransferError>;

/// Errors raised by a [`BlobStore`](crate::BlobStore) implementation
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Blob not found: {handle}")]
    NotFound { handle: String },

    #[error("Blob of {size} bytes exceeds the store limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("Store rejected the request: {reason}")]
    Rejected { reason: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl BlobError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(handle: S) -> Self {
        Self::NotFound {
            handle: handle.into(),
        }
    }

    /// Create a rejected request error
    pub fn rejected<S: Into<String>>(reason: S) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// What an upload was trying to persist when the store failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreTarget {
    /// The whole file on the single-piece path, or one piece of a chunked upload
    Piece(usize),
    /// The manifest blob written after all pieces
    Manifest,
}

impl fmt::Display for StoreTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreTarget::Piece(index) => write!(f, "piece {}", index),
            StoreTarget::Manifest => write!(f, "manifest"),
        }
    }
}

/// Errors that abort an upload or download job
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid input: {message}")]
    Input { message: String },

    #[error("Failed to store {target}: {source}")]
    StoreFailure {
        target: StoreTarget,
        #[source]
        source: BlobError,
    },

    #[error("Failed to fetch blob {handle}: {source}")]
    FetchFailure {
        handle: Handle,
        #[source]
        source: BlobError,
    },

    #[error("Malformed manifest: {message}")]
    Format { message: String },

    #[error("Invalid transfer configuration: {message}")]
    Config { message: String },

    #[error("Transfer worker failed: {message}")]
    Worker { message: String },
}

impl TransferError {
    /// Create an invalid input error
    pub fn input<S: Into<String>>(message: S) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    /// Create a manifest format error
    pub fn format<S: Into<String>>(message: S) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a worker error
    pub fn worker<S: Into<String>>(message: S) -> Self {
        Self::Worker {
            message: message.into(),
        }
    }

    /// Wrap a store error for the given upload target
    pub fn store_failure(target: StoreTarget, source: BlobError) -> Self {
        Self::StoreFailure { target, source }
    }

    /// Wrap a store error for the given handle
    pub fn fetch_failure(handle: Handle, source: BlobError) -> Self {
        Self::FetchFailure { handle, source }
    }

    /// Index of the piece whose store failed, if this is a piece store failure
    pub fn failed_piece(&self) -> Option<usize> {
        match self {
            TransferError::StoreFailure {
                target: StoreTarget::Piece(index),
                ..
            } => Some(*index),
            _ => None,
        }
    }

    /// Handle whose fetch failed, if this is a fetch failure
    pub fn failed_handle(&self) -> Option<&Handle> {
        match self {
            TransferError::FetchFailure { handle, .. } => Some(handle),
            _ => None,
        }
    }

    /// True when the caller sent something unusable (as opposed to a store-side failure)
    pub fn is_client_error(&self) -> bool {
        matches!(self, TransferError::Input { .. } | TransferError::Format { .. })
    }

    /// Carry this error through an `io::Error`, e.g. inside a body stream
    pub fn into_io(self) -> std::io::Error {
        std::io::Error::other(self)
    }

    /// Recover a transfer error previously wrapped with [`TransferError::into_io`]
    pub fn from_io(error: std::io::Error) -> Self {
        if error
            .get_ref()
            .map_or(false, |inner| inner.is::<TransferError>())
        {
            if let Some(inner) = error.into_inner() {
                if let Ok(transfer) = inner.downcast::<TransferError>() {
                    return *transfer;
                }
            }
            return Self::worker("transfer error lost while unwrapping");
        }
        Self::input(format!("stream read failed: {}", error))
    }
}
