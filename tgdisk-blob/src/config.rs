use crate::{StoreCapabilities, TransferError, TransferResult};

/// Largest attachment a Telegram bot may download: 20 MiB
pub const DEFAULT_CHUNK_SIZE: u64 = 20 * 1024 * 1024;

/// Telegram throttles parallel file calls per bot; four stays under the limit
pub const DEFAULT_WORKERS: usize = 4;

/// Configuration for transfer jobs
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Piece size `C`. Every piece except the last is exactly this long.
    pub chunk_size: u64,

    /// Worker limit `W`: store/fetch operations in flight per job
    pub workers: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl TransferConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the piece size in bytes
    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Set the piece size in MiB
    pub fn with_chunk_size_mib(self, mib: u64) -> Self {
        self.with_chunk_size(mib.saturating_mul(1024 * 1024))
    }

    /// Set the worker limit
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Check the config against the limits a store advertises.
    pub fn validate(&self, caps: &StoreCapabilities) -> TransferResult<()> {
        if self.chunk_size == 0 {
            return Err(TransferError::config("chunk size must be at least one byte"));
        }
        if usize::try_from(self.chunk_size).is_err() {
            return Err(TransferError::config(format!(
                "chunk size {} does not fit in memory on this platform",
                self.chunk_size
            )));
        }
        if self.workers == 0 {
            return Err(TransferError::config("worker limit must be at least 1"));
        }
        if let Some(limit) = caps.max_item_bytes {
            if self.chunk_size > limit {
                return Err(TransferError::config(format!(
                    "chunk size {} exceeds the store's per-item limit of {} bytes",
                    self.chunk_size, limit
                )));
            }
        }
        if let Some(limit) = caps.max_concurrency {
            if self.workers > limit {
                return Err(TransferError::config(format!(
                    "worker limit {} exceeds the store's concurrency limit of {}",
                    self.workers, limit
                )));
            }
        }
        Ok(())
    }

    /// Piece size as a buffer length. Only valid after [`TransferConfig::validate`].
    pub(crate) fn chunk_len(&self) -> usize {
        usize::try_from(self.chunk_size).unwrap_or(usize::MAX)
    }
}
