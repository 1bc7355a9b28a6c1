use async_trait::async_trait;
use bytes::Bytes;

use crate::{BlobPut, BlobResult, Handle};

/// Blob storage primitive the transfer engine is built on.
///
/// Implementations persist opaque byte blobs and hand back a [`Handle`] that is
/// meaningful only to [`BlobStore::fetch`]. There is no delete: anything stored
/// stays stored.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist one blob
    async fn store(&self, put: BlobPut, body: Bytes) -> BlobResult<Handle>;

    /// Retrieve a blob in full
    async fn fetch(&self, handle: &Handle) -> BlobResult<Bytes>;

    /// Limits the engine must respect when talking to this store
    fn capabilities(&self) -> StoreCapabilities;
}

/// Store capabilities
#[derive(Debug, Clone, Default)]
pub struct StoreCapabilities {
    /// Largest blob the store accepts (and can serve back)
    pub max_item_bytes: Option<u64>,
    /// Most operations the store tolerates in flight at once
    pub max_concurrency: Option<usize>,
}

impl StoreCapabilities {
    pub fn basic() -> Self {
        Self {
            max_item_bytes: None,
            max_concurrency: None,
        }
    }

    pub fn with_max_item_bytes(mut self, bytes: u64) -> Self {
        self.max_item_bytes = Some(bytes);
        self
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }
}

#[async_trait]
impl<S: BlobStore + ?Sized> BlobStore for std::sync::Arc<S> {
    async fn store(&self, put: BlobPut, body: Bytes) -> BlobResult<Handle> {
        (**self).store(put, body).await
    }

    async fn fetch(&self, handle: &Handle) -> BlobResult<Bytes> {
        (**self).fetch(handle).await
    }

    fn capabilities(&self) -> StoreCapabilities {
        (**self).capabilities()
    }
}
