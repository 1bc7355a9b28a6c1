use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{BlobError, BlobKind, BlobPut, BlobResult, BlobStore, Handle, StoreCapabilities};

/// In-process blob store, for tests and for running without a remote backend
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<Handle, StoredBlob>>>,
    next_id: Arc<AtomicU64>,
    caps: StoreCapabilities,
}

/// A blob held by [`MemoryBlobStore`]
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub name: String,
    pub kind: BlobKind,
    pub data: Bytes,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject blobs larger than `bytes`, like a remote store would
    pub fn with_max_item_bytes(mut self, bytes: u64) -> Self {
        self.caps = self.caps.with_max_item_bytes(bytes);
        self
    }

    /// Number of blobs stored so far
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Look at a stored blob without going through `fetch`
    pub fn get(&self, handle: &Handle) -> Option<StoredBlob> {
        self.blobs.read().get(handle).cloned()
    }

    /// Count stored blobs of one kind
    pub fn count_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&StoredBlob) -> bool,
    {
        self.blobs.read().values().filter(|b| predicate(b)).count()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, put: BlobPut, body: Bytes) -> BlobResult<Handle> {
        if let Some(limit) = self.caps.max_item_bytes {
            let size = body.len() as u64;
            if size > limit {
                return Err(BlobError::TooLarge { size, limit });
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = Handle(format!("mem-{:06}", id));
        self.blobs.write().insert(
            handle.clone(),
            StoredBlob {
                name: put.name,
                kind: put.kind,
                data: body,
            },
        );
        Ok(handle)
    }

    async fn fetch(&self, handle: &Handle) -> BlobResult<Bytes> {
        self.blobs
            .read()
            .get(handle)
            .map(|blob| blob.data.clone())
            .ok_or_else(|| BlobError::not_found(handle.as_str()))
    }

    fn capabilities(&self) -> StoreCapabilities {
        self.caps.clone()
    }
}
