use std::sync::Arc;

use tracing::debug;

use crate::{
    BlobStore, ByteStream, DownloadOrchestrator, OpenedFile, TransferConfig, TransferReference,
    TransferResult, UploadOrchestrator, UploadReceipt,
};

/// The transfer adapter - what the HTTP layer and the bot embed
#[derive(Clone)]
pub struct TransferAdapter {
    config: TransferConfig,
    uploads: UploadOrchestrator,
    downloads: DownloadOrchestrator,
}

impl TransferAdapter {
    /// Create an adapter over `store`, checking `config` against the store's limits
    pub fn new<S: BlobStore + 'static>(store: S, config: TransferConfig) -> TransferResult<Self> {
        Self::from_shared(Arc::new(store), config)
    }

    /// Create from an already shared store
    pub fn from_shared(store: Arc<dyn BlobStore>, config: TransferConfig) -> TransferResult<Self> {
        let caps = store.capabilities();
        config.validate(&caps)?;
        debug!(
            chunk_size = config.chunk_size,
            workers = config.workers,
            "transfer adapter ready"
        );

        Ok(Self {
            uploads: UploadOrchestrator::new(Arc::clone(&store), config.clone()),
            downloads: DownloadOrchestrator::new(store, config.clone()),
            config,
        })
    }

    /// Store a file from a stream
    pub async fn upload(
        &self,
        filename: &str,
        body: ByteStream,
        declared_size: Option<u64>,
    ) -> TransferResult<UploadReceipt> {
        self.uploads.upload(filename, body, declared_size).await
    }

    /// Open a stored file for streaming
    pub async fn download(&self, reference: &TransferReference) -> TransferResult<OpenedFile> {
        self.downloads.download(reference).await
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }
}
