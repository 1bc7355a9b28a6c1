use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tracing::{debug, info, instrument, warn};

use crate::manifest::check_filename;
use crate::{
    BlobPut, BlobStore, ByteStream, ChunkSplitter, Handle, JobId, Manifest, StoreTarget,
    TransferConfig, TransferError, TransferJob, TransferReference, TransferResult, UploadReceipt,
};

/// Turns an incoming byte stream into stored blobs and one reference.
///
/// Small files (declared size within one chunk) are stored as a single blob.
/// Everything else is split, stored piece by piece under the worker limit and
/// indexed by a manifest blob.
#[derive(Clone)]
pub struct UploadOrchestrator {
    store: Arc<dyn BlobStore>,
    config: TransferConfig,
}

impl UploadOrchestrator {
    pub(crate) fn new(store: Arc<dyn BlobStore>, config: TransferConfig) -> Self {
        Self { store, config }
    }

    /// Store `source` under `filename`.
    ///
    /// `declared` is the size the caller was told to expect. It only picks the
    /// path; the stream decides how many bytes actually get stored.
    pub async fn upload(
        &self,
        filename: &str,
        source: ByteStream,
        declared: Option<u64>,
    ) -> TransferResult<UploadReceipt> {
        let filename = filename.trim();
        check_filename(filename)?;
        self.run(JobId::new(), filename, source, declared).await
    }

    #[instrument(
        name = "upload",
        skip_all,
        fields(job = %job, filename = %filename, declared = ?declared)
    )]
    async fn run(
        &self,
        job: JobId,
        filename: &str,
        mut source: ByteStream,
        declared: Option<u64>,
    ) -> TransferResult<UploadReceipt> {
        let chunk_len = self.config.chunk_len();

        let size = match declared {
            Some(size) if size > 0 && size <= self.config.chunk_size => size,
            _ => {
                let splitter = ChunkSplitter::new(source, chunk_len);
                return self.store_chunked(job, filename, splitter).await;
            }
        };

        let mut buffer = BytesMut::with_capacity(size as usize);
        while let Some(next) = source.next().await {
            let bytes = next.map_err(TransferError::from_io)?;
            buffer.extend_from_slice(&bytes);
            if buffer.len() > chunk_len {
                warn!(
                    declared = size,
                    read = buffer.len(),
                    "stream is longer than declared, switching to chunked upload"
                );
                let splitter = ChunkSplitter::with_prefix(source, chunk_len, buffer.freeze());
                return self.store_chunked(job, filename, splitter).await;
            }
        }

        self.store_whole(filename, buffer.freeze()).await
    }

    async fn store_whole(&self, filename: &str, data: Bytes) -> TransferResult<UploadReceipt> {
        let size_bytes = data.len() as u64;
        let handle = self
            .store
            .store(BlobPut::whole(filename), data)
            .await
            .map_err(|e| TransferError::store_failure(StoreTarget::Piece(0), e))?;

        info!(handle = %handle, bytes = size_bytes, "stored file as a single blob");
        Ok(UploadReceipt {
            reference: TransferReference::direct(handle, filename),
            filename: filename.to_string(),
            pieces: 1,
            size_bytes,
        })
    }

    async fn store_chunked(
        &self,
        job: JobId,
        filename: &str,
        mut splitter: ChunkSplitter,
    ) -> TransferResult<UploadReceipt> {
        let mut pieces: TransferJob<Handle> = TransferJob::new(job, self.config.workers);
        let mut size_bytes = 0u64;

        while !pieces.has_failed() {
            let piece = match splitter.next_piece().await {
                Ok(Some(piece)) => piece,
                Ok(None) => break,
                Err(e) => {
                    pieces.drain().await;
                    return Err(e);
                }
            };

            let index = piece.index;
            size_bytes += piece.len() as u64;
            debug!(piece = index, bytes = piece.len(), "storing piece");

            let store = Arc::clone(&self.store);
            let put = BlobPut::piece(index).with_origin(filename);
            let scheduled = pieces
                .submit(async move {
                    store
                        .store(put, piece.data)
                        .await
                        .map_err(|e| TransferError::store_failure(StoreTarget::Piece(index), e))
                })
                .await?;
            if scheduled.is_none() {
                break;
            }
        }

        let handles = pieces.join().await?;
        let count = handles.len();
        let manifest = Manifest::new(filename, handles)?;
        let handle = self
            .store
            .store(BlobPut::manifest(filename), manifest.encode())
            .await
            .map_err(|e| TransferError::store_failure(StoreTarget::Manifest, e))?;

        info!(
            manifest = %handle,
            pieces = count,
            bytes = size_bytes,
            "stored file as pieces"
        );
        Ok(UploadReceipt {
            reference: TransferReference::manifest(handle),
            filename: filename.to_string(),
            pieces: count,
            size_bytes,
        })
    }
}
