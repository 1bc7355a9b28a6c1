use std::fmt;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{stream, StreamExt};
use tracing::{info, instrument};

use crate::content::{content_type_for, Disposition, OCTET_STREAM};
use crate::{
    BlobStore, ByteStream, Handle, JobId, Manifest, TransferConfig, TransferError, TransferJob,
    TransferReference, TransferResult,
};

/// A file ready to be streamed back to a client
pub struct OpenedFile {
    pub filename: String,
    pub content_type: String,
    pub disposition: Disposition,
    /// Known for direct references only
    pub content_length: Option<u64>,
    pub pieces: usize,
    /// File content in order. A failure part way through ends the stream with
    /// an I/O error wrapping the [`TransferError`].
    pub body: ByteStream,
}

impl OpenedFile {
    /// `Content-Disposition` header value for this file
    pub fn content_disposition(&self) -> String {
        self.disposition.header_value(&self.filename)
    }

    /// Collect the whole body, recovering the transfer error if it broke off
    pub async fn into_bytes(self) -> TransferResult<Bytes> {
        let mut body = self.body;
        let mut out = BytesMut::new();
        while let Some(chunk) = body.next().await {
            out.extend_from_slice(&chunk.map_err(TransferError::from_io)?);
        }
        Ok(out.freeze())
    }
}

impl fmt::Debug for OpenedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedFile")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("disposition", &self.disposition)
            .field("content_length", &self.content_length)
            .field("pieces", &self.pieces)
            .finish_non_exhaustive()
    }
}

/// Resolves references back into byte streams
#[derive(Clone)]
pub struct DownloadOrchestrator {
    store: Arc<dyn BlobStore>,
    config: TransferConfig,
}

impl DownloadOrchestrator {
    pub(crate) fn new(store: Arc<dyn BlobStore>, config: TransferConfig) -> Self {
        Self { store, config }
    }

    /// Open the file behind `reference`.
    ///
    /// For manifests, the manifest itself is fetched and decoded here, so a
    /// bad reference fails before any body byte is produced.
    pub async fn download(&self, reference: &TransferReference) -> TransferResult<OpenedFile> {
        match reference {
            TransferReference::Direct { handle, filename } => {
                self.open_direct(handle, filename).await
            }
            TransferReference::Manifest { handle } => {
                self.open_manifest(JobId::new(), handle).await
            }
        }
    }

    #[instrument(name = "download", skip_all, fields(handle = %handle, filename = %filename))]
    async fn open_direct(&self, handle: &Handle, filename: &str) -> TransferResult<OpenedFile> {
        let data = fetch(self.store.as_ref(), handle).await?;
        let content_type = content_type_for(filename);
        let disposition = Disposition::for_content_type(&content_type);
        let length = data.len() as u64;
        info!(bytes = length, content_type = %content_type, "serving single blob");

        Ok(OpenedFile {
            filename: filename.to_string(),
            content_type,
            disposition,
            content_length: Some(length),
            pieces: 1,
            body: Box::pin(stream::once(async move { Ok::<_, std::io::Error>(data) })),
        })
    }

    #[instrument(name = "download", skip_all, fields(job = %job, manifest = %handle))]
    async fn open_manifest(&self, job: JobId, handle: &Handle) -> TransferResult<OpenedFile> {
        let raw = fetch(self.store.as_ref(), handle).await?;
        let manifest = Manifest::decode(&raw)?;
        let pieces = manifest.len();
        let (filename, handles) = manifest.into_parts();
        info!(filename = %filename, pieces, "streaming file from manifest");

        let body = ordered_pieces(Arc::clone(&self.store), handles, self.config.workers, job);
        Ok(OpenedFile {
            filename,
            content_type: OCTET_STREAM.to_string(),
            disposition: Disposition::Attachment,
            content_length: None,
            pieces,
            body,
        })
    }
}

async fn fetch(store: &dyn BlobStore, handle: &Handle) -> TransferResult<Bytes> {
    let result = store.fetch(handle).await;
    result.map_err(|e| TransferError::fetch_failure(handle.clone(), e))
}

/// Fetch `handles` with at most `workers` in flight and yield them in order.
///
/// Piece `i + workers` is not requested before piece `i` has been yielded, so
/// at most `workers` pieces are buffered at any time.
fn ordered_pieces(
    store: Arc<dyn BlobStore>,
    handles: Vec<Handle>,
    workers: usize,
    job: JobId,
) -> ByteStream {
    Box::pin(async_stream::try_stream! {
        let mut pieces: TransferJob<Bytes> = TransferJob::new(job, workers);
        let mut next = 0;

        for index in 0..handles.len() {
            while next < handles.len() && next < index + workers {
                let handle = handles[next].clone();
                let store = Arc::clone(&store);
                let scheduled = pieces
                    .submit(async move { fetch(store.as_ref(), &handle).await })
                    .await
                    .map_err(TransferError::into_io)?;
                if scheduled.is_none() {
                    break;
                }
                next += 1;
            }

            let data = pieces.wait_for(index).await.map_err(TransferError::into_io)?;
            yield data;
        }
    })
}
