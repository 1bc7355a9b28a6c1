//! # tgdisk-blob: chunked transfer engine
//!
//! `tgdisk-blob` stores files of any size in a blob store that only accepts
//! small items, such as a chat platform's attachments. Files are cut into
//! fixed-size pieces, the pieces are stored concurrently, and a small manifest
//! records their order so the file can be streamed back later.
//!
//! ## Key Features
//!
//! - **Streaming upload**: pieces are cut from the incoming stream as it arrives
//! - **Bounded concurrency**: at most `W` store or fetch calls in flight per job
//! - **Ordered reassembly**: downloads stream pieces in manifest order with a
//!   reorder window of `W`
//! - **Store agnostic**: anything implementing [`BlobStore`] works
//!
//! ## Quick Start
//!
//! ```rust
//! use tgdisk_blob::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> TransferResult<()> {
//! let store = MemoryBlobStore::new();
//! let adapter = TransferAdapter::new(store, TransferConfig::new().with_chunk_size(4))?;
//!
//! let body = futures::stream::once(async {
//!     Ok::<_, std::io::Error>(bytes::Bytes::from_static(b"hello world"))
//! });
//! let receipt = adapter.upload("hello.txt", Box::pin(body), None).await?;
//! assert_eq!(receipt.pieces, 3);
//!
//! let opened = adapter.download(&receipt.reference).await?;
//! assert_eq!(opened.filename, "hello.txt");
//! assert_eq!(&opened.into_bytes().await?[..], b"hello world");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │   HTTP / bot         │  ← request handling
//! ├──────────────────────┤
//! │   TransferAdapter    │  ← splitting, manifests, ordering
//! ├──────────────────────┤
//! │   BlobStore          │  ← store(bytes) / fetch(handle)
//! └──────────────────────┘
//! ```
//!
//! A stored file is addressed by a [`TransferReference`]: either a single blob
//! plus its filename, or the handle of a manifest blob.

pub mod adapter;
mod config;
pub mod content;
mod download;
mod error;
pub mod manifest;
mod memory;
mod pool;
mod splitter;
pub mod store;
mod types;
mod upload;

pub use adapter::TransferAdapter;
pub use config::{TransferConfig, DEFAULT_CHUNK_SIZE, DEFAULT_WORKERS};
pub use content::Disposition;
pub use download::{DownloadOrchestrator, OpenedFile};
pub use error::{BlobError, BlobResult, StoreTarget, TransferError, TransferResult};
pub use manifest::{Manifest, MANIFEST_NAME};
pub use memory::{MemoryBlobStore, StoredBlob};
pub use pool::TransferJob;
pub use splitter::ChunkSplitter;
pub use store::{BlobStore, StoreCapabilities};
pub use types::{
    BlobKind, BlobPut, ByteStream, Handle, JobId, Piece, TransferReference, UploadReceipt,
};
pub use upload::UploadOrchestrator;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobError, BlobKind, BlobPut, BlobResult, BlobStore, ByteStream, Handle, MemoryBlobStore,
        OpenedFile, StoreCapabilities, TransferAdapter, TransferConfig, TransferError,
        TransferReference, TransferResult, UploadReceipt,
    };
}
