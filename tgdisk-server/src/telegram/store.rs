use async_trait::async_trait;
use bytes::Bytes;
use tgdisk_blob::{BlobError, BlobKind, BlobPut, BlobResult, BlobStore, Handle, StoreCapabilities};
use tracing::{debug, instrument};

use super::{TelegramClient, TelegramError};

/// Bot API `getFile` refuses anything bigger
pub const MAX_ITEM_BYTES: u64 = 20 * 1024 * 1024;
pub const MAX_CONCURRENCY: usize = 4;

/// Prefix of the first caption line on every stored document
pub const CAPTION_TAG: &str = "#tgdisk";

// Bot API caption limit is 1024 characters; leave room for the tag line
const MAX_CAPTION_NAME_CHARS: usize = 900;

/// Caption for a stored blob: a tag line naming its kind, then the original filename
pub fn caption_for(put: &BlobPut) -> String {
    let tag = match put.kind {
        BlobKind::Whole => format!("{}:whole", CAPTION_TAG),
        BlobKind::Piece { index } => format!("{}:piece:{}", CAPTION_TAG, index),
        BlobKind::Manifest => format!("{}:manifest", CAPTION_TAG),
    };
    let name: String = put
        .origin
        .as_deref()
        .unwrap_or(&put.name)
        .chars()
        .take(MAX_CAPTION_NAME_CHARS)
        .collect();
    format!("{}\n{}", tag, name)
}

/// Recover the blob kind from a caption written by [`caption_for`]
pub fn kind_from_caption(caption: &str) -> Option<BlobKind> {
    let tag = caption.lines().next()?.trim();
    let rest = tag.strip_prefix(CAPTION_TAG)?.strip_prefix(':')?;
    match rest {
        "whole" => Some(BlobKind::Whole),
        "manifest" => Some(BlobKind::Manifest),
        other => other
            .strip_prefix("piece:")?
            .parse()
            .ok()
            .map(|index| BlobKind::Piece { index }),
    }
}

/// Original filename from a tagged caption
pub(crate) fn filename_from_caption(caption: &str) -> Option<&str> {
    kind_from_caption(caption)?;
    caption
        .split_once('\n')
        .map(|(_, name)| name.trim())
        .filter(|name| !name.is_empty())
}

/// Blob store that keeps every blob as a document in one Telegram chat
#[derive(Debug, Clone)]
pub struct TelegramStore {
    client: TelegramClient,
    chat_id: i64,
}

impl TelegramStore {
    pub fn new(client: TelegramClient, chat_id: i64) -> Self {
        Self { client, chat_id }
    }
}

#[async_trait]
impl BlobStore for TelegramStore {
    #[instrument(name = "telegram.store", skip_all, fields(name = %put.name, size = body.len()))]
    async fn store(&self, put: BlobPut, body: Bytes) -> BlobResult<Handle> {
        let size = body.len() as u64;
        if size > MAX_ITEM_BYTES {
            return Err(BlobError::TooLarge {
                size,
                limit: MAX_ITEM_BYTES,
            });
        }

        let caption = caption_for(&put);
        let message = self
            .client
            .send_document(self.chat_id, &put.name, &caption, body)
            .await?;
        let document = message
            .document
            .ok_or(TelegramError::Missing("document"))?;

        debug!(file_id = %document.file_id, message_id = message.message_id, "stored document");
        Ok(Handle::from_string(document.file_id))
    }

    #[instrument(name = "telegram.fetch", skip_all, fields(handle = %handle))]
    async fn fetch(&self, handle: &Handle) -> BlobResult<Bytes> {
        let file = self.client.get_file(handle.as_str()).await?;
        let path = file.file_path.ok_or(TelegramError::Missing("file_path"))?;
        let data = self.client.download(&path).await?;
        debug!(size = data.len(), "fetched document");
        Ok(data)
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::basic()
            .with_max_item_bytes(MAX_ITEM_BYTES)
            .with_max_concurrency(MAX_CONCURRENCY)
    }
}
