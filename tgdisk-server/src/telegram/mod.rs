//! Telegram Bot API client and the blob store built on top of it.

mod client;
mod store;

use thiserror::Error;
use tgdisk_blob::BlobError;

pub use client::{
    ApiResponse, Attachment, Chat, Message, Sticker, TelegramClient, TelegramFile, Update, User,
    DEFAULT_API_URL,
};
pub use store::{
    caption_for, kind_from_caption, TelegramStore, CAPTION_TAG, MAX_CONCURRENCY, MAX_ITEM_BYTES,
};
pub(crate) use store::filename_from_caption;

/// Errors raised while talking to the Bot API
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Transport failure; the request URL is stripped since it carries the token
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Telegram API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("Unexpected HTTP status {status} from {what}")]
    Status { status: u16, what: &'static str },

    #[error("Telegram response is missing {0}")]
    Missing(&'static str),

    #[error("Invalid Telegram client configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for TelegramError {
    fn from(error: reqwest::Error) -> Self {
        Self::Http(error.without_url())
    }
}

impl From<TelegramError> for BlobError {
    fn from(error: TelegramError) -> Self {
        match error {
            TelegramError::Api { description, .. } => BlobError::rejected(description),
            other => BlobError::backend(other),
        }
    }
}
