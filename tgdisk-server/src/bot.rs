//! Link bot: reply `get` to a stored document in a private chat with the bot and it
//! answers with a download link.

use std::time::Duration;

use tgdisk_axum::download_link;
use tgdisk_blob::{BlobKind, Handle, TransferReference};
use tracing::{debug, info, warn};

use crate::telegram::{filename_from_caption, kind_from_caption, Message, TelegramClient};

pub const POLL_TIMEOUT_SECS: u64 = 60;
const RETRY_DELAY: Duration = Duration::from_secs(5);
const FALLBACK_FILENAME: &str = "file";
const STICKER_FILENAME: &str = "sticker";

const STARTUP_NOTICE: &str = "tgdisk is up. Reply \"get\" to a file to receive its download link.";

/// What the bot answers to one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotReply {
    Link(String),
    NoBaseUrl,
    NotAuthorized,
    NoAttachment,
}

impl BotReply {
    pub fn text(&self) -> String {
        match self {
            BotReply::Link(url) => url.clone(),
            BotReply::NoBaseUrl => {
                "No BASE_URL is configured, so download links cannot be built.".to_string()
            }
            BotReply::NotAuthorized => "You are not authorized to use this bot.".to_string(),
            BotReply::NoAttachment => {
                "Could not find a file in the message you replied to.".to_string()
            }
        }
    }
}

fn is_get_command(text: &str) -> bool {
    let text = text.trim();
    let command = text.strip_prefix('/').unwrap_or(text);
    let command = command.split('@').next().unwrap_or_default();
    command.eq_ignore_ascii_case("get")
}

/// Telegram re-encodes GIF animations as MP4 but keeps the `.gif` name
fn animation_filename(name: &str) -> String {
    match name.len().checked_sub(4) {
        Some(stem) if name.is_char_boundary(stem) && name[stem..].eq_ignore_ascii_case(".gif") => {
            format!("{}.mp4", &name[..stem])
        }
        _ => name.to_string(),
    }
}

/// Reference for the file attached to `message`, judged by the caption tag tgdisk wrote
pub fn reference_for(message: &Message) -> Option<TransferReference> {
    let Some(attachment) = message.attachment() else {
        let sticker = message.sticker.as_ref()?;
        let name = sticker
            .emoji
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(STICKER_FILENAME);
        return Some(TransferReference::direct(
            Handle::from_string(sticker.file_id.clone()),
            name,
        ));
    };
    let handle = Handle::from_string(attachment.file_id.clone());
    let caption = message.caption.as_deref().unwrap_or_default();

    if kind_from_caption(caption) == Some(BlobKind::Manifest) {
        return Some(TransferReference::manifest(handle));
    }

    if let Some(name) = filename_from_caption(caption) {
        return Some(TransferReference::direct(handle, name));
    }
    let name = attachment.file_name.as_deref().unwrap_or(FALLBACK_FILENAME);
    let name = if message.animation.is_some() {
        animation_filename(name)
    } else {
        name.to_string()
    };
    Some(TransferReference::direct(handle, name))
}

/// Where a reply to `message` goes: the sender privately, never a group
pub fn reply_target(message: &Message) -> i64 {
    message.from.as_ref().map_or(message.chat.id, |user| user.id)
}

pub struct LinkBot {
    client: TelegramClient,
    owner: i64,
    base: Option<String>,
}

impl LinkBot {
    pub fn new(client: TelegramClient, owner: i64, base: Option<String>) -> Self {
        Self {
            client,
            owner,
            base: base.filter(|b| !b.trim().is_empty()),
        }
    }

    /// Decide the reply to `message`; `None` means stay quiet
    pub fn decide(&self, message: &Message) -> Option<BotReply> {
        let replied = message.reply_to_message.as_deref()?;

        if message.from.as_ref().map(|u| u.id) != Some(self.owner) {
            return Some(BotReply::NotAuthorized);
        }
        if !message.chat.is_private() || !is_get_command(message.text.as_deref()?) {
            return None;
        }

        let Some(base) = self.base.as_deref() else {
            return Some(BotReply::NoBaseUrl);
        };
        Some(match reference_for(replied) {
            Some(reference) => BotReply::Link(download_link(base, &reference)),
            None => BotReply::NoAttachment,
        })
    }

    async fn handle(&self, message: &Message) {
        let Some(reply) = self.decide(message) else {
            return;
        };
        let recipient = reply_target(message);
        debug!(recipient, reply = ?reply, "bot reply");
        if let Err(e) = self.client.send_message(recipient, &reply.text()).await {
            warn!(error = %e, recipient, "failed to send bot reply");
        }
    }

    /// Poll for updates until the task is dropped
    pub async fn run(self) {
        if let Err(e) = self.client.send_message(self.owner, STARTUP_NOTICE).await {
            warn!(error = %e, "failed to send startup notice");
        }
        info!(owner = self.owner, "link bot polling");

        let mut offset = 0;
        loop {
            match self.client.get_updates(offset, POLL_TIMEOUT_SECS).await {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        if let Some(message) = update.message.as_ref() {
                            self.handle(message).await;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "getUpdates failed, retrying in {:?}", RETRY_DELAY);
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }
}
