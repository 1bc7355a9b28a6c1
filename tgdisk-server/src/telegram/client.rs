use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Proxy, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::TelegramError;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
// Extra time on top of the long-poll timeout before the request itself gives up
const POLL_GRACE: Duration = Duration::from_secs(15);

/// Bot API envelope: `{ ok, result, description, error_code }`
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self) -> Result<T, TelegramError> {
        if !self.ok {
            return Err(TelegramError::Api {
                code: self.error_code.unwrap_or_default(),
                description: self
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }
        self.result.ok_or(TelegramError::Missing("result"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Chat {
    pub fn is_private(&self) -> bool {
        self.kind == "private"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
}

/// Any file-bearing part of a message (document, video, audio, animation)
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub file_id: String,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sticker {
    pub file_id: String,
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub document: Option<Attachment>,
    pub video: Option<Attachment>,
    pub audio: Option<Attachment>,
    pub animation: Option<Attachment>,
    pub sticker: Option<Sticker>,
    pub reply_to_message: Option<Box<Message>>,
}

impl Message {
    /// First attachment found, documents before media
    pub fn attachment(&self) -> Option<&Attachment> {
        self.document
            .as_ref()
            .or(self.video.as_ref())
            .or(self.audio.as_ref())
            .or(self.animation.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramFile {
    pub file_id: String,
    pub file_path: Option<String>,
    pub file_size: Option<u64>,
}

/// Minimal Bot API client: the handful of methods tgdisk needs
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    api_url: String,
    token: String,
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_url", &self.api_url)
            .field("token", &"***")
            .finish()
    }
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Result<Self, TelegramError> {
        Self::with_options(token, DEFAULT_API_URL, None)
    }

    /// Client against `api_url`, optionally routed through an HTTP(S) proxy
    pub fn with_options(
        token: impl Into<String>,
        api_url: &str,
        proxy: Option<&str>,
    ) -> Result<Self, TelegramError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(TelegramError::Config("bot token is empty".to_string()));
        }

        let mut builder = Client::builder().connect_timeout(CONNECT_TIMEOUT);
        if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
            let proxy = Proxy::all(proxy)
                .map_err(|e| TelegramError::Config(format!("invalid proxy '{}': {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }
        let http = builder
            .build()
            .map_err(|e| TelegramError::Config(e.without_url().to_string()))?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_url, self.token, file_path)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        request: RequestBuilder,
    ) -> Result<T, TelegramError> {
        debug!(method, "telegram call");
        let response = request.send().await?;
        let status = response.status();
        // Errors come back with a JSON envelope too; anything else is a transport problem
        let envelope = match response.json::<ApiResponse<T>>().await {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(TelegramError::Status {
                    status: status.as_u16(),
                    what: method,
                })
            }
            Err(e) => return Err(e.into()),
        };
        envelope.into_result()
    }

    /// Upload `data` as a document into `chat_id`
    pub async fn send_document(
        &self,
        chat_id: i64,
        filename: &str,
        caption: &str,
        data: Bytes,
    ) -> Result<Message, TelegramError> {
        let len = data.len() as u64;
        let document = Part::stream_with_length(data, len).file_name(filename.to_string());
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("disable_content_type_detection", "true")
            .part("document", document);

        self.call(
            "sendDocument",
            self.http.post(self.method_url("sendDocument")).multipart(form),
        )
        .await
    }

    pub async fn get_file(&self, file_id: &str) -> Result<TelegramFile, TelegramError> {
        self.call(
            "getFile",
            self.http
                .get(self.method_url("getFile"))
                .query(&[("file_id", file_id)]),
        )
        .await
    }

    /// Download the content behind a `file_path` returned by [`TelegramClient::get_file`]
    pub async fn download(&self, file_path: &str) -> Result<Bytes, TelegramError> {
        let response = self.http.get(self.file_url(file_path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TelegramError::Status {
                status: status.as_u16(),
                what: "file download",
            });
        }
        Ok(response.bytes().await?)
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<Message, TelegramError> {
        self.call(
            "sendMessage",
            self.http
                .post(self.method_url("sendMessage"))
                .json(&serde_json::json!({ "chat_id": chat_id, "text": text })),
        )
        .await
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            self.http
                .get(self.method_url("getUpdates"))
                .query(&[("offset", offset.to_string()), ("timeout", timeout_secs.to_string())])
                .timeout(Duration::from_secs(timeout_secs) + POLL_GRACE),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_ok_yields_result() {
        let raw = r#"{"ok":true,"result":{"file_id":"abc","file_path":"documents/file_1.bin"}}"#;
        let parsed: ApiResponse<TelegramFile> = serde_json::from_str(raw).unwrap();
        let file = parsed.into_result().unwrap();
        assert_eq!(file.file_path.as_deref(), Some("documents/file_1.bin"));
    }

    #[test]
    fn envelope_not_ok_is_api_error() {
        let raw = r#"{"ok":false,"error_code":400,"description":"Bad Request: invalid file_id"}"#;
        let parsed: ApiResponse<TelegramFile> = serde_json::from_str(raw).unwrap();
        match parsed.into_result().unwrap_err() {
            TelegramError::Api { code, description } => {
                assert_eq!(code, 400);
                assert!(description.contains("invalid file_id"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn envelope_ok_without_result_is_missing() {
        let parsed: ApiResponse<TelegramFile> = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert!(matches!(
            parsed.into_result(),
            Err(TelegramError::Missing("result"))
        ));
    }

    #[test]
    fn reply_message_exposes_attachment() {
        let raw = r#"{
            "message_id": 10,
            "chat": {"id": 42, "type": "private"},
            "from": {"id": 42},
            "text": "get",
            "reply_to_message": {
                "message_id": 9,
                "chat": {"id": 42, "type": "private"},
                "caption": "whatever",
                "video": {"file_id": "VID", "file_size": 12}
            }
        }"#;
        let message: Message = serde_json::from_str(raw).unwrap();
        assert!(message.chat.is_private());
        let replied = message.reply_to_message.as_deref().unwrap();
        assert_eq!(replied.attachment().unwrap().file_id, "VID");
        assert!(message.attachment().is_none());
    }

    #[test]
    fn debug_hides_token() {
        let client = TelegramClient::new("123:SECRET").unwrap();
        assert!(!format!("{:?}", client).contains("SECRET"));
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(matches!(
            TelegramClient::new("  "),
            Err(TelegramError::Config(_))
        ));
    }

    #[test]
    fn urls_carry_token_and_trimmed_base() {
        let client = TelegramClient::with_options("T", "http://localhost:8081/", None).unwrap();
        assert_eq!(client.method_url("getMe"), "http://localhost:8081/botT/getMe");
        assert_eq!(
            client.file_url("documents/a.bin"),
            "http://localhost:8081/file/botT/documents/a.bin"
        );
    }
}
