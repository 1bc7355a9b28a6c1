use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bytes::Bytes;
use futures::Stream;
use std::fmt;
use std::pin::Pin;
use std::str::FromStr;
use uuid::Uuid;

use crate::{TransferError, TransferResult};

/// Stream of bytes for file content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Opaque identifier the blob store hands back for a stored item
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle(pub String);

impl Handle {
    /// Create from existing string
    pub fn from_string(handle: String) -> Self {
        Self(handle)
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Handle {
    fn from(handle: &str) -> Self {
        Self(handle.to_string())
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for one upload or download pass, used in logs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        Self(format!("job_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a stored blob is, so stores can label it for later inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    /// A whole file small enough to be one blob
    Whole,
    /// One piece of a chunked file
    Piece { index: usize },
    /// The manifest listing a chunked file's pieces
    Manifest,
}

/// Request to store one blob
#[derive(Debug, Clone)]
pub struct BlobPut {
    /// Suggested name for the stored item (stores may ignore it)
    pub name: String,
    pub kind: BlobKind,
    /// Original filename the blob belongs to, when it differs from `name`
    pub origin: Option<String>,
}

impl BlobPut {
    pub fn new<S: Into<String>>(name: S, kind: BlobKind) -> Self {
        Self {
            name: name.into(),
            kind,
            origin: None,
        }
    }

    pub fn whole<S: Into<String>>(filename: S) -> Self {
        Self::new(filename, BlobKind::Whole)
    }

    pub fn piece(index: usize) -> Self {
        Self::new(format!("blob_{}", index), BlobKind::Piece { index })
    }

    pub fn manifest<S: Into<String>>(origin: S) -> Self {
        Self::new(crate::MANIFEST_NAME, BlobKind::Manifest).with_origin(origin)
    }

    pub fn with_origin<S: Into<String>>(mut self, origin: S) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// One contiguous segment of an uploaded file
#[derive(Debug, Clone)]
pub struct Piece {
    /// Zero-based position in the file
    pub index: usize,
    pub data: Bytes,
}

impl Piece {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Externally visible reference to a stored file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferReference {
    /// The file is a single blob; the filename travels with the reference
    Direct { handle: Handle, filename: String },
    /// The handle names a manifest; the filename lives inside it
    Manifest { handle: Handle },
}

const DIRECT_TAG: &str = "d";
const MANIFEST_TAG: &str = "m";

impl TransferReference {
    pub fn direct<S: Into<String>>(handle: Handle, filename: S) -> Self {
        Self::Direct {
            handle,
            filename: filename.into(),
        }
    }

    pub fn manifest(handle: Handle) -> Self {
        Self::Manifest { handle }
    }

    /// Handle of the blob the reference points at
    pub fn handle(&self) -> &Handle {
        match self {
            TransferReference::Direct { handle, .. } => handle,
            TransferReference::Manifest { handle } => handle,
        }
    }

    /// Filename carried by the reference itself (direct references only)
    pub fn filename(&self) -> Option<&str> {
        match self {
            TransferReference::Direct { filename, .. } => Some(filename),
            TransferReference::Manifest { .. } => None,
        }
    }

    pub fn is_manifest(&self) -> bool {
        matches!(self, TransferReference::Manifest { .. })
    }

    /// URL-safe token form: `d.<handle>.<filename>` or `m.<handle>`, base64url encoded parts.
    pub fn to_token(&self) -> String {
        match self {
            TransferReference::Direct { handle, filename } => format!(
                "{}.{}.{}",
                DIRECT_TAG,
                URL_SAFE_NO_PAD.encode(handle.as_str()),
                URL_SAFE_NO_PAD.encode(filename)
            ),
            TransferReference::Manifest { handle } => format!(
                "{}.{}",
                MANIFEST_TAG,
                URL_SAFE_NO_PAD.encode(handle.as_str())
            ),
        }
    }

    /// Parse a token produced by [`TransferReference::to_token`]
    pub fn from_token(token: &str) -> TransferResult<Self> {
        let mut parts = token.trim().split('.');
        let tag = parts.next().unwrap_or_default();
        let reference = match (tag, parts.next(), parts.next(), parts.next()) {
            (DIRECT_TAG, Some(handle), Some(filename), None) => Self::Direct {
                handle: Handle(decode_part(handle)?),
                filename: decode_part(filename)?,
            },
            (MANIFEST_TAG, Some(handle), None, None) => Self::Manifest {
                handle: Handle(decode_part(handle)?),
            },
            _ => {
                return Err(TransferError::input(format!(
                    "unrecognised file reference '{}'",
                    token
                )))
            }
        };
        if reference.handle().as_str().is_empty() {
            return Err(TransferError::input("file reference has an empty handle"));
        }
        Ok(reference)
    }
}

fn decode_part(part: &str) -> TransferResult<String> {
    let raw = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| TransferError::input(format!("file reference is not valid base64: {}", e)))?;
    String::from_utf8(raw).map_err(|_| TransferError::input("file reference is not valid UTF-8"))
}

impl fmt::Display for TransferReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_token())
    }
}

impl FromStr for TransferReference {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s)
    }
}

/// Receipt returned after a file has been stored
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub reference: TransferReference,
    pub filename: String,
    /// Number of pieces stored, not counting the manifest
    pub pieces: usize,
    pub size_bytes: u64,
}
