use axum::extract::rejection::QueryRejection;
use serde::Deserialize;
use tgdisk_blob::{Handle, TransferError, TransferReference, TransferResult};

use crate::TgDiskError;

pub fn map_query_rejection(rejection: QueryRejection) -> TgDiskError {
    TgDiskError::bad_request(format!("Failed to parse the query string: {}", rejection))
}

/// Which kind of blob a bare `file_id` names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Direct,
    Manifest,
}

/// Query accepted by `GET /d`
#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub file_id: Option<String>,
    pub kind: Option<ReferenceKind>,
    pub filename: Option<String>,
}

impl DownloadQuery {
    /// Resolve to a reference. The kind is never guessed from which
    /// parameters happen to be present.
    pub fn into_reference(self) -> TransferResult<TransferReference> {
        let file_id = self
            .file_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        match (self.reference, file_id) {
            (Some(_), Some(_)) => Err(TransferError::input("use either ref or file_id, not both")),
            (Some(token), None) => TransferReference::from_token(&token),
            (None, Some(file_id)) => match self.kind {
                Some(ReferenceKind::Manifest) => Ok(TransferReference::manifest(Handle(file_id))),
                Some(ReferenceKind::Direct) => {
                    let filename = self
                        .filename
                        .map(|name| name.trim().to_string())
                        .filter(|name| !name.is_empty())
                        .ok_or_else(|| TransferError::input("a direct file_id needs a filename"))?;
                    Ok(TransferReference::direct(Handle(file_id), filename))
                }
                None => Err(TransferError::input("file_id needs kind=direct or kind=manifest")),
            },
            (None, None) => Err(TransferError::input("missing ref or file_id")),
        }
    }
}

/// Query accepted by `POST /upload`
#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub pwd: Option<String>,
}
