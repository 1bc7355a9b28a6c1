use axum::{
    extract::{rejection::QueryRejection, Query, Request, State},
    http::{header, HeaderMap},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::middlewares::{field_stream, field_text, StreamingForm};
use crate::params::{map_query_rejection, UploadQuery};
use crate::{TgDiskError, TgDiskState};

/// Form field carrying the file
pub const FILE_FIELD: &str = "file";
/// Form field carrying the password; must come before the file
pub const PASSWORD_FIELD: &str = "pwd";
/// Header alternative to the password field
pub const PASSWORD_HEADER: &str = "x-access-pwd";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub file_id: String,
    pub download_url: String,
    pub pieces: usize,
    pub size: u64,
}

/// Request body size, an upper bound on the file size
fn declared_size(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

pub async fn upload(
    State(state): State<TgDiskState>,
    query: Result<Query<UploadQuery>, QueryRejection>,
    request: Request,
) -> Result<Json<UploadResponse>, TgDiskError> {
    let Query(query) = query.map_err(map_query_rejection)?;
    let headers = request.headers().clone();
    let declared = declared_size(&headers);

    let mut password = query.pwd.or_else(|| {
        headers
            .get(PASSWORD_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    });

    let mut form = StreamingForm::from_request(request)?;
    let file = loop {
        let Some(field) = form.next_field().await? else {
            return Err(TgDiskError::bad_request("Missing file field"));
        };
        match field.name() {
            Some(FILE_FIELD) => break field,
            Some(PASSWORD_FIELD) => password = Some(field_text(field).await?),
            _ => {
                // unknown fields are read and dropped
                field_text(field).await?;
            }
        }
    };

    state.access.check(password.as_deref()).await?;

    let filename = file
        .file_name()
        .map(str::to_string)
        .unwrap_or_default();
    let receipt = state
        .transfers
        .upload(&filename, field_stream(file), declared)
        .await?;

    let download_url = state.links.download_url(&headers, &receipt.reference);
    info!(
        filename = %receipt.filename,
        pieces = receipt.pieces,
        bytes = receipt.size_bytes,
        "upload complete"
    );

    Ok(Json(UploadResponse {
        file_id: receipt.reference.handle().to_string(),
        filename: receipt.filename,
        download_url,
        pieces: receipt.pieces,
        size: receipt.size_bytes,
    }))
}
