use axum::extract::{multipart::MultipartRejection, Multipart, State};

use crate::routes::upload::PASSWORD_FIELD;
use crate::{TgDiskError, TgDiskState};

/// Check a password without uploading anything
pub async fn verify(
    State(state): State<TgDiskState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<&'static str, TgDiskError> {
    let mut multipart = multipart.map_err(|e| {
        TgDiskError::bad_request(format!("Expected multipart/form-data: {}", e))
    })?;

    let mut password = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| TgDiskError::bad_request(e.body_text()))?
    {
        if field.name() == Some(PASSWORD_FIELD) {
            password = Some(
                field
                    .text()
                    .await
                    .map_err(|e| TgDiskError::bad_request(e.body_text()))?,
            );
            break;
        }
    }

    state.access.check(password.as_deref()).await?;
    Ok("ok")
}
