use axum::extract::Request;
use axum::http::header;
use futures::TryStreamExt;
use multer::{Field, Multipart};
use tgdisk_blob::ByteStream;
use tracing::debug;

use crate::TgDiskError;

/// A multipart body read field by field straight off the connection.
///
/// Nothing is buffered beyond what multer needs to find boundaries, so a file
/// field can be handed to the upload pipeline as a stream.
pub struct StreamingForm {
    inner: Multipart<'static>,
}

impl StreamingForm {
    pub fn from_request(request: Request) -> Result<Self, TgDiskError> {
        let content_type = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let boundary = multer::parse_boundary(content_type).map_err(|e| {
            TgDiskError::bad_request(format!("Expected multipart/form-data: {}", e))
        })?;

        let body = request.into_body().into_data_stream();
        Ok(Self {
            inner: Multipart::new(body, boundary),
        })
    }

    pub async fn next_field(&mut self) -> Result<Option<Field<'static>>, TgDiskError> {
        let field = self.inner.next_field().await?;
        if let Some(field) = &field {
            debug!(
                name = field.name().unwrap_or("unknown"),
                filename = field.file_name().unwrap_or(""),
                "multipart field"
            );
        }
        Ok(field)
    }
}

/// Text value of a small form field
pub async fn field_text(field: Field<'static>) -> Result<String, TgDiskError> {
    Ok(field.text().await?)
}

/// Turn a file field into the engine's byte stream
pub fn field_stream(field: Field<'static>) -> ByteStream {
    Box::pin(field.map_err(std::io::Error::other))
}
