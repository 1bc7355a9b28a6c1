use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use futures::TryStreamExt;
use tracing::error;

use crate::params::{map_query_rejection, DownloadQuery};
use crate::{TgDiskError, TgDiskState};

pub async fn download(
    State(state): State<TgDiskState>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response, TgDiskError> {
    let Query(query) = query.map_err(map_query_rejection)?;
    let reference = query.into_reference()?;
    let opened = state.transfers.download(&reference).await?;

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, opened.content_type.as_str())
        .header(header::CONTENT_DISPOSITION, opened.content_disposition())
        .header(header::ACCEPT_RANGES, "bytes");
    if let Some(length) = opened.content_length {
        response = response.header(header::CONTENT_LENGTH, length);
    }

    // headers are gone by now; a failure can only cut the body short
    let filename = opened.filename;
    let body = opened.body.inspect_err(move |e| {
        error!(filename = %filename, error = %e, "download aborted mid-stream");
    });

    response
        .body(Body::from_stream(body))
        .map_err(|e| TgDiskError::general_error(format!("Failed to build response: {}", e)))
}
