use axum::routing::{get, post};
use axum::Router;

use crate::links::DOWNLOAD_PATH;
use crate::TgDiskState;

pub mod download;
pub mod upload;
pub mod verify;

pub use upload::UploadResponse;

async fn health() -> &'static str {
    "ok"
}

/// Upload, download, verify and health routes over `state`
pub fn router(state: TgDiskState) -> Router<()> {
    Router::new()
        .route("/upload", post(upload::upload))
        .route(DOWNLOAD_PATH, get(download::download))
        .route("/verify", post(verify::verify))
        .route("/health", get(health))
        .with_state(state)
}
