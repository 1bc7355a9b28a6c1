use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tgdisk_blob::TransferError;
use tracing::{error, warn};

/// Error classes the HTTP boundary reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,       // 400
    NotAuthenticated, // 401
    GeneralError,     // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotAuthenticated => 401,
            ErrorKind::GeneralError => 500,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotAuthenticated => "NotAuthenticated",
            ErrorKind::GeneralError => "GeneralError",
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::NotAuthenticated => "not-authenticated",
            ErrorKind::GeneralError => "general-error",
        }
    }
}

/// A request failure, rendered as `{name, message, code, className}`
#[derive(Debug)]
pub struct TgDiskError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TgDiskError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "name": self.kind.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.kind.class_name(),
        })
    }
}

impl fmt::Display for TgDiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind.name(), self.code(), self.message)
    }
}

impl std::error::Error for TgDiskError {}

impl From<TransferError> for TgDiskError {
    fn from(e: TransferError) -> Self {
        if e.is_client_error() {
            Self::bad_request(e.to_string())
        } else {
            Self::general_error(e.to_string())
        }
    }
}

impl From<multer::Error> for TgDiskError {
    fn from(e: multer::Error) -> Self {
        Self::bad_request(format!("Failed to parse multipart data: {}", e))
    }
}

impl IntoResponse for TgDiskError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, "request rejected");
        }
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tgdisk_blob::{BlobError, Handle, StoreTarget};

    #[test]
    fn transfer_errors_map_to_http_kinds() {
        let cases = [
            (TransferError::input("no file"), ErrorKind::BadRequest),
            (TransferError::format("short"), ErrorKind::BadRequest),
            (
                TransferError::store_failure(StoreTarget::Piece(1), BlobError::rejected("x")),
                ErrorKind::GeneralError,
            ),
            (
                TransferError::fetch_failure(Handle::from("h"), BlobError::not_found("h")),
                ErrorKind::GeneralError,
            ),
            (TransferError::worker("panic"), ErrorKind::GeneralError),
            (TransferError::config("zero"), ErrorKind::GeneralError),
        ];
        for (err, kind) in cases {
            assert_eq!(TgDiskError::from(err).kind, kind);
        }
    }

    #[test]
    fn json_shape() {
        let body = TgDiskError::not_authenticated("wrong password").to_json();
        assert_eq!(body["name"], "NotAuthenticated");
        assert_eq!(body["code"], 401);
        assert_eq!(body["className"], "not-authenticated");
        assert_eq!(body["message"], "wrong password");
    }
}
