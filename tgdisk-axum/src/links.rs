use axum::http::{header, HeaderMap};
use tgdisk_blob::TransferReference;

/// Path the download route is mounted at
pub const DOWNLOAD_PATH: &str = "/d";

/// Builds `…/d?ref=<token>` links for stored files
#[derive(Debug, Clone, Default)]
pub struct LinkBuilder {
    base: Option<String>,
}

impl LinkBuilder {
    pub fn with_base(base: impl Into<String>) -> Self {
        let base = base.into().trim().trim_end_matches('/').to_string();
        Self {
            base: (!base.is_empty()).then_some(base),
        }
    }

    /// Configured public base URL, if any
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Link for `reference`, rooted at the configured base or at the request origin
    pub fn download_url(&self, headers: &HeaderMap, reference: &TransferReference) -> String {
        match &self.base {
            Some(base) => download_link(base, reference),
            None => download_link(&request_origin(headers), reference),
        }
    }
}

/// Link for `reference` under `base`
pub fn download_link(base: &str, reference: &TransferReference) -> String {
    format!(
        "{}{}?ref={}",
        base.trim_end_matches('/'),
        DOWNLOAD_PATH,
        reference.to_token()
    )
}

/// `scheme://host` the client used, honouring `X-Forwarded-Proto`
fn request_origin(headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{}://{}", scheme, host)
}
