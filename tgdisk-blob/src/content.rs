//! Response metadata for downloaded files: content type and disposition.

/// Fallback for unknown extensions and for reassembled files
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guess a content type from the filename extension
pub fn content_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

/// Types a browser can render in place
pub fn is_previewable(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("image/")
        || essence.starts_with("video/")
        || essence.starts_with("audio/")
        || essence == "application/pdf"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    pub fn for_content_type(content_type: &str) -> Self {
        if is_previewable(content_type) {
            Disposition::Inline
        } else {
            Disposition::Attachment
        }
    }

    /// `Content-Disposition` value with a quoted ASCII fallback and an RFC 5987
    /// `filename*` parameter when the name is not plain ASCII.
    pub fn header_value(&self, filename: &str) -> String {
        let kind = match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        };

        let fallback: String = filename
            .chars()
            .map(|c| match c {
                '"' | '\\' => '_',
                c if c.is_ascii() && !c.is_ascii_control() => c,
                _ => '_',
            })
            .collect();

        if fallback == filename {
            format!("{}; filename=\"{}\"", kind, fallback)
        } else {
            format!(
                "{}; filename=\"{}\"; filename*=UTF-8''{}",
                kind,
                fallback,
                urlencoding::encode(filename)
            )
        }
    }
}
