//! Manifest artifact: the original filename followed by one piece handle per line.
//!
//! ```text
//! holiday.mkv
//! BQACAgUAAxkDAAIBf2...
//! BQACAgUAAxkDAAIBgG...
//! ```

use bytes::Bytes;

use crate::{Handle, TransferError, TransferResult};

/// Name the manifest blob is stored under
pub const MANIFEST_NAME: &str = "fileAll.txt";

/// Ordered piece handles plus the original filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    filename: String,
    handles: Vec<Handle>,
}

impl Manifest {
    /// Build a manifest. Fails if it could not be decoded back unchanged.
    pub fn new<S: Into<String>>(filename: S, handles: Vec<Handle>) -> TransferResult<Self> {
        let filename = filename.into();
        check_filename(&filename)?;
        if handles.is_empty() {
            return Err(TransferError::input("a manifest needs at least one piece handle"));
        }
        for handle in &handles {
            let raw = handle.as_str();
            if raw.is_empty() || raw.chars().any(char::is_whitespace) {
                return Err(TransferError::input(format!(
                    "piece handle '{}' cannot be written to a manifest",
                    raw.escape_debug()
                )));
            }
        }
        Ok(Self { filename, handles })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn into_parts(self) -> (String, Vec<Handle>) {
        (self.filename, self.handles)
    }

    /// Serialize: filename line, then one handle per line, each newline-terminated.
    pub fn encode(&self) -> Bytes {
        let capacity = self.filename.len()
            + 1
            + self.handles.iter().map(|h| h.as_str().len() + 1).sum::<usize>();
        let mut out = String::with_capacity(capacity);
        out.push_str(&self.filename);
        out.push('\n');
        for handle in &self.handles {
            out.push_str(handle.as_str());
            out.push('\n');
        }
        Bytes::from(out)
    }

    /// Parse a manifest, tolerating blank lines and CRLF line endings.
    pub fn decode(raw: &[u8]) -> TransferResult<Self> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| TransferError::format(format!("manifest is not UTF-8: {}", e)))?;

        let mut lines = text
            .trim()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());

        let filename = lines
            .next()
            .ok_or_else(|| TransferError::format("manifest is empty"))?
            .to_string();
        let handles: Vec<Handle> = lines.map(|line| Handle(line.to_string())).collect();
        if handles.is_empty() {
            return Err(TransferError::format(
                "manifest needs a filename and at least one piece handle",
            ));
        }

        Ok(Self { filename, handles })
    }
}

/// Filenames go on a line of their own and are trimmed on decode.
pub(crate) fn check_filename(filename: &str) -> TransferResult<()> {
    if filename.trim().is_empty() {
        return Err(TransferError::input("filename is empty"));
    }
    if filename.trim() != filename {
        return Err(TransferError::input("filename has leading or trailing whitespace"));
    }
    if filename.contains(|c| c == '\n' || c == '\r') {
        return Err(TransferError::input("filename contains a line break"));
    }
    Ok(())
}
