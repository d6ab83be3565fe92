use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Bytes inspected when sniffing a document's media type.
pub const SNIFF_LEN: usize = 1024;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Media type detected from leading content bytes, ignoring the file name.
pub fn detect_media_type(head: &[u8]) -> &'static str {
    if head.starts_with(b"%PDF-") {
        return PDF_MEDIA_TYPE;
    }

    let text_start = head
        .iter()
        .position(|byte| !byte.is_ascii_whitespace())
        .map(|start| &head[start..])
        .unwrap_or(&[]);
    let prefix = text_start
        .iter()
        .take(15)
        .map(|byte| byte.to_ascii_lowercase())
        .collect::<Vec<u8>>();
    if prefix.starts_with(b"<!doctype html") || prefix.starts_with(b"<html") {
        return "text/html";
    }

    if head.is_empty() {
        "application/x-empty"
    } else if std::str::from_utf8(head).is_ok() {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}

/// Gatekeeper in front of text extraction. Rejected paths are kept for the
/// run report; classification itself never fails.
#[derive(Debug, Default)]
pub struct DocumentClassifier {
    rejected: Vec<PathBuf>,
}

impl DocumentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&mut self, path: &Path, head: &[u8]) -> bool {
        let media_type = detect_media_type(head);
        if media_type == PDF_MEDIA_TYPE {
            return true;
        }

        warn!(path = %path.display(), media_type, "rejected non-PDF document");
        self.rejected.push(path.to_path_buf());
        false
    }

    /// Reads the head of `path` and classifies it; unreadable files are rejected.
    pub fn classify_file(&mut self, path: &Path) -> bool {
        match read_head(path) {
            Ok(head) => self.classify(path, &head),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable document rejected");
                self.rejected.push(path.to_path_buf());
                false
            }
        }
    }

    pub fn into_rejected(self) -> Vec<PathBuf> {
        self.rejected
    }
}

pub fn read_head(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    Ok(head)
}
