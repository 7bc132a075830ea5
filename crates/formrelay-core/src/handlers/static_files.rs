//! Static file serving handler
//!
//! Maps a request path onto a regular file under the static root and guesses
//! its content type from the extension.

use crate::{Response, ResponseBuilder, StatusCode};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Content type used when the extension is unknown
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Static file handler
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find the regular file a request path points at, if any.
    pub async fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let relative = self.sanitize_path(request_path)?;
        if relative.as_os_str().is_empty() {
            return None;
        }

        let full_path = self.root.join(relative);
        match tokio::fs::metadata(&full_path).await {
            Ok(meta) if meta.is_file() => Some(full_path),
            _ => None,
        }
    }

    /// Read a resolved file into a 200 response.
    ///
    /// # Errors
    ///
    /// Fails if the file went away or became unreadable after [`resolve`].
    ///
    /// [`resolve`]: StaticFiles::resolve
    pub async fn serve(&self, file: &Path) -> io::Result<Response> {
        let content = tokio::fs::read(file).await?;
        Ok(ResponseBuilder::new(StatusCode::OK)
            .header("content-type", mime_type(file))
            .body(content)
            .build())
    }

    /// Sanitize request path to prevent directory traversal. Dot segments
    /// (hidden files, `..`) never resolve.
    fn sanitize_path(&self, path: &str) -> Option<PathBuf> {
        let path = path.trim_start_matches('/');

        if path.split('/').any(|s| s.starts_with('.') && s != ".") {
            return None;
        }

        let mut result = PathBuf::new();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(c) => result.push(c),
                Component::ParentDir => return None,
                _ => {}
            }
        }

        Some(result)
    }
}

/// Guess a content type from the file extension
pub fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match ext.to_lowercase().as_str() {
        // Text
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",

        "pdf" => "application/pdf",

        _ => FALLBACK_MIME_TYPE,
    }
}
