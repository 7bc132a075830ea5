//! Fixed HTML pages

use crate::config::HttpConfig;
use crate::{Response, StatusCode};
use std::io;
use std::path::{Path, PathBuf};

/// The three pages the router knows by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// Served for `/`
    Index,
    /// Served for `/message`, the target of every form redirect
    Message,
    /// Served with 404 for anything that is not a file
    Error,
}

/// Page files under the static root
#[derive(Debug, Clone)]
pub struct Pages {
    index: PathBuf,
    message: PathBuf,
    error: PathBuf,
}

impl Pages {
    pub fn new(index: impl Into<PathBuf>, message: impl Into<PathBuf>, error: impl Into<PathBuf>) -> Self {
        Self {
            index: index.into(),
            message: message.into(),
            error: error.into(),
        }
    }

    pub fn from_config(config: &HttpConfig) -> Self {
        let root = &config.static_dir;
        Self::new(
            root.join(&config.index_page),
            root.join(&config.message_page),
            root.join(&config.error_page),
        )
    }

    pub fn path(&self, page: Page) -> &Path {
        match page {
            Page::Index => &self.index,
            Page::Message => &self.message,
            Page::Error => &self.error,
        }
    }

    /// Read a page from disk into an HTML response.
    pub async fn render(&self, page: Page, status: StatusCode) -> io::Result<Response> {
        let body = tokio::fs::read(self.path(page)).await?;
        Ok(Response::html(status, body))
    }
}
