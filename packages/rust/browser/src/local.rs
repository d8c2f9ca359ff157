//! Browser driver over saved HTML.
//!
//! Pages come either from an in-memory map (tests) or from a directory of
//! saved pages laid out as `<dir>/<host>/<path>/index.html` or
//! `<dir>/<host>/<path>.html`. Saved pages are complete, so waits answer
//! immediately.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;
use url::Url;

use confnotes_shared::{ConfNotesError, Result};

use crate::element::{By, Element, Page};
use crate::{Browser, WaitOutcome};

/// Offline browsing context.
#[derive(Debug, Default, Clone)]
pub struct LocalBrowser {
    pages: HashMap<String, String>,
    root: Option<PathBuf>,
    current: Option<Page>,
    visited: Vec<Url>,
}

impl LocalBrowser {
    /// An empty context; add pages with [`LocalBrowser::with_page`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve pages saved under `root`.
    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    /// Register the HTML served for `url`.
    pub fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.insert_page(url, html);
        self
    }

    pub fn insert_page(&mut self, url: &str, html: impl Into<String>) {
        let key = Url::parse(url)
            .map(|u| page_key(&u))
            .unwrap_or_else(|_| url.to_string());
        self.pages.insert(key, html.into());
    }

    /// Every URL navigated to, in order.
    pub fn visited(&self) -> &[Url] {
        &self.visited
    }

    fn load(&self, url: &Url) -> Result<String> {
        if let Some(html) = self.pages.get(&page_key(url)) {
            return Ok(html.clone());
        }

        let Some(root) = &self.root else {
            return Err(ConfNotesError::Network(format!("{url}: no saved page")));
        };

        for candidate in url_to_local_paths(root, url) {
            if candidate.is_file() {
                debug!(path = %candidate.display(), "reading saved page");
                return std::fs::read_to_string(&candidate)
                    .map_err(|e| ConfNotesError::io(&candidate, e));
            }
        }

        Err(ConfNotesError::Network(format!(
            "{url}: no saved page under {}",
            root.display()
        )))
    }
}

impl Browser for LocalBrowser {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        let html = self.load(url)?;
        self.visited.push(url.clone());
        self.current = Some(Page::new(url.clone(), html));
        Ok(())
    }

    async fn wait_for(&mut self, by: &By, _timeout: Duration) -> Result<WaitOutcome> {
        let Some(page) = &self.current else {
            return Err(ConfNotesError::validation("wait_for called before navigate"));
        };
        Ok(if page.contains(by) {
            WaitOutcome::Ready
        } else {
            WaitOutcome::TimedOut
        })
    }

    fn find_one(&self, by: &By) -> Option<Element> {
        self.current.as_ref()?.find_one(by)
    }

    fn find_many(&self, by: &By) -> Vec<Element> {
        self.current
            .as_ref()
            .map(|p| p.find_many(by))
            .unwrap_or_default()
    }

    fn current_url(&self) -> Option<&Url> {
        self.current.as_ref().map(|p| &p.url)
    }
}

/// Lookup key for a URL: fragment and trailing slash dropped.
fn page_key(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized.as_str().trim_end_matches('/').to_string()
}

/// Candidate file locations for a saved copy of `url`.
fn url_to_local_paths(root: &Path, url: &Url) -> Vec<PathBuf> {
    let host = url.host_str().unwrap_or("localhost");
    let base = if root.ends_with(host) {
        root.to_path_buf()
    } else {
        root.join(host)
    };

    let path = url.path().trim_matches('/');
    if path.is_empty() {
        return vec![base.join("index.html")];
    }

    let full = base.join(path);
    vec![
        full.join("index.html"),
        full.with_extension("html"),
        full,
    ]
}
