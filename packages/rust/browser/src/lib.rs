//! Page-query capability used by the extractors.
//!
//! This crate provides:
//! - [`Browser`]: navigate / wait / find over one loaded page
//! - [`Element`]: an owned snapshot of a page element with scoped queries
//! - [`HttpBrowser`]: driver that loads pages over HTTP
//! - [`LocalBrowser`]: driver that serves saved HTML (offline runs and tests)
//! - [`RetryPolicy`]: the bounded polling helper for slow-to-render blocks

pub mod element;
pub mod http;
pub mod local;
pub mod retry;

use std::time::Duration;

use url::Url;

use confnotes_shared::Result;

pub use element::{By, Element, Page};
pub use http::HttpBrowser;
pub use local::LocalBrowser;
pub use retry::RetryPolicy;

/// Result of waiting for an element to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The element is present on the current page.
    Ready,
    /// The wait limit elapsed first.
    TimedOut,
}

impl WaitOutcome {
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }
}

/// A single browsing context: one current page at a time.
///
/// Drivers are owned handles. A session import holds two of them so the
/// session page stays loaded while its presentations are visited.
#[allow(async_fn_in_trait)]
pub trait Browser {
    /// Load `url` as the current page.
    async fn navigate(&mut self, url: &Url) -> Result<()>;

    /// Wait until `by` matches something on the current page, or `timeout` elapses.
    async fn wait_for(&mut self, by: &By, timeout: Duration) -> Result<WaitOutcome>;

    /// First match on the current page.
    fn find_one(&self, by: &By) -> Option<Element>;

    /// All matches on the current page, in document order.
    fn find_many(&self, by: &By) -> Vec<Element>;

    /// URL of the current page, if one is loaded.
    fn current_url(&self) -> Option<&Url>;
}
