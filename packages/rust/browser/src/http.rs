//! Browser driver backed by plain HTTP requests.
//!
//! Pages are fetched with `reqwest` and queried with `scraper`. While waiting
//! for an element the page is re-fetched at the configured poll interval, so
//! late server-side rendering is picked up.

use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use confnotes_shared::{BrowserOptions, ConfNotesError, Result};

use crate::element::{By, Element, Page};
use crate::{Browser, WaitOutcome};

/// HTTP-backed browsing context.
pub struct HttpBrowser {
    client: Client,
    options: BrowserOptions,
    page: Option<Page>,
}

impl HttpBrowser {
    /// Build a new browsing context. Each context owns its own HTTP client.
    pub fn launch(options: BrowserOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(options.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| ConfNotesError::Network(format!("failed to build HTTP client: {e}")))?;

        info!(timezone = %options.timezone, "browser context started");

        Ok(Self {
            client,
            options,
            page: None,
        })
    }

    async fn fetch(&self, url: &Url) -> Result<Page> {
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ConfNotesError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConfNotesError::Network(format!("{url}: HTTP {status}")));
        }

        // Links resolve against the final URL after redirects
        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| ConfNotesError::Network(format!("{url}: body read failed: {e}")))?;

        Ok(Page::new(final_url, body))
    }
}

impl Browser for HttpBrowser {
    #[instrument(skip(self), fields(url = %url))]
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        let page = self.fetch(url).await?;
        self.page = Some(page);
        Ok(())
    }

    async fn wait_for(&mut self, by: &By, timeout: Duration) -> Result<WaitOutcome> {
        let Some(current) = self.page.as_ref().map(|p| p.url.clone()) else {
            return Err(ConfNotesError::validation("wait_for called before navigate"));
        };

        let deadline = Instant::now() + timeout;
        loop {
            if self.page.as_ref().is_some_and(|p| p.contains(by)) {
                return Ok(WaitOutcome::Ready);
            }
            if Instant::now() + self.options.poll_interval > deadline {
                debug!(selector = by.describe(), "wait timed out");
                return Ok(WaitOutcome::TimedOut);
            }
            tokio::time::sleep(self.options.poll_interval).await;
            self.page = Some(self.fetch(&current).await?);
        }
    }

    fn find_one(&self, by: &By) -> Option<Element> {
        self.page.as_ref()?.find_one(by)
    }

    fn find_many(&self, by: &By) -> Vec<Element> {
        self.page
            .as_ref()
            .map(|p| p.find_many(by))
            .unwrap_or_default()
    }

    fn current_url(&self) -> Option<&Url> {
        self.page.as_ref().map(|p| &p.url)
    }
}
