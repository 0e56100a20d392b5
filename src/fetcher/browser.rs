//! Headless Chromium fetcher for booking pages that render their tee sheet
//! client side.
//!
//! One [`BrowserFetcher`] owns one browser process. Each fetch opens a fresh
//! page and closes it again through [`PageGuard`], including when the fetch
//! future is dropped mid-navigation.

use crate::fetcher::{
    Fetch,
    client::{USER_AGENT, check_scheme},
    errors::{FetchError, ensure_success},
    types::RawPage,
};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

const WINDOW_WIDTH: u32 = 1920;
const WINDOW_HEIGHT: u32 = 1080;
/// Grace period after navigation for late XHR-driven rendering.
const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Main-document status of the current navigation, or null when the browser
/// does not report one (cached or non-network loads report 0).
const NAVIGATION_STATUS_JS: &str = r#"
    (() => {
        const nav = performance.getEntriesByType('navigation')[0];
        return nav && nav.responseStatus ? nav.responseStatus : null;
    })()
"#;

pub struct BrowserFetcher {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserFetcher {
    pub async fn launch(headless: bool) -> Result<Self, FetchError> {
        let mut builder = BrowserConfig::builder()
            .window_size(WINDOW_WIDTH, WINDOW_HEIGHT)
            .args(vec![
                format!("--user-agent={}", USER_AGENT),
                "--disable-extensions".to_string(),
                "--disable-popup-blocking".to_string(),
                "--disable-sync".to_string(),
                "--no-first-run".to_string(),
                "--disable-features=Translate".to_string(),
            ]);
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(FetchError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "chromium handler event error");
                }
            }
            debug!("chromium event loop exited");
        });

        info!(headless, "launched browser");
        Ok(Self { browser, handler })
    }

    /// Close the browser and wait for its event loop to finish.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "failed to close browser");
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "failed waiting for browser exit");
        }
        self.handler.abort();
    }

    async fn render(&self, url: &Url) -> Result<RawPage, FetchError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;
        let guard = PageGuard::new(page);
        let page = guard.page();

        page.goto(url.as_str())
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?
            .wait_for_navigation()
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        let status = navigation_status(document_status(page).await)?;

        tokio::time::sleep(SETTLE_DELAY).await;

        let markup = page
            .content()
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;
        let url_final = match page.url().await {
            Ok(Some(current)) => Url::parse(&current).unwrap_or_else(|_| url.clone()),
            _ => url.clone(),
        };

        guard.close().await;
        Ok(RawPage::new(url_final, status, markup, "UTF-8"))
    }
}

async fn document_status(page: &Page) -> Option<u16> {
    match page.evaluate(NAVIGATION_STATUS_JS).await {
        Ok(result) => result.into_value::<Option<u16>>().ok().flatten(),
        Err(e) => {
            debug!(error = %e, "could not read navigation status");
            None
        }
    }
}

/// A missing or zero status passes; anything else must be 2xx.
fn navigation_status(code: Option<u16>) -> Result<Option<StatusCode>, FetchError> {
    let Some(status) = code.and_then(|c| StatusCode::from_u16(c).ok()) else {
        return Ok(None);
    };
    ensure_success(status)?;
    Ok(Some(status))
}

#[async_trait]
impl Fetch for BrowserFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<RawPage, FetchError> {
        check_scheme(url)?;

        tokio::time::timeout(timeout, self.render(url))
            .await
            .map_err(|_| FetchError::Timeout(timeout))?
    }
}

/// Closes its page when dropped. Covers early returns, timeouts and
/// cancellation of the surrounding future.
struct PageGuard {
    page: Page,
    armed: bool,
}

impl PageGuard {
    fn new(page: Page) -> Self {
        Self { page, armed: true }
    }

    fn page(&self) -> &Page {
        &self.page
    }

    async fn close(mut self) {
        self.armed = false;
        if let Err(e) = self.page.clone().close().await {
            debug!(error = %e, "failed to close page");
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let page = self.page.clone();
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                if let Err(e) = page.close().await {
                    debug!(error = %e, "failed to close page");
                }
            });
        }
    }
}
