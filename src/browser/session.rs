//! Chromium lifecycle for one scenario.

use super::{LoginPage, LoginPortal, PortalLauncher};
use crate::error::{HarnessError, Result};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Launches a Chromium session per scenario.
#[derive(Debug, Clone)]
pub struct BrowserLauncher {
    headless: bool,
}

impl BrowserLauncher {
    pub fn new(headless: bool) -> Self {
        Self { headless }
    }
}

#[async_trait]
impl PortalLauncher for BrowserLauncher {
    async fn launch(&self) -> Result<Box<dyn LoginPortal>> {
        Ok(Box::new(BrowserSession::launch(self.headless).await?))
    }
}

/// A running browser with one open login page.
///
/// The CDP handler runs on its own task until the browser goes away.
pub struct BrowserSession {
    browser: Browser,
    handler: Option<JoinHandle<()>>,
    page: LoginPage,
}

impl BrowserSession {
    /// Starts Chromium and opens a blank page.
    pub async fn launch(headless: bool) -> Result<Self> {
        let mut builder = BrowserConfig::builder();
        if !headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| HarnessError::browser(format!("Invalid browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| HarnessError::browser(format!("Failed to launch browser: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| HarnessError::browser(format!("Failed to open page: {e}")))?;

        debug!(headless, "Browser launched");
        Ok(Self {
            browser,
            handler: Some(handler),
            page: LoginPage::new(page),
        })
    }

    pub fn page(&self) -> &LoginPage {
        &self.page
    }
}

#[async_trait]
impl LoginPortal for BrowserSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.page.goto(url).await
    }

    async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.page.login(username, password).await
    }

    async fn is_logged_in(&mut self) -> Result<bool> {
        Ok(self.page.is_logged_in().await)
    }

    async fn error_message(&mut self) -> Result<Option<String>> {
        self.page.error_message().await
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        self.page.screenshot().await
    }

    /// Closes the page, then the browser. Both are attempted; the first
    /// failure is returned.
    async fn close(&mut self) -> Result<()> {
        let Some(handler) = self.handler.take() else {
            return Ok(());
        };

        let page_closed = self
            .page
            .page()
            .clone()
            .close()
            .await
            .map_err(|e| HarnessError::browser(format!("Failed to close page: {e}")));

        let browser_closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| HarnessError::browser(format!("Failed to close browser: {e}")));

        if browser_closed.is_ok() {
            if let Err(e) = self.browser.wait().await {
                warn!(error = %e, "Browser process did not exit cleanly");
            }
        } else {
            // The handler only stops on its own once the connection drops.
            handler.abort();
        }
        if let Err(e) = handler.await {
            if !e.is_cancelled() {
                warn!(error = %e, "Browser handler task failed");
            }
        }

        page_closed.and(browser_closed)
    }
}
