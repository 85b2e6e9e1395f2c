//! Page object for the login form.

use crate::error::{HarnessError, Result};
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// How long to wait for an element to appear.
const ELEMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between element lookups while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// CSS selectors of the login page.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub username: &'static str,
    pub password: &'static str,
    pub submit: &'static str,
    pub inventory: &'static str,
    pub error: &'static str,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            username: r#"input[name="user-name"]"#,
            password: r#"input[name="password"]"#,
            submit: r#"input[type="submit"]"#,
            inventory: ".inventory_list",
            error: r#"[data-test="error"]"#,
        }
    }
}

/// The login page of the application under test.
#[derive(Debug, Clone)]
pub struct LoginPage {
    page: Page,
    selectors: Selectors,
}

impl LoginPage {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            selectors: Selectors::default(),
        }
    }

    /// The underlying browser page.
    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| HarnessError::browser(format!("Failed to open {url}: {e}")))?;
        Ok(())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        self.fill(self.selectors.username, username).await?;
        self.fill(self.selectors.password, password).await?;
        self.require(self.selectors.submit)
            .await?
            .click()
            .await
            .map_err(|e| HarnessError::browser(format!("Failed to submit login form: {e}")))?;
        Ok(())
    }

    pub async fn is_logged_in(&self) -> bool {
        self.wait_for(self.selectors.inventory).await.is_some()
    }

    pub async fn error_message(&self) -> Result<Option<String>> {
        let Some(banner) = self.wait_for(self.selectors.error).await else {
            return Ok(None);
        };
        banner
            .inner_text()
            .await
            .map_err(|e| HarnessError::browser(format!("Failed to read error banner: {e}")))
    }

    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| HarnessError::browser(format!("Failed to capture screenshot: {e}")))
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        let input = self.require(selector).await?;
        input
            .click()
            .await
            .map_err(|e| HarnessError::browser(format!("Failed to focus {selector}: {e}")))?
            .type_str(text)
            .await
            .map_err(|e| HarnessError::browser(format!("Failed to type into {selector}: {e}")))?;
        Ok(())
    }

    async fn require(&self, selector: &str) -> Result<Element> {
        self.wait_for(selector)
            .await
            .ok_or_else(|| HarnessError::browser(format!("Element not found: {selector}")))
    }

    /// Polls for an element until it appears or the timeout passes.
    async fn wait_for(&self, selector: &str) -> Option<Element> {
        let deadline = Instant::now() + ELEMENT_TIMEOUT;
        loop {
            if let Ok(element) = self.page.find_element(selector).await {
                return Some(element);
            }
            if Instant::now() >= deadline {
                return None;
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}
