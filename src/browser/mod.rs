//! Browser-facing side of the login flow.
//!
//! Scenarios talk to a [`LoginPortal`]; the Chromium-backed implementation is
//! [`BrowserSession`], launched once per scenario by [`BrowserLauncher`].

mod page;
mod session;

pub use page::{LoginPage, Selectors};
pub use session::{BrowserLauncher, BrowserSession};

use crate::error::Result;
use async_trait::async_trait;

/// The login page as scenarios see it.
#[async_trait]
pub trait LoginPortal: Send {
    /// Navigates to the given URL.
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Fills in the credentials and submits the form.
    async fn login(&mut self, username: &str, password: &str) -> Result<()>;

    /// Returns true once the post-login inventory is shown.
    async fn is_logged_in(&mut self) -> Result<bool>;

    /// Returns the login error banner text, if one is shown.
    async fn error_message(&mut self) -> Result<Option<String>>;

    /// Captures a full-page PNG screenshot.
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// Releases the page and its browser.
    async fn close(&mut self) -> Result<()>;
}

/// Opens a fresh portal for one scenario.
#[async_trait]
pub trait PortalLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn LoginPortal>>;
}
