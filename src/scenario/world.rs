//! Per-scenario state shared between steps.

use super::runner::RunContext;
use crate::browser::LoginPortal;
use crate::error::{HarnessError, Result};
use crate::report::Screenshot;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// State owned by one running scenario.
///
/// A fresh world is built for every scenario; nothing carries over. The
/// before hook hands it the run's shared context and a launched portal.
#[derive(Default, cucumber::World)]
pub struct LoginWorld {
    context: Option<Arc<RunContext>>,
    portal: Option<Box<dyn LoginPortal>>,
    launch_error: Option<String>,
    page_opened: bool,
}

impl LoginWorld {
    /// Before hook: binds the run context and launches the portal.
    ///
    /// A launch failure is kept and reported by the first browser step.
    pub async fn start(&mut self, context: Arc<RunContext>) {
        info!("Before scenario - launching browser");
        match context.launcher.launch().await {
            Ok(portal) => self.portal = Some(portal),
            Err(e) => {
                error!(error = %e, "Browser launch failed");
                self.launch_error = Some(e.to_string());
            }
        }
        self.context = Some(context);
    }

    /// After hook: captures a screenshot of a failed scenario, then closes
    /// the portal. Neither failure is propagated.
    pub async fn finish(&mut self, scenario: &str, line: usize, failed: bool) {
        let status = if failed { "failed" } else { "passed" };
        info!(scenario = %scenario, status, "After scenario");

        if failed {
            if let Err(e) = self.capture_failure(scenario, line).await {
                warn!(error = %e, "Failed to capture screenshot");
            }
        }

        self.page_opened = false;
        if let Some(mut portal) = self.portal.take() {
            if let Err(e) = portal.close().await {
                warn!(error = %e, "Failed to close browser");
            }
        }
    }

    /// The run context bound by the before hook.
    pub fn context(&self) -> Result<Arc<RunContext>> {
        self.context
            .clone()
            .ok_or_else(|| HarnessError::internal("scenario started without a run context"))
    }

    /// The launched portal, whether or not the login page was opened yet.
    pub fn portal(&mut self) -> Result<&mut Box<dyn LoginPortal>> {
        let launch_error = self.launch_error.as_deref();
        match self.portal.as_mut() {
            Some(portal) => Ok(portal),
            None => Err(match launch_error {
                Some(message) => HarnessError::browser(format!("page not available: {message}")),
                None => HarnessError::browser("page not available"),
            }),
        }
    }

    pub fn mark_page_opened(&mut self) {
        self.page_opened = true;
    }

    /// The portal, once "I open the login page" has run.
    pub fn login_page(&mut self) -> Result<&mut Box<dyn LoginPortal>> {
        if !self.page_opened {
            return Err(HarnessError::internal("LoginPage not set"));
        }
        self.portal()
    }

    async fn capture_failure(&mut self, scenario: &str, line: usize) -> Result<()> {
        let context = self.context()?;
        let Some(portal) = self.portal.as_mut() else {
            return Ok(());
        };
        let png = portal.screenshot().await?;

        let dir = &context.options.screenshot_dir;
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            HarnessError::internal(format!("Cannot create {}: {e}", dir.display()))
        })?;
        let path = dir.join(format!(
            "fail-{}.png",
            chrono::Utc::now().timestamp_millis()
        ));
        tokio::fs::write(&path, &png).await.map_err(|e| {
            HarnessError::internal(format!("Cannot write {}: {e}", path.display()))
        })?;

        error!(
            scenario = %scenario,
            screenshot = %path.display(),
            "Scenario failed - screenshot captured"
        );
        context.record(Screenshot {
            line,
            path,
            data: BASE64_STANDARD.encode(&png),
        });
        Ok(())
    }
}

impl std::fmt::Debug for LoginWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginWorld")
            .field("has_portal", &self.portal.is_some())
            .field("launch_error", &self.launch_error)
            .field("page_opened", &self.page_opened)
            .finish()
    }
}

/// Runs one step body, failing it once `limit` has passed.
pub(crate) async fn within<T>(limit: Duration, step: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, step)
        .await
        .map_err(|_| HarnessError::internal(format!("Step timed out after {limit:?}")))?
}
