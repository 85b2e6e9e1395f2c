//! Feature runner built on cucumber, with browser hooks and a JSON writer.

use super::LoginWorld;
use crate::browser::PortalLauncher;
use crate::config::HarnessConfig;
use crate::db::QueryDispatcher;
use crate::error::{HarnessError, Result};
use crate::report::{self, Screenshot};
use cucumber::writer::Stats as _;
use cucumber::{cli, event, writer, World as _, WriterExt as _};
use futures::FutureExt as _;
use std::fs::File;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info};

/// Settings the runner needs from the harness configuration.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub base_url: String,
    pub step_timeout: Duration,
    pub screenshot_dir: PathBuf,
}

impl RunnerOptions {
    pub fn from_config(config: &HarnessConfig, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: config.base_url.clone(),
            step_timeout: config.step_timeout,
            screenshot_dir: screenshot_dir.into(),
        }
    }
}

/// Shared by every scenario of a run; handed to each world by the before hook.
pub struct RunContext {
    pub launcher: Arc<dyn PortalLauncher>,
    pub dispatcher: Arc<QueryDispatcher>,
    pub options: RunnerOptions,
    screenshots: Mutex<Vec<Screenshot>>,
}

impl RunContext {
    pub fn new(
        launcher: Arc<dyn PortalLauncher>,
        dispatcher: Arc<QueryDispatcher>,
        options: RunnerOptions,
    ) -> Self {
        Self {
            launcher,
            dispatcher,
            options,
            screenshots: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn record(&self, screenshot: Screenshot) {
        if let Ok(mut screenshots) = self.screenshots.lock() {
            screenshots.push(screenshot);
        }
    }

    fn take_screenshots(&self) -> Vec<Screenshot> {
        self.screenshots
            .lock()
            .map(|mut screenshots| std::mem::take(&mut *screenshots))
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Runs feature files one scenario at a time.
pub struct ScenarioRunner {
    context: Arc<RunContext>,
}

impl ScenarioRunner {
    pub fn new(
        launcher: Arc<dyn PortalLauncher>,
        dispatcher: Arc<QueryDispatcher>,
        options: RunnerOptions,
    ) -> Self {
        Self {
            context: Arc::new(RunContext::new(launcher, dispatcher, options)),
        }
    }

    /// Runs every feature file, writing one results file per feature into
    /// `report_dir`. Returns true when all of them passed.
    ///
    /// A feature that cannot be run is logged and fails the run; the
    /// features after it still run.
    pub async fn run_all(&self, features: &[PathBuf], report_dir: &Path) -> bool {
        let mut passed = true;
        let mut taken = HashSet::new();

        for feature in features {
            let results = report_dir.join(report::results_file_name(feature, &mut taken));
            match self.run_file(feature, &results).await {
                Ok(feature_passed) => passed &= feature_passed,
                Err(e) => {
                    error!(feature = %feature.display(), "{}: {}", e.category(), e);
                    passed = false;
                }
            }
        }

        passed
    }

    /// Runs one `.feature` file and writes its cucumber JSON to `results`.
    ///
    /// Returns true when every scenario passed. Undefined steps, unparsable
    /// features and hook failures all count as failures. Process arguments
    /// belong to the harness CLI and are not read here.
    pub async fn run_file(&self, feature: &Path, results: &Path) -> Result<bool> {
        if !feature.exists() {
            return Err(HarnessError::config(format!(
                "Cannot read {}: no such feature file",
                feature.display()
            )));
        }
        if let Some(dir) = results.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                HarnessError::report(format!("Cannot create {}: {e}", dir.display()))
            })?;
        }
        let output = File::create(results).map_err(|e| {
            HarnessError::report(format!("Cannot create {}: {e}", results.display()))
        })?;

        info!(feature = %feature.display(), "Running feature");
        let before = Arc::clone(&self.context);

        let summary = LoginWorld::cucumber()
            .max_concurrent_scenarios(1)
            .before(move |_feature, _rule, _scenario, world| {
                let context = Arc::clone(&before);
                async move { world.start(context).await }.boxed_local()
            })
            .after(|_feature, _rule, scenario, finished, world| {
                let failed = matches!(
                    finished,
                    event::ScenarioFinished::StepFailed(..)
                        | event::ScenarioFinished::BeforeHookFailed(..)
                );
                let name = scenario.name.clone();
                let line = scenario.position.line;
                async move {
                    if let Some(world) = world {
                        world.finish(&name, line, failed).await;
                    }
                }
                .boxed_local()
            })
            .with_writer(
                writer::Basic::raw(io::stdout(), writer::Coloring::Auto, 0)
                    .summarized()
                    .tee::<LoginWorld, _>(writer::Json::for_tee(output))
                    .normalized(),
            )
            .fail_on_skipped()
            .with_cli(cli::Opts::<_, _, _, cli::Empty>::default())
            .run(feature)
            .await;

        report::attach_screenshots(results, &self.context.take_screenshots())?;

        let passed = !summary.execution_has_failed();
        info!(feature = %feature.display(), passed, "Feature finished");
        Ok(passed)
    }
}
