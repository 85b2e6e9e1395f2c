//! Run results and the HTML report built from them.
//!
//! The runner's JSON writer produces one results file per feature file; the
//! report reads every results file in a directory and renders one page.

mod html;
pub mod model;

pub use model::{
    Embedding, FeatureResult, HookResult, Outcome, ScenarioResult, Status, StepResult, Tag,
};

use crate::error::{HarnessError, Result};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment details shown at the top of the report.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub browser: String,
    pub browser_version: String,
    pub device: String,
    pub platform: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            browser: "chromium".to_string(),
            browser_version: String::new(),
            device: "CI".to_string(),
            platform: std::env::consts::OS.to_string(),
        }
    }
}

/// Where to read results, where to write the report, and what to label it with.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub title: String,
    pub metadata: Metadata,
    /// Free-form `label: value` pairs under "Run info".
    pub custom_data: Vec<(String, String)>,
}

impl ReportOptions {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            title: "Login E2E report".to_string(),
            metadata: Metadata::default(),
            custom_data: Vec::new(),
        }
    }

    pub fn with_custom_data(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_data.push((label.into(), value.into()));
        self
    }
}

/// Totals over a set of run results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub features: usize,
    pub scenarios: usize,
    pub scenarios_passed: usize,
    pub scenarios_failed: usize,
    pub steps: usize,
    pub steps_passed: usize,
    pub steps_failed: usize,
    pub steps_skipped: usize,
    pub steps_undefined: usize,
}

impl Summary {
    pub fn of(features: &[FeatureResult]) -> Self {
        let mut summary = Self {
            features: features.len(),
            ..Self::default()
        };

        for scenario in features.iter().flat_map(|f| &f.elements) {
            summary.scenarios += 1;
            match scenario.status() {
                Status::Passed => summary.scenarios_passed += 1,
                Status::Failed => summary.scenarios_failed += 1,
                _ => {}
            }

            for step in &scenario.steps {
                summary.steps += 1;
                match step.result.status {
                    Status::Passed => summary.steps_passed += 1,
                    Status::Failed => summary.steps_failed += 1,
                    Status::Skipped => summary.steps_skipped += 1,
                    Status::Undefined | Status::Pending | Status::Ambiguous => {
                        summary.steps_undefined += 1
                    }
                }
            }
        }

        summary
    }
}

/// Picks a results file name for a feature path, unique within `taken`.
///
/// The name follows the whole path, not just the file stem, so
/// `a/login.feature` and `b/login.feature` get separate files. A numeric
/// suffix settles any remaining clash.
pub fn results_file_name(feature: &Path, taken: &mut HashSet<String>) -> String {
    let stem = feature.with_extension("");
    let mut base = String::new();
    for c in stem.to_string_lossy().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            base.push(c);
        } else if !base.is_empty() && !base.ends_with('-') {
            base.push('-');
        }
    }
    let base = match base.trim_end_matches('-') {
        "" => "results".to_string(),
        trimmed => trimmed.to_string(),
    };

    let mut name = format!("{base}.json");
    let mut n = 2;
    while !taken.insert(name.clone()) {
        name = format!("{base}-{n}.json");
        n += 1;
    }
    name
}

/// A failure screenshot taken by the after hook of one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Screenshot {
    /// Line of the scenario (or of its example row) in the feature file.
    pub line: usize,
    pub path: PathBuf,
    /// PNG bytes, base64-encoded.
    pub data: String,
}

/// Embeds screenshots into the after-hook results of their scenarios.
///
/// Rewrites the results file in place; scenarios are matched by line. A
/// scenario with no recorded after hook gets one.
pub fn attach_screenshots(results: &Path, screenshots: &[Screenshot]) -> Result<()> {
    if screenshots.is_empty() {
        return Ok(());
    }

    let content = fs::read_to_string(results)
        .map_err(|e| HarnessError::report(format!("Cannot read {}: {e}", results.display())))?;
    let mut features: Value = serde_json::from_str(&content).map_err(|e| {
        HarnessError::report(format!("Invalid run results in {}: {e}", results.display()))
    })?;

    let scenarios = features
        .as_array_mut()
        .into_iter()
        .flatten()
        .filter_map(|feature| feature.get_mut("elements")?.as_array_mut())
        .flatten();

    for scenario in scenarios {
        let line = scenario.get("line").and_then(Value::as_u64);
        for shot in screenshots.iter().filter(|s| Some(s.line as u64) == line) {
            let embedding = json!({ "data": shot.data, "mime_type": "image/png" });
            push_after_embedding(scenario, embedding);
            debug!(line = shot.line, "Attached {}", shot.path.display());
        }
    }

    let json = serde_json::to_string_pretty(&features)
        .map_err(|e| HarnessError::report(format!("Cannot serialize results: {e}")))?;
    fs::write(results, json)
        .map_err(|e| HarnessError::report(format!("Cannot write {}: {e}", results.display())))
}

fn push_after_embedding(scenario: &mut Value, embedding: Value) {
    let Some(scenario) = scenario.as_object_mut() else {
        return;
    };
    let after = scenario.entry("after").or_insert_with(|| json!([]));
    let Some(hooks) = after.as_array_mut() else {
        return;
    };
    if hooks.is_empty() {
        hooks.push(json!({ "result": { "status": "passed" } }));
    }
    if let Some(hook) = hooks[0].as_object_mut() {
        let embeddings = hook.entry("embeddings").or_insert_with(|| json!([]));
        if let Some(list) = embeddings.as_array_mut() {
            list.push(embedding);
        }
    }
}

/// Reads every `*.json` run-result file in a directory, in file-name order.
pub fn load_results(dir: &Path) -> Result<Vec<FeatureResult>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| HarnessError::report(format!("Cannot read {}: {e}", dir.display())))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut features = Vec::new();
    for path in paths {
        let content = fs::read_to_string(&path)
            .map_err(|e| HarnessError::report(format!("Cannot read {}: {e}", path.display())))?;
        let mut parsed: Vec<FeatureResult> = serde_json::from_str(&content).map_err(|e| {
            HarnessError::report(format!("Invalid run results in {}: {e}", path.display()))
        })?;
        features.append(&mut parsed);
    }

    Ok(features)
}

/// Renders `<output_dir>/index.html` from the run results in `input_dir`.
pub fn generate(options: &ReportOptions) -> Result<PathBuf> {
    let features = load_results(&options.input_dir)?;
    if features.is_empty() {
        return Err(HarnessError::report(format!(
            "No run results found in {}",
            options.input_dir.display()
        )));
    }

    let summary = Summary::of(&features);
    let page = html::render(&features, &summary, options)?;

    fs::create_dir_all(&options.output_dir).map_err(|e| {
        HarnessError::report(format!(
            "Cannot create {}: {e}",
            options.output_dir.display()
        ))
    })?;
    let path = options.output_dir.join("index.html");
    fs::write(&path, page)
        .map_err(|e| HarnessError::report(format!("Cannot write {}: {e}", path.display())))?;

    info!(
        scenarios = summary.scenarios,
        failed = summary.scenarios_failed,
        "Report written to {}",
        path.display()
    );
    Ok(path)
}
