//! HTML page for run results.

use super::{FeatureResult, ReportOptions, Summary};
use crate::error::{HarnessError, Result};
use askama::Template;

/// The report page; values are HTML-escaped by the template.
#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate<'a> {
    features: &'a [FeatureResult],
    summary: &'a Summary,
    options: &'a ReportOptions,
}

pub(super) fn render(
    features: &[FeatureResult],
    summary: &Summary,
    options: &ReportOptions,
) -> Result<String> {
    ReportTemplate {
        features,
        summary,
        options,
    }
    .render()
    .map_err(|e| HarnessError::report(format!("Cannot render report: {e}")))
}
