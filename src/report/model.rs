//! Run-result model.
//!
//! Reads the cucumber JSON layout (`features[].elements[].steps[]`) written by
//! the runner's JSON writer. Fields the writer may omit default to empty.

use serde::Deserialize;
use std::fmt;

/// Outcome of a step, hook, or scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    Skipped,
    Undefined,
    Pending,
    Ambiguous,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Undefined => "undefined",
            Self::Pending => "pending",
            Self::Ambiguous => "ambiguous",
        }
    }

    /// Combines outcomes: any failure wins, then ambiguous, undefined, pending, skipped.
    pub fn worst<I: IntoIterator<Item = Status>>(statuses: I) -> Status {
        statuses
            .into_iter()
            .max_by_key(|s| match s {
                Self::Passed => 0,
                Self::Skipped => 1,
                Self::Pending => 2,
                Self::Undefined => 3,
                Self::Ambiguous => 4,
                Self::Failed => 5,
            })
            .unwrap_or(Self::Passed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one step or hook.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Outcome {
    pub status: Status,

    /// Duration in nanoseconds.
    #[serde(default)]
    pub duration: Option<u64>,

    #[serde(default)]
    pub error_message: Option<String>,
}

impl Outcome {
    /// Duration as seconds with millisecond precision, or empty when unknown.
    pub fn seconds(&self) -> String {
        self.duration
            .map(|ns| format!("{:.3}s", ns as f64 / 1e9))
            .unwrap_or_default()
    }
}

/// Attached artifact, base64-encoded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Embedding {
    pub data: String,
    pub mime_type: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Embedding {
    /// `data:` URI for image attachments.
    ///
    /// `None` for other attachments, and for payloads that are not plain
    /// base64 under an `image/<subtype>` type, so the URI is safe to emit
    /// unescaped in an attribute.
    pub fn image_uri(&self) -> Option<String> {
        let subtype = self.mime_type.strip_prefix("image/")?;
        let subtype_ok = !subtype.is_empty()
            && subtype
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'+' | b'-'));
        let data_ok = self
            .data
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='));

        (subtype_ok && data_ok).then(|| format!("data:{};base64,{}", self.mime_type, self.data))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HookResult {
    pub result: Outcome,
    #[serde(default)]
    pub embeddings: Vec<Embedding>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StepResult {
    pub keyword: String,
    pub name: String,
    #[serde(default)]
    pub line: usize,
    pub result: Outcome,
    #[serde(default)]
    pub embeddings: Vec<Embedding>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScenarioResult {
    #[serde(default)]
    pub id: String,
    pub keyword: String,
    pub name: String,
    #[serde(default)]
    pub line: usize,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub before: Vec<HookResult>,
    #[serde(default)]
    pub steps: Vec<StepResult>,
    #[serde(default)]
    pub after: Vec<HookResult>,
}

impl ScenarioResult {
    /// Overall status across hooks and steps.
    pub fn status(&self) -> Status {
        let hooks = self.before.iter().chain(&self.after).map(|h| h.result.status);
        let steps = self.steps.iter().map(|s| s.result.status);
        Status::worst(hooks.chain(steps))
    }

    pub fn passed(&self) -> bool {
        self.status() == Status::Passed
    }

    /// Embeddings from steps and hooks, in run order.
    pub fn embeddings(&self) -> impl Iterator<Item = &Embedding> {
        self.before
            .iter()
            .flat_map(|h| &h.embeddings)
            .chain(self.steps.iter().flat_map(|s| &s.embeddings))
            .chain(self.after.iter().flat_map(|h| &h.embeddings))
    }

    /// Hook error messages, before hooks first.
    pub fn hook_errors(&self) -> impl Iterator<Item = &str> {
        self.before
            .iter()
            .chain(&self.after)
            .filter_map(|h| h.result.error_message.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeatureResult {
    #[serde(default)]
    pub uri: Option<String>,
    pub keyword: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub elements: Vec<ScenarioResult>,
}

impl FeatureResult {
    pub fn status(&self) -> Status {
        Status::worst(self.elements.iter().map(ScenarioResult::status))
    }
}
