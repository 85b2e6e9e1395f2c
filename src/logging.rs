//! Logging configuration for the harness.
//!
//! Events go to stderr for humans and to a newline-delimited JSON file for
//! tooling. Each file line has the shape
//! `{"Timestamp": ..., "Level": ..., "Message": ..., "Properties": {...}}`.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// File name of the JSON log inside the log directory.
pub const LOG_FILE_NAME: &str = "harness.json";

/// One line of the JSON log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub properties: Map<String, JsonValue>,
}

/// Tracing layer appending one [`LogEntry`] per event to a file.
pub struct JsonLinesLayer {
    file: Mutex<File>,
}

impl JsonLinesLayer {
    /// Opens (or creates) the log file in append mode.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: Subscriber> Layer<S> for JsonLinesLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);

        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level: event.metadata().level().as_str().to_string(),
            message: visitor.message.unwrap_or_default(),
            properties: visitor.properties,
        };

        let Ok(mut line) = serde_json::to_vec(&entry) else {
            return;
        };
        line.push(b'\n');

        if let Ok(mut file) = self.file.lock() {
            // Nowhere left to report a failed log write.
            let _ = file.write_all(&line);
        }
    }
}

/// Collects the `message` field and everything else as properties.
#[derive(Default)]
struct EntryVisitor {
    message: Option<String>,
    properties: Map<String, JsonValue>,
}

impl EntryVisitor {
    fn put(&mut self, field: &Field, value: JsonValue) {
        if field.name() == "message" {
            self.message = Some(match value {
                JsonValue::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.properties.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for EntryVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, JsonValue::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, JsonValue::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, JsonValue::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, JsonValue::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, JsonValue::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, JsonValue::from(value));
    }
}

/// Initializes logging to stderr and to `<log_dir>/harness.json`.
///
/// `RUST_LOG` overrides `level` when set. If the log directory cannot be
/// created, logging falls back to stderr only.
pub fn init_logging(log_dir: &Path, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let json = match open_log_file(log_dir) {
        Ok(layer) => Some(layer),
        Err(e) => {
            eprintln!("Warning: Could not open log file in {}: {e}", log_dir.display());
            None
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(json)
        .init();
}

fn open_log_file(log_dir: &Path) -> std::io::Result<JsonLinesLayer> {
    fs::create_dir_all(log_dir)?;
    JsonLinesLayer::open(&log_path(log_dir))
}

/// Returns the JSON log path inside a log directory.
pub fn log_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

/// Reads back every entry of a JSON log file.
pub fn read_entries(path: &Path) -> std::io::Result<Vec<LogEntry>> {
    fs::read_to_string(path)?
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(std::io::Error::from))
        .collect()
}
