//! Configuration management for the login harness.
//!
//! Settings are read once at startup from environment variables (optionally
//! seeded from a `.env` file) and are read-only afterwards. Components receive
//! the parts they need at construction.

use crate::error::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_BACKEND: &str = "mysql";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_STEP_TIMEOUT_SECS: u64 = 60;

/// Main configuration structure for the harness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Base URL of the application under test.
    pub base_url: String,

    /// Whether the browser runs without a visible window.
    pub headless: bool,

    /// Tracing filter used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Upper bound on a single scenario step.
    #[serde(with = "duration_secs")]
    pub step_timeout: Duration,

    /// Database settings.
    pub db: DbConfig,
}

/// Database settings: the backend selector plus one descriptor per live backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbConfig {
    /// Raw backend selector (`mock`, `mysql`, `mssql`), lower-cased.
    pub backend: String,

    /// MySQL connection descriptor.
    pub mysql: MysqlConfig,

    /// SQL Server connection descriptor.
    pub mssql: MssqlConfig,
}

/// MySQL connection descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MysqlConfig {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl Default for MysqlConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 3306,
            user: None,
            password: None,
            database: None,
        }
    }
}

impl MysqlConfig {
    /// Returns a display-safe string (no password) for logs.
    pub fn display_string(&self) -> String {
        let host = self.host.as_deref().unwrap_or("localhost");
        let database = self.database.as_deref().unwrap_or("unknown");
        format!("{database} @ {host}:{}", self.port)
    }
}

/// SQL Server connection descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MssqlConfig {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,

    /// Require an encrypted connection.
    #[serde(default)]
    pub encrypt: bool,

    /// Accept the server certificate without validation.
    #[serde(default)]
    pub trust_cert: bool,
}

impl Default for MssqlConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 1433,
            user: None,
            password: None,
            database: None,
            encrypt: false,
            trust_cert: false,
        }
    }
}

impl MssqlConfig {
    /// Returns a display-safe string (no password) for logs.
    pub fn display_string(&self) -> String {
        let host = self.host.as_deref().unwrap_or("localhost");
        let database = self.database.as_deref().unwrap_or("unknown");
        format!("{database} @ {host}:{}", self.port)
    }
}

impl HarnessConfig {
    /// Loads configuration from the process environment.
    ///
    /// A `.env` file in the working directory is applied first when present;
    /// variables already set in the environment take precedence over it.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is not an error.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let base_url = non_empty("BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Url::parse(&base_url)
            .map_err(|e| HarnessError::config(format!("Invalid BASE_URL '{base_url}': {e}")))?;

        let headless = lookup("HEADLESS").map_or(true, |v| v == "true");

        let log_level = non_empty("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let step_timeout = match non_empty("STEP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number(&raw, "STEP_TIMEOUT_SECS")?),
            None => Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
        };

        let backend = non_empty("DB_TYPE")
            .unwrap_or_else(|| DEFAULT_BACKEND.to_string())
            .to_lowercase();

        let mysql = MysqlConfig {
            host: non_empty("MYSQL_HOST"),
            port: match non_empty("MYSQL_PORT") {
                Some(raw) => parse_number(&raw, "MYSQL_PORT")?,
                None => MysqlConfig::default().port,
            },
            user: non_empty("MYSQL_USER"),
            password: lookup("MYSQL_PASSWORD"),
            database: non_empty("MYSQL_DATABASE"),
        };

        let mssql = MssqlConfig {
            host: non_empty("MSSQL_HOST"),
            port: match non_empty("MSSQL_PORT") {
                Some(raw) => parse_number(&raw, "MSSQL_PORT")?,
                None => MssqlConfig::default().port,
            },
            user: non_empty("MSSQL_USER"),
            password: lookup("MSSQL_PASSWORD"),
            database: non_empty("MSSQL_DATABASE"),
            encrypt: parse_flag(lookup("MSSQL_ENCRYPT")),
            trust_cert: parse_flag(lookup("MSSQL_TRUST_CERT")),
        };

        Ok(Self {
            base_url,
            headless,
            log_level,
            step_timeout,
            db: DbConfig {
                backend,
                mysql,
                mssql,
            },
        })
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, key: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| HarnessError::config(format!("{key} must be a number, got '{raw}'")))
}

fn parse_flag(raw: Option<String>) -> bool {
    matches!(
        raw.as_deref().map(str::to_lowercase).as_deref(),
        Some("true" | "1" | "yes")
    )
}

/// Serde support for Duration as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
