//! MySQL backend.
//!
//! Each query gets its own sqlx pool, which is closed once the query has run.
//! Query text is sent over the text protocol, unprepared.

use super::{Driver, Row, Value};
use crate::config::MysqlConfig;
use crate::error::{HarnessError, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use std::time::Instant;
use tracing::debug;

/// Driver opening a short-lived MySQL pool per query.
#[derive(Debug, Clone)]
pub struct MysqlDriver {
    config: MysqlConfig,
}

impl MysqlDriver {
    pub fn new(config: MysqlConfig) -> Self {
        Self { config }
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new().port(self.config.port);
        if let Some(host) = &self.config.host {
            options = options.host(host);
        }
        if let Some(user) = &self.config.user {
            options = options.username(user);
        }
        if let Some(password) = &self.config.password {
            options = options.password(password);
        }
        if let Some(database) = &self.config.database {
            options = options.database(database);
        }
        options
    }
}

#[async_trait]
impl Driver for MysqlDriver {
    type Handle = MySqlPool;

    async fn acquire(&self) -> Result<MySqlPool> {
        debug!("Opening MySQL pool to {}", self.config.display_string());
        MySqlPoolOptions::new()
            .max_connections(5)
            .connect_with(self.connect_options())
            .await
            .map_err(|e| map_connection_error(e, &self.config))
    }

    async fn run(&self, pool: &mut MySqlPool, sql: &str) -> Result<Vec<Row>> {
        let start = Instant::now();
        let rows = sqlx::raw_sql(sql)
            .fetch_all(&*pool)
            .await
            .map_err(|e| HarnessError::query(format_query_error(e)))?;

        debug!("MySQL query returned {} rows in {:?}", rows.len(), start.elapsed());
        Ok(rows.iter().map(convert_row).collect())
    }

    async fn release(&self, pool: MySqlPool) -> Result<()> {
        pool.close().await;
        Ok(())
    }
}

/// Converts a sqlx MySqlRow to our Row type.
fn convert_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            (
                col.name().to_string(),
                convert_value(row, i, col.type_info().name()),
            )
        })
        .collect()
}

/// Converts a single column value from a MySqlRow to our Value type.
///
/// Text-protocol values arrive as strings, so unchecked decoding parses them
/// into the target type.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOLEAN" => row
            .try_get_unchecked::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => row
            .try_get_unchecked::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row
            .try_get_unchecked::<Option<u64>, _>(index)
            .ok()
            .flatten()
            .map(|v| match i64::try_from(v) {
                Ok(v) => Value::Int(v),
                Err(_) => Value::String(v.to_string()),
            })
            .unwrap_or(Value::Null),

        "FLOAT" | "DOUBLE" => row
            .try_get_unchecked::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => row
            .try_get_unchecked::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // Everything else (text, decimal, temporal, json) keeps its text form
        _ => row
            .try_get_unchecked::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &MysqlConfig) -> HarnessError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        HarnessError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("access denied") {
        HarnessError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("unknown database") {
        HarnessError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        HarnessError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        HarnessError::connection(error.to_string())
    }
}

/// Formats a query error, keeping the SQLSTATE code when the server sent one.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => match db_error.code() {
            Some(code) => format!("ERROR {code}: {}", db_error.message()),
            None => format!("ERROR: {}", db_error.message()),
        },
        None => error.to_string(),
    }
}
