//! SQL Server backend.
//!
//! Each query opens one tiberius connection over TCP and closes it with
//! `Client::close` once the first result set has been read.

use super::{Driver, Row, Value};
use crate::config::MssqlConfig;
use crate::error::{HarnessError, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

/// An open SQL Server connection.
pub type MssqlClient = Client<Compat<TcpStream>>;

/// Driver opening one SQL Server connection per query.
#[derive(Debug, Clone)]
pub struct MssqlDriver {
    config: MssqlConfig,
}

impl MssqlDriver {
    pub fn new(config: MssqlConfig) -> Self {
        Self { config }
    }

    /// Builds the tiberius configuration. Absent fields become empty strings.
    fn tiberius_config(&self) -> Config {
        let text = |field: &Option<String>| field.clone().unwrap_or_default();

        let mut config = Config::new();
        config.host(text(&self.config.host));
        config.port(self.config.port);
        config.database(text(&self.config.database));
        config.authentication(AuthMethod::sql_server(
            text(&self.config.user),
            text(&self.config.password),
        ));
        config.encryption(if self.config.encrypt {
            EncryptionLevel::Required
        } else {
            EncryptionLevel::NotSupported
        });
        if self.config.trust_cert {
            config.trust_cert();
        }
        config
    }
}

#[async_trait]
impl Driver for MssqlDriver {
    type Handle = MssqlClient;

    async fn acquire(&self) -> Result<MssqlClient> {
        debug!("Connecting to SQL Server {}", self.config.display_string());
        let config = self.tiberius_config();

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| {
                HarnessError::connection(format!(
                    "Cannot connect to {}: {e}",
                    self.config.display_string()
                ))
            })?;
        tcp.set_nodelay(true)
            .map_err(|e| HarnessError::connection(e.to_string()))?;

        Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| HarnessError::connection(e.to_string()))
    }

    async fn run(&self, client: &mut MssqlClient, sql: &str) -> Result<Vec<Row>> {
        let stream = client
            .simple_query(sql)
            .await
            .map_err(|e| HarnessError::query(e.to_string()))?;
        let rows = stream
            .into_first_result()
            .await
            .map_err(|e| HarnessError::query(e.to_string()))?;

        debug!("SQL Server query returned {} rows", rows.len());
        Ok(rows.into_iter().map(convert_row).collect())
    }

    async fn release(&self, client: MssqlClient) -> Result<()> {
        client
            .close()
            .await
            .map_err(|e| HarnessError::connection(format!("Failed to close connection: {e}")))
    }
}

/// Converts a tiberius row to our Row type.
fn convert_row(row: tiberius::Row) -> Row {
    let names: Vec<String> = row
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();

    names
        .into_iter()
        .zip(row)
        .map(|(name, data)| (name, convert_value(data)))
        .collect()
}

/// Converts one column value. Temporal values are rendered as text.
fn convert_value(data: ColumnData<'static>) -> Value {
    let value = match data {
        ColumnData::Bit(v) => v.map(Value::Bool),
        ColumnData::U8(v) => v.map(|v| Value::Int(i64::from(v))),
        ColumnData::I16(v) => v.map(|v| Value::Int(i64::from(v))),
        ColumnData::I32(v) => v.map(|v| Value::Int(i64::from(v))),
        ColumnData::I64(v) => v.map(Value::Int),
        ColumnData::F32(v) => v.map(|v| Value::Float(f64::from(v))),
        ColumnData::F64(v) => v.map(Value::Float),
        ColumnData::String(v) => v.map(|s| Value::String(s.into_owned())),
        ColumnData::Guid(v) => v.map(|g| Value::String(g.to_string())),
        ColumnData::Binary(v) => v.map(|b| Value::Bytes(b.into_owned())),
        ColumnData::Numeric(v) => v.map(|n| Value::String(n.to_string())),
        data @ (ColumnData::DateTime(_)
        | ColumnData::SmallDateTime(_)
        | ColumnData::DateTime2(_)) => text_of::<NaiveDateTime>(&data),
        data @ ColumnData::Date(_) => text_of::<NaiveDate>(&data),
        data @ ColumnData::Time(_) => text_of::<NaiveTime>(&data),
        data @ ColumnData::DateTimeOffset(_) => text_of::<DateTime<FixedOffset>>(&data),
        other => Some(Value::String(format!("{other:?}"))),
    };
    value.unwrap_or(Value::Null)
}

fn text_of<'a, T>(data: &'a ColumnData<'static>) -> Option<Value>
where
    T: FromSql<'a> + ToString,
{
    T::from_sql(data)
        .ok()
        .flatten()
        .map(|v| Value::String(v.to_string()))
}
