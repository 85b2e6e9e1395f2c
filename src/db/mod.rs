//! Database access for scenario cross-checks.
//!
//! A [`QueryDispatcher`] resolves the configured backend and forwards raw
//! query text to it. Live backends are [`Driver`]s: each call acquires a
//! fresh handle, runs the query, and releases the handle before returning,
//! whether the query succeeded or not.

mod mock;
mod mssql;
mod mysql;
mod types;

pub use mock::{Fixtures, MockExecutor, STANDARD_USER};
pub use mssql::MssqlDriver;
pub use mysql::MysqlDriver;
pub use types::{Row, Value};

use crate::config::DbConfig;
use crate::error::{HarnessError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Fixture table, no I/O.
    Mock,
    /// MySQL via a per-call pool.
    Mysql,
    /// SQL Server via a per-call connection.
    Mssql,
}

impl Backend {
    /// Returns the backend as its selector string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Mysql => "mysql",
            Self::Mssql => "mssql",
        }
    }

    /// Resolves a selector string.
    pub fn parse(selector: &str) -> Result<Self> {
        match selector.to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "mysql" => Ok(Self::Mysql),
            "mssql" => Ok(Self::Mssql),
            _ => Err(HarnessError::unsupported_backend(selector)),
        }
    }
}

/// Runs raw query text against one backend.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Executes the query text verbatim and returns its rows.
    async fn execute(&self, sql: &str) -> Result<Vec<Row>>;
}

/// A live backend whose handles are scoped to a single query.
///
/// `release` takes the handle by value, so a handle cannot be released twice
/// or used after release.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Connection or pool handle.
    type Handle: Send;

    /// Opens a handle.
    async fn acquire(&self) -> Result<Self::Handle>;

    /// Runs the query text on the handle.
    async fn run(&self, handle: &mut Self::Handle, sql: &str) -> Result<Vec<Row>>;

    /// Closes the handle.
    async fn release(&self, handle: Self::Handle) -> Result<()>;
}

/// Acquires a handle, runs the query, and releases the handle on every path.
///
/// The three calls run on a spawned task, so dropping the returned future
/// (a step timeout, say) leaves the release in flight instead of skipping it.
/// A failed release is logged and dropped; the query outcome is returned as is.
pub async fn scoped_query<D>(driver: &D, sql: &str) -> Result<Vec<Row>>
where
    D: Driver + Clone + 'static,
{
    let driver = driver.clone();
    let sql = sql.to_owned();

    let task = tokio::spawn(async move {
        let mut handle = driver.acquire().await?;
        let outcome = driver.run(&mut handle, &sql).await;

        if let Err(e) = driver.release(handle).await {
            warn!(error = %e, "Failed to release database handle");
        }

        outcome
    });

    task.await
        .map_err(|e| HarnessError::internal(format!("Query task failed: {}", e)))?
}

/// Adapts a [`Driver`] to [`QueryExecutor`] through [`scoped_query`].
#[derive(Debug)]
pub struct Scoped<D>(pub D);

#[async_trait]
impl<D> QueryExecutor for Scoped<D>
where
    D: Driver + Clone + 'static,
{
    async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        scoped_query(&self.0, sql).await
    }
}

/// Routes query text to the configured backend.
#[derive(Debug, Clone)]
pub struct QueryDispatcher {
    config: Arc<DbConfig>,
    fixtures: Fixtures,
}

impl QueryDispatcher {
    /// Creates a dispatcher over the given settings, using the standard fixtures.
    pub fn new(config: Arc<DbConfig>) -> Self {
        Self {
            config,
            fixtures: Fixtures::standard(),
        }
    }

    /// Replaces the fixture table used by the mock backend.
    pub fn with_fixtures(mut self, fixtures: Fixtures) -> Self {
        self.fixtures = fixtures;
        self
    }

    /// Resolves the configured backend selector.
    pub fn backend(&self) -> Result<Backend> {
        Backend::parse(&self.config.backend)
    }

    /// Executes the query text on the configured backend.
    ///
    /// An unknown selector fails here, before any connection is attempted.
    pub async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        let backend = self.backend()?;
        debug!(backend = backend.as_str(), "Dispatching query");
        self.executor_for(backend).execute(sql).await
    }

    fn executor_for(&self, backend: Backend) -> Box<dyn QueryExecutor> {
        match backend {
            Backend::Mock => Box::new(MockExecutor::new(self.fixtures.clone())),
            Backend::Mysql => Box::new(Scoped(MysqlDriver::new(self.config.mysql.clone()))),
            Backend::Mssql => Box::new(Scoped(MssqlDriver::new(self.config.mssql.clone()))),
        }
    }
}
