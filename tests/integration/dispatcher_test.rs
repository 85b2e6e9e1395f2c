//! Query dispatch tests.
//!
//! Covers the mock backend end to end, backend selection, and the scoped
//! acquisition guarantees using a fault-injected driver.

use async_trait::async_trait;
use login_e2e::config::{DbConfig, MysqlConfig};
use login_e2e::db::{
    scoped_query, Driver, Fixtures, QueryDispatcher, QueryExecutor, Row, Scoped, Value,
};
use login_e2e::error::{HarnessError, Result};
use login_e2e::scenario::user_lookup_query;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn dispatcher(backend: &str) -> QueryDispatcher {
    let config = DbConfig {
        backend: backend.to_string(),
        // Unroutable, so any connection attempt trips the timeout below.
        mysql: MysqlConfig {
            host: Some("10.255.255.1".to_string()),
            ..MysqlConfig::default()
        },
        ..DbConfig::default()
    };
    QueryDispatcher::new(Arc::new(config))
}

#[tokio::test]
async fn test_mock_standard_user_returns_fixture_row() {
    let rows = dispatcher("mock")
        .execute("SELECT * FROM users WHERE username = 'standard_user'")
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![Row::new()
            .with("id", 1)
            .with("username", "standard_user")
            .with("password", "secret_sauce")]
    );
}

#[tokio::test]
async fn test_mock_unknown_user_returns_no_rows() {
    let rows = dispatcher("mock")
        .execute(&user_lookup_query("locked_out_user"))
        .await
        .unwrap();

    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_mock_unrecognised_query_returns_sentinel() {
    let rows = assert_ok!(dispatcher("mock").execute("SELECT COUNT(*) FROM orders").await);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("mock"), Some(&Value::Bool(true)));
}

#[tokio::test]
async fn test_mock_is_deterministic() {
    let dispatcher = dispatcher("mock");
    let sql = user_lookup_query("standard_user");

    let first = dispatcher.execute(&sql).await.unwrap();
    let second = dispatcher.execute(&sql).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_mock_custom_fixtures() {
    let dispatcher = dispatcher("mock").with_fixtures(
        Fixtures::empty().with_user("problem_user", Row::new().with("username", "problem_user")),
    );

    assert_eq!(
        dispatcher
            .execute(&user_lookup_query("problem_user"))
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(dispatcher
        .execute(&user_lookup_query("standard_user"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_unsupported_backend_fails_before_connecting() {
    let dispatcher = dispatcher("unsupported_backend_xyz");
    let lookup = user_lookup_query("standard_user");

    for sql in ["SELECT 1", "", lookup.as_str()] {
        let outcome = tokio::time::timeout(Duration::from_secs(1), dispatcher.execute(sql))
            .await
            .expect("unsupported backend must fail without any I/O");

        let err = assert_err!(outcome);
        assert_eq!(err.to_string(), "Unsupported DB type: unsupported_backend_xyz");
    }
}

/// Driver that counts acquire/release calls and can fail or stall on demand.
///
/// Clones share the counters, as the scoped query runs on its own clone.
#[derive(Default, Clone)]
struct FaultyDriver {
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    fail_acquire: bool,
    fail_run: bool,
    fail_release: bool,
    run_delay: Option<Duration>,
}

#[async_trait]
impl Driver for FaultyDriver {
    type Handle = usize;

    async fn acquire(&self) -> Result<usize> {
        if self.fail_acquire {
            return Err(HarnessError::connection("connect ECONNREFUSED"));
        }
        Ok(self.acquired.fetch_add(1, Ordering::SeqCst))
    }

    async fn run(&self, _handle: &mut usize, _sql: &str) -> Result<Vec<Row>> {
        if let Some(delay) = self.run_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_run {
            return Err(HarnessError::query("Table 'shop.users' doesn't exist"));
        }
        Ok(vec![Row::new().with("id", 1)])
    }

    async fn release(&self, _handle: usize) -> Result<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            return Err(HarnessError::connection("pool already closed"));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_scoped_query_releases_once_on_success() {
    let driver = FaultyDriver::default();

    let rows = scoped_query(&driver, "SELECT 1").await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(driver.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(driver.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_scoped_query_releases_once_on_query_error() {
    let driver = FaultyDriver {
        fail_run: true,
        ..FaultyDriver::default()
    };

    let err = scoped_query(&driver, "SELECT * FROM users").await.unwrap_err();

    assert!(matches!(err, HarnessError::Query(ref m) if m.contains("doesn't exist")));
    assert_eq!(driver.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_release_failure_does_not_mask_query_error() {
    let driver = FaultyDriver {
        fail_run: true,
        fail_release: true,
        ..FaultyDriver::default()
    };

    let err = scoped_query(&driver, "SELECT * FROM users").await.unwrap_err();

    assert!(matches!(err, HarnessError::Query(_)));
    assert_eq!(driver.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_release_failure_keeps_rows() {
    let driver = FaultyDriver {
        fail_release: true,
        ..FaultyDriver::default()
    };

    let rows = assert_ok!(scoped_query(&driver, "SELECT 1").await);
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_acquire_failure_releases_nothing() {
    let scoped = Scoped(FaultyDriver {
        fail_acquire: true,
        ..FaultyDriver::default()
    });

    let err = scoped.execute("SELECT 1").await.unwrap_err();
    assert!(matches!(err, HarnessError::Connection(_)));
    assert_eq!(scoped.0.released.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_release_survives_caller_timeout() {
    let driver = FaultyDriver {
        run_delay: Some(Duration::from_secs(5)),
        ..FaultyDriver::default()
    };

    let outcome =
        tokio::time::timeout(Duration::from_millis(50), scoped_query(&driver, "SELECT SLEEP(5)"))
            .await;
    assert!(outcome.is_err(), "the slow query should hit the timeout");
    assert_eq!(driver.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(driver.released.load(Ordering::SeqCst), 0);

    // The query finishes detached from the dropped caller, then releases.
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(driver.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(driver.released.load(Ordering::SeqCst), 1);
}
