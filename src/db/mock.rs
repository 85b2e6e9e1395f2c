//! Fixture-backed mock backend.
//!
//! Lets scenarios run without a live database. Lookups are keyed by the
//! username taken from a `... from users where username = '<value>'`
//! predicate in the query text.

use super::{QueryExecutor, Row};
use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::info;

/// Username of the built-in fixture user.
pub const STANDARD_USER: &str = "standard_user";

fn users_predicate() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)from\s+users\s+where\s+username\s*=\s*'([^']+)'")
            .expect("users predicate pattern is valid")
    })
}

/// In-memory user rows keyed by username.
#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    users: HashMap<String, Row>,
}

impl Fixtures {
    /// Creates an empty fixture table.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds a user row, returning the table for chaining.
    pub fn with_user(mut self, username: impl Into<String>, row: Row) -> Self {
        self.users.insert(username.into(), row);
        self
    }

    /// Returns the row stored for a username.
    pub fn user(&self, username: &str) -> Option<&Row> {
        self.users.get(username)
    }

    /// The fixture table the harness ships with: one known-good login.
    pub fn standard() -> Self {
        Self::empty().with_user(
            STANDARD_USER,
            Row::new()
                .with("id", 1)
                .with("username", STANDARD_USER)
                .with("password", "secret_sauce"),
        )
    }
}

/// Query executor answering from a fixture table.
#[derive(Debug, Clone)]
pub struct MockExecutor {
    fixtures: Fixtures,
}

impl MockExecutor {
    /// Creates a mock executor over the given fixtures.
    pub fn new(fixtures: Fixtures) -> Self {
        Self { fixtures }
    }

    fn answer(&self, sql: &str) -> Vec<Row> {
        let Some(captures) = users_predicate().captures(sql) else {
            return vec![Row::new().with("mock", true)];
        };

        let username = captures.get(1).map_or("", |m| m.as_str());
        self.fixtures.user(username).cloned().into_iter().collect()
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new(Fixtures::standard())
    }
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        info!(query = %sql, "Running in mock mode");
        Ok(self.answer(sql))
    }
}
