//! Error types for the login harness.
//!
//! Defines the main error enum used throughout the crate.

use thiserror::Error;

/// Main error type for harness operations.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Configuration errors (malformed port, invalid base URL, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend selector names no known backend.
    #[error("Unsupported DB type: {0}")]
    UnsupportedBackend(String),

    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, constraint violations, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Browser automation errors (launch failure, missing element, etc.)
    #[error("Browser error: {0}")]
    Browser(String),

    /// A scenario expectation did not hold.
    #[error("Assertion failed: {0}")]
    Assertion(String),

    /// Report generation errors (unreadable run results, write failures, etc.)
    #[error("Report error: {0}")]
    Report(String),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HarnessError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an unsupported-backend error for the given selector.
    pub fn unsupported_backend(selector: impl Into<String>) -> Self {
        Self::UnsupportedBackend(selector.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a browser error with the given message.
    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }

    /// Creates an assertion error with the given message.
    pub fn assertion(msg: impl Into<String>) -> Self {
        Self::Assertion(msg.into())
    }

    /// Creates a report error with the given message.
    pub fn report(msg: impl Into<String>) -> Self {
        Self::Report(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::UnsupportedBackend(_) => "Configuration Error",
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Browser(_) => "Browser Error",
            Self::Assertion(_) => "Assertion Error",
            Self::Report(_) => "Report Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using HarnessError.
pub type Result<T> = std::result::Result<T, HarnessError>;
