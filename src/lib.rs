//! Login E2E - browser, API, and database checks for a web login flow.
//!
//! This library exposes the core modules for use in integration tests.

pub mod api;
pub mod browser;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod report;
pub mod scenario;
