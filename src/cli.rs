//! Command-line argument parsing for the login harness.
//!
//! Uses clap derive with one subcommand per entry point.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// End-to-end login checks: browser, API, and database cross-checks.
#[derive(Parser, Debug)]
#[command(name = "login-e2e")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory for the JSON log file
    #[arg(long, value_name = "DIR", default_value = "logs", global = true)]
    pub log_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run feature files and write cucumber JSON results
    Run {
        /// Feature files to run
        #[arg(value_name = "FEATURE", required = true)]
        features: Vec<PathBuf>,

        /// Directory for run results
        #[arg(long, value_name = "DIR", default_value = "reports")]
        report_dir: PathBuf,

        /// Directory for failure screenshots
        #[arg(long, value_name = "DIR", default_value = "screenshots")]
        screenshot_dir: PathBuf,
    },

    /// Run one query against the configured backend and print its rows as JSON
    Query {
        /// Query text, sent verbatim
        #[arg(value_name = "SQL")]
        sql: String,
    },

    /// Build the HTML report from run results
    Report {
        /// Directory holding run results
        #[arg(long, value_name = "DIR", default_value = "reports")]
        input: PathBuf,

        /// Directory to write index.html into
        #[arg(long, value_name = "DIR", default_value = "reports/html")]
        output: PathBuf,

        /// Project label shown under "Run info"
        #[arg(long, value_name = "NAME", default_value = "Login E2E")]
        project: String,

        /// Test cycle label shown under "Run info"
        #[arg(long, value_name = "NAME", default_value = "local")]
        cycle: String,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
