//! Login E2E - browser, API, and database checks for a web login flow.

mod cli;

use cli::{Cli, Command};
use login_e2e::browser::BrowserLauncher;
use login_e2e::config::HarnessConfig;
use login_e2e::db::QueryDispatcher;
use login_e2e::error::{HarnessError, Result};
use login_e2e::logging::init_logging;
use login_e2e::report::{self, ReportOptions};
use login_e2e::scenario::{RunnerOptions, ScenarioRunner};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let config = match HarnessConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", e.category(), e);
            std::process::exit(1);
        }
    };

    init_logging(&cli.log_dir, &config.log_level);

    match run(cli.command, config).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}: {}", e.category(), e);
            std::process::exit(1);
        }
    }
}

/// Runs the selected command. Returns false when any scenario failed.
async fn run(command: Command, config: HarnessConfig) -> Result<bool> {
    match command {
        Command::Run {
            features,
            report_dir,
            screenshot_dir,
        } => {
            info!("Database: {} ({})", config.db.backend, describe_db(&config));
            let dispatcher = Arc::new(QueryDispatcher::new(Arc::new(config.db.clone())));
            let runner = ScenarioRunner::new(
                Arc::new(BrowserLauncher::new(config.headless)),
                dispatcher,
                RunnerOptions::from_config(&config, screenshot_dir),
            );

            let passed = runner.run_all(&features, &report_dir).await;
            info!(passed, "Run finished");
            Ok(passed)
        }

        Command::Query { sql } => {
            let dispatcher = QueryDispatcher::new(Arc::new(config.db));
            let rows = dispatcher.execute(&sql).await?;
            let json = serde_json::to_string_pretty(&rows)
                .map_err(|e| HarnessError::internal(format!("Cannot serialize rows: {e}")))?;
            println!("{json}");
            Ok(true)
        }

        Command::Report {
            input,
            output,
            project,
            cycle,
        } => {
            let options = ReportOptions::new(input, output)
                .with_custom_data("Project", project)
                .with_custom_data("Cycle", cycle);
            let path = report::generate(&options)?;
            println!("Report written to {}", path.display());
            Ok(true)
        }
    }
}

fn describe_db(config: &HarnessConfig) -> String {
    match config.db.backend.as_str() {
        "mysql" => config.db.mysql.display_string(),
        "mssql" => config.db.mssql.display_string(),
        _ => "no connection".to_string(),
    }
}
