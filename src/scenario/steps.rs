//! Step definitions for the login feature.
//!
//! `{string}` matches single- or double-quoted text and `{int}` an integer.
//! Every step runs under the configured step timeout.

use super::world::{within, LoginWorld};
use crate::api::api_login;
use crate::error::{HarnessError, Result};
use cucumber::{given, then, when};
use tracing::{debug, info};

/// Query text used to cross-check a user row.
pub fn user_lookup_query(username: &str) -> String {
    format!("SELECT * FROM users WHERE username = '{username}'")
}

#[given("I open the login page")]
async fn open_login_page(world: &mut LoginWorld) -> Result<()> {
    let context = world.context()?;
    let portal = world.portal()?;
    within(context.options.step_timeout, portal.goto(&context.options.base_url)).await?;
    world.mark_page_opened();
    Ok(())
}

#[when(expr = "I login with {string} and {string}")]
async fn login(world: &mut LoginWorld, username: String, password: String) -> Result<()> {
    let limit = world.context()?.options.step_timeout;
    debug!(username = %username, "Submitting login form");
    within(limit, world.login_page()?.login(&username, &password)).await
}

#[then("I should be logged in")]
async fn logged_in(world: &mut LoginWorld) -> Result<()> {
    let limit = world.context()?.options.step_timeout;
    if within(limit, world.login_page()?.is_logged_in()).await? {
        Ok(())
    } else {
        Err(HarnessError::assertion("expected to be logged in"))
    }
}

#[then("I should see an error message")]
async fn error_message_shown(world: &mut LoginWorld) -> Result<()> {
    let limit = world.context()?.options.step_timeout;
    match within(limit, world.login_page()?.error_message()).await? {
        Some(message) => {
            debug!(message = %message, "Login error shown");
            Ok(())
        }
        None => Err(HarnessError::assertion("expected a login error message")),
    }
}

#[then(expr = "the user {string} should exist in DB")]
async fn user_in_db(world: &mut LoginWorld, username: String) -> Result<()> {
    let context = world.context()?;
    let sql = user_lookup_query(&username);
    let rows = within(context.options.step_timeout, context.dispatcher.execute(&sql)).await?;
    if rows.is_empty() {
        return Err(HarnessError::assertion(format!(
            "User {username} not found in DB"
        )));
    }
    info!(username = %username, rows = rows.len(), "User found in DB");
    Ok(())
}

#[then(expr = "the API login with {string} and {string} should return status {int}")]
async fn api_login_status(
    world: &mut LoginWorld,
    username: String,
    password: String,
    status: u16,
) -> Result<()> {
    let context = world.context()?;
    let response = within(
        context.options.step_timeout,
        api_login(&context.options.base_url, &username, &password),
    )
    .await?;
    if response.status == status {
        Ok(())
    } else {
        Err(HarnessError::assertion(format!(
            "API login returned status {}, expected {status}",
            response.status
        )))
    }
}
