//! Direct API login, bypassing the browser.

use crate::error::{HarnessError, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;
use url::Url;

/// Outcome of a `POST /api/login` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiLoginResponse {
    pub status: u16,
    /// Parsed JSON body, or `None` when the body is not JSON.
    pub body: Option<JsonValue>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// Resolves the login endpoint against the base URL.
pub fn login_endpoint(base_url: &str) -> Result<Url> {
    Url::parse(base_url)
        .and_then(|base| base.join("/api/login"))
        .map_err(|e| HarnessError::config(format!("Invalid base URL '{base_url}': {e}")))
}

/// Posts credentials to the login API.
///
/// Non-2xx statuses are returned, not raised; only transport failures error.
pub async fn api_login(base_url: &str, username: &str, password: &str) -> Result<ApiLoginResponse> {
    let endpoint = login_endpoint(base_url)?;

    let response = reqwest::Client::new()
        .post(endpoint.clone())
        .json(&Credentials { username, password })
        .send()
        .await
        .map_err(|e| HarnessError::connection(format!("POST {endpoint} failed: {e}")))?;

    let status = response.status().as_u16();
    let body = response.json::<JsonValue>().await.ok();

    Ok(ApiLoginResponse { status, body })
}
