//! Built-in command sets.

pub mod clock;
pub mod home;
pub mod joke;
pub mod weather;

use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::AppError;

/// Upper bound on any single web request made by a plugin.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("xavier/", env!("CARGO_PKG_VERSION"));

/// Blocking HTTP client shared by the web-backed plugins.
pub(crate) fn http_client() -> Result<Client, AppError> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))
}
