use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;

const USER_AGENT: &str = concat!("torn_terminal/", env!("CARGO_PKG_VERSION"));

/// `None` disables the per-request timeout.
pub fn build_client(timeout: Option<Duration>) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("failed to build http client")
}
