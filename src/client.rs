//! Blocking HTTP client for the relay API.

use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;

use crate::api::{StatusResponse, VersionResponse};

/// Upper bound for every request made by the panel.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Switching command sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    On,
    Off,
}

impl Command {
    /// Command that flips a relay currently believed to be `on`.
    pub fn toggling(on: bool) -> Self {
        if on { Command::Off } else { Command::On }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Command::On => "on",
            Command::Off => "off",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thin wrapper over the REST endpoints.
///
/// Methods return `Ok(None)` / `Ok(false)` when the server answered with anything
/// other than 200, and `Err` only when the request itself failed.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::with_base_url(format!("http://{host}:{port}"))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// True when `/system/health` answers 200. Transport errors count as unhealthy.
    pub fn health(&self) -> bool {
        match self.http.get(self.url("/system/health")).send() {
            Ok(resp) => resp.status() == StatusCode::OK,
            Err(e) => {
                debug!("health check failed: {e}");
                false
            }
        }
    }

    pub fn version(&self) -> Result<Option<VersionResponse>> {
        self.get_json("/system/version")
    }

    pub fn status(&self) -> Result<Option<StatusResponse>> {
        self.get_json("/relay/status")
    }

    pub fn switch(&self, relay_id: u32, command: Command) -> Result<bool> {
        self.post(&format!("/relay/{relay_id}/{command}"))
    }

    pub fn switch_all(&self, command: Command) -> Result<bool> {
        self.post(&format!("/relay/all/{command}"))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .with_context(|| format!("GET {path} failed"))?;
        if resp.status() != StatusCode::OK {
            debug!("GET {path} returned {}", resp.status());
            return Ok(None);
        }

        let body = resp
            .json::<T>()
            .with_context(|| format!("Failed to parse JSON response from {path}"))?;
        Ok(Some(body))
    }

    fn post(&self, path: &str) -> Result<bool> {
        let resp = self
            .http
            .post(self.url(path))
            .send()
            .with_context(|| format!("POST {path} failed"))?;
        debug!("POST {path} returned {}", resp.status());

        Ok(resp.status() == StatusCode::OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_negates_cached_state() {
        assert_eq!(Command::toggling(true), Command::Off);
        assert_eq!(Command::toggling(false), Command::On);
    }

    #[test]
    fn base_url_is_normalized() {
        let client = RelayClient::with_base_url("http://relay.local:5000/").unwrap();
        assert_eq!(client.base_url(), "http://relay.local:5000");
        assert_eq!(
            RelayClient::new("localhost", 5000).unwrap().base_url(),
            "http://localhost:5000"
        );
    }

    #[test]
    fn unreachable_server_is_unhealthy() {
        // port 9 (discard) is closed on test machines
        let client = RelayClient::new("127.0.0.1", 9).unwrap();
        assert!(!client.health());
        assert!(client.status().is_err());
    }
}
