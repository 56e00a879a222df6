//! HTTP client that fetches raw payloads from price source endpoints.

use std::time::Duration;

use crate::{
    payload::{Endpoint, PayloadFormat, RawPayload},
    user_agent::get_user_agent,
    Error,
};

/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// HTTP client for price source endpoints.
///
/// Sends requests with browser-like headers and a browser user agent to
/// avoid being blocked. The timeout is fixed when the client is built and
/// applies to every fetch.
pub struct Client {
    http: reqwest::Client,
    timeout: Duration,
}

impl Client {
    /// Creates a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .timeout(timeout)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::ClientBuild(e.to_string())
            })?;
        Ok(Self { http, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches one endpoint and returns its payload.
    ///
    /// Connection errors, timeouts and non-2xx statuses are transport
    /// errors. A JSON endpoint whose body does not decode yields
    /// `Error::Decode`.
    pub async fn fetch(&self, endpoint: &Endpoint) -> Result<RawPayload, Error> {
        let url = endpoint.url();
        let accept = match endpoint.format() {
            PayloadFormat::Html => "text/html,application/xhtml+xml",
            PayloadFormat::Json => "application/json, text/plain, */*",
        };
        let resp = self
            .http
            .get(url)
            .header("accept", accept)
            .header("accept-language", "en-US,en;q=0.9")
            .header("cache-control", "no-cache")
            .header("pragma", "no-cache")
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| transport_error(url, e))?;

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::error!("Request to {} failed with status {}: {}", url, status, snippet);
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body: snippet,
            });
        }

        match endpoint.format() {
            PayloadFormat::Html => Ok(RawPayload::Html(body)),
            PayloadFormat::Json => {
                let value = serde_json::from_str::<serde_json::Value>(&body).map_err(|e| {
                    tracing::error!(
                        "Failed to parse JSON from {}: {} | body: {}",
                        url,
                        e,
                        truncate_body(&body)
                    );
                    Error::Decode {
                        url: url.to_string(),
                        message: e.to_string(),
                    }
                })?;
                Ok(RawPayload::Json(value))
            }
        }
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> Error {
    tracing::error!("Failed to fetch {}: {}", url, e);
    Error::Transport {
        url: url.to_string(),
        message: e.to_string(),
        timed_out: e.is_timeout(),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 500;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &body[..end])
}
