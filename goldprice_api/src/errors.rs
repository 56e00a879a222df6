//! Error types for the source client.

/// Errors that can occur when fetching a source payload.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The endpoint URL could not be parsed.
    #[error("Invalid endpoint URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
    /// The request failed before a response arrived (connection error or timeout).
    #[error("Request to {url} failed: {message}")]
    Transport {
        url: String,
        message: String,
        timed_out: bool,
    },
    /// The source answered with a non-success status.
    #[error("Request to {url} failed with status {status}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },
    /// The body arrived but could not be decoded into the expected payload kind.
    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl Error {
    /// True for failures of the transport itself: connection errors,
    /// timeouts and non-2xx responses.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::HttpStatus { .. })
    }

    /// True when the request hit the client timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { timed_out: true, .. })
    }
}
