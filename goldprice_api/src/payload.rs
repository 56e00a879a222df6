//! Endpoint descriptions and the raw payloads they produce.

use std::fmt;

use url::Url;

use crate::Error;

/// The response shape an endpoint is expected to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Html,
    Json,
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Html => write!(f, "html"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// A single external price source: a fixed URL and the payload format it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    id: String,
    url: Url,
    format: PayloadFormat,
}

impl Endpoint {
    /// Creates an endpoint, rejecting URLs that do not parse.
    pub fn new(id: &str, url: &str, format: PayloadFormat) -> Result<Self, Error> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            id: id.to_string(),
            url: parsed,
            format,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn format(&self) -> PayloadFormat {
        self.format
    }
}

/// The undecoded (HTML) or decoded (JSON) body returned by an endpoint.
///
/// Payloads live for one extraction attempt and are never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Html(String),
    Json(serde_json::Value),
}

impl RawPayload {
    /// The markup of an HTML payload, `None` for JSON.
    pub fn as_html(&self) -> Option<&str> {
        match self {
            Self::Html(body) => Some(body),
            Self::Json(_) => None,
        }
    }

    /// The decoded value of a JSON payload, `None` for HTML.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Html(_) => None,
        }
    }

    pub fn format(&self) -> PayloadFormat {
        match self {
            Self::Html(_) => PayloadFormat::Html,
            Self::Json(_) => PayloadFormat::Json,
        }
    }
}
