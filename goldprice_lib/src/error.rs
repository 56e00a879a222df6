//! Error types for the library layer.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;

/// Why one stage/strategy attempt produced no price. These never escape the
/// pipeline; they are recorded per attempt and folded into the final status.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Connection error, timeout, or non-2xx response from a source.
    #[error("transport: {0}")]
    Transport(goldprice_api::Error),
    /// The payload could not be decoded, or a strategy found nothing in it.
    #[error("parse: {0}")]
    Parse(String),
    /// A candidate was found but failed the plausibility check.
    #[error("validation: {0}")]
    Validation(String),
}

impl From<goldprice_api::Error> for DiscoveryError {
    fn from(e: goldprice_api::Error) -> Self {
        if e.is_transport() {
            Self::Transport(e)
        } else {
            Self::Parse(e.to_string())
        }
    }
}

/// Errors that stop a run before or after discovery: bad configuration,
/// client setup, or the log file.
#[derive(Debug)]
pub enum GoldPriceError {
    /// Configuration could not be loaded or failed validation.
    Config(ConfigError),
    /// The source client could not be built.
    Client(goldprice_api::Error),
    /// Reading or appending the price log failed.
    Io(std::io::Error),
    /// Serializing a log row failed.
    Csv(csv::Error),
}

impl fmt::Display for GoldPriceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Config error: {}", e),
            Self::Client(e) => write!(f, "Client error: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Csv(e) => write!(f, "CSV error: {}", e),
        }
    }
}

impl std::error::Error for GoldPriceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Client(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Csv(e) => Some(e),
        }
    }
}

impl From<ConfigError> for GoldPriceError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<goldprice_api::Error> for GoldPriceError {
    fn from(e: goldprice_api::Error) -> Self {
        Self::Client(e)
    }
}

impl From<std::io::Error> for GoldPriceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for GoldPriceError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}
