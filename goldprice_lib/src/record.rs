//! The six-field price record written once per run.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Serialize, Serializer};

use crate::numeral::{format_change, format_percent, format_price};
use crate::pipeline::{Discovery, Outcome};

/// Column order of the persisted log. Never reordered.
pub const HEADER: [&str; 6] = [
    "timestamp",
    "price",
    "change",
    "percent_change",
    "url",
    "status",
];

/// Sentinel for a value that was not found.
pub const NOT_AVAILABLE: &str = "N/A";
/// Sentinel for a value lost to an exceptional condition.
pub const ERROR: &str = "ERROR";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of a run as persisted in the `status` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Success,
    ParsingFailed,
    Error(String),
    AllMethodsFailed,
}

impl Status {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::ParsingFailed => write!(f, "parsing_failed"),
            Self::Error(msg) => write!(f, "error: {}", msg),
            Self::AllMethodsFailed => write!(f, "all_methods_failed"),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One immutable log row. Built only through [`PriceRecord::from_discovery`]
/// and [`PriceRecord::from_error`], so `price` holds a formatted value
/// exactly when `status` is `success`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    pub timestamp: String,
    pub price: String,
    pub change: String,
    pub percent_change: String,
    pub url: String,
    pub status: Status,
}

impl PriceRecord {
    /// Record for a finished pipeline run.
    pub fn from_discovery(discovery: &Discovery, at: DateTime<FixedOffset>) -> Self {
        let na = || NOT_AVAILABLE.to_string();
        let (price, change, percent_change, status) = match &discovery.outcome {
            Outcome::Found(c) => (
                format_price(c.price),
                c.change.map(format_change).unwrap_or_else(na),
                c.percent_change.map(format_percent).unwrap_or_else(na),
                Status::Success,
            ),
            Outcome::ParsingFailed => (na(), na(), na(), Status::ParsingFailed),
            Outcome::AllMethodsFailed => (na(), na(), na(), Status::AllMethodsFailed),
        };
        Self {
            timestamp: format_timestamp(at),
            price,
            change,
            percent_change,
            url: discovery.source.clone(),
            status,
        }
    }

    /// Record for a run that could not complete (bad config, client setup).
    /// Multi-line messages are folded onto one line so each record stays one
    /// physical line in the log.
    pub fn from_error(message: &str, url: &str, at: DateTime<FixedOffset>) -> Self {
        Self {
            timestamp: format_timestamp(at),
            price: ERROR.to_string(),
            change: ERROR.to_string(),
            percent_change: ERROR.to_string(),
            url: url.to_string(),
            status: Status::Error(single_line(message)),
        }
    }

    /// The row in [`HEADER`] order.
    pub fn fields(&self) -> [String; 6] {
        [
            self.timestamp.clone(),
            self.price.clone(),
            self.change.clone(),
            self.percent_change.clone(),
            self.url.clone(),
            self.status.to_string(),
        ]
    }
}

fn single_line(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Current wall-clock time in the given fixed zone.
pub fn capture_time(offset: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&offset)
}

pub fn format_timestamp(at: DateTime<FixedOffset>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}
