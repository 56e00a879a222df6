//! Library layer for goldprice: extraction strategies, the discovery
//! pipeline, price records, configuration, and the CSV price log.
//!
//! Wraps the `goldprice_api` source client with ordered fallback strategies
//! and plausibility checks, and turns each run into one six-field record.

pub mod band;
pub mod config;
pub mod error;
pub mod numeral;
pub mod pipeline;
pub mod record;
pub mod store;
pub mod strategy;

pub use goldprice_api;
pub use goldprice_api::{Client, Endpoint, PayloadFormat, RawPayload};

pub use band::PlausibilityBand;
pub use config::{Config, ConfigError, Preset};
pub use error::{DiscoveryError, GoldPriceError};
pub use pipeline::{Discovery, Outcome, Pipeline, PipelineState, Stage, MULTIPLE_SOURCES};
pub use record::{PriceRecord, Status};
pub use store::PriceLog;
pub use strategy::{
    Candidate, Extractor, MetaTag, PriceField, RangedScan, RateTable, ScriptPrice, TextWindow,
};
