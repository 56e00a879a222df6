//! Run configuration: which stages to try, their bands, the request
//! timeout, the log path, and the timestamp zone.
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file
//! at all) runs the built-in multi-source preset.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::FixedOffset;
use goldprice_api::{Client, Endpoint, PayloadFormat, DEFAULT_TIMEOUT_SECS};
use serde::Deserialize;
use thiserror::Error;

use crate::band::PlausibilityBand;
use crate::error::GoldPriceError;
use crate::pipeline::{Pipeline, Stage};
use crate::store::DEFAULT_LOG_PATH;
use crate::strategy::{Extractor, MetaTag, PriceField, RangedScan, RateTable, ScriptPrice, TextWindow};

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV: &str = "GOLDPRICE_CONFIG";

pub const MIN_TIMEOUT_SECS: u64 = 10;
pub const MAX_TIMEOUT_SECS: u64 = 15;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Built-in stage lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// goldprice.org only, four in-page strategies.
    SinglePage,
    /// Four independent sources tried in sequence.
    #[default]
    MultiSource,
}

impl Preset {
    pub fn sources(self) -> Vec<SourceConfig> {
        match self {
            Self::SinglePage => vec![SourceConfig {
                id: "goldprice.org".into(),
                url: "https://goldprice.org".into(),
                format: SourceFormat::Html,
                band: None,
                strategies: vec![
                    StrategyConfig::MetaTag {
                        keyword: default_keyword(),
                    },
                    StrategyConfig::ScriptPrice,
                    StrategyConfig::TextWindow {
                        keywords: default_keywords(),
                        radius: default_radius(),
                    },
                    StrategyConfig::RangedScan,
                ],
            }],
            Self::MultiSource => vec![
                SourceConfig {
                    id: "open.er-api.com".into(),
                    url: "https://open.er-api.com/v6/latest/USD".into(),
                    format: SourceFormat::Json,
                    band: None,
                    strategies: vec![StrategyConfig::RateTable {
                        rate: "/rates/XAU".into(),
                    }],
                },
                SourceConfig {
                    id: "data-asg.goldprice.org".into(),
                    url: "https://data-asg.goldprice.org/dbXRates/USD".into(),
                    format: SourceFormat::Json,
                    band: None,
                    strategies: vec![StrategyConfig::PriceField {
                        price: "/items/0/xauPrice".into(),
                        change: Some("/items/0/chgXau".into()),
                        percent_change: Some("/items/0/pcXau".into()),
                    }],
                },
                SourceConfig {
                    id: "gold-api.com".into(),
                    url: "https://api.gold-api.com/price/XAU".into(),
                    format: SourceFormat::Json,
                    band: None,
                    strategies: vec![StrategyConfig::PriceField {
                        price: "/price".into(),
                        change: None,
                        percent_change: None,
                    }],
                },
                SourceConfig {
                    id: "kitco.com".into(),
                    url: "https://www.kitco.com/charts/livegold.html".into(),
                    format: SourceFormat::Html,
                    band: None,
                    strategies: vec![StrategyConfig::RangedScan],
                },
            ],
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single-page" => Ok(Self::SinglePage),
            "multi-source" => Ok(Self::MultiSource),
            other => Err(format!(
                "unknown preset '{}' (expected single-page or multi-source)",
                other
            )),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SinglePage => write!(f, "single-page"),
            Self::MultiSource => write!(f, "multi-source"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Html,
    Json,
}

impl From<SourceFormat> for PayloadFormat {
    fn from(f: SourceFormat) -> Self {
        match f {
            SourceFormat::Html => PayloadFormat::Html,
            SourceFormat::Json => PayloadFormat::Json,
        }
    }
}

/// One `[[sources]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub id: String,
    pub url: String,
    pub format: SourceFormat,
    /// Overrides the top-level band for this source.
    #[serde(default)]
    pub band: Option<PlausibilityBand>,
    pub strategies: Vec<StrategyConfig>,
}

/// A strategy entry, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    RateTable {
        rate: String,
    },
    PriceField {
        price: String,
        #[serde(default)]
        change: Option<String>,
        #[serde(default)]
        percent_change: Option<String>,
    },
    MetaTag {
        #[serde(default = "default_keyword")]
        keyword: String,
    },
    ScriptPrice,
    TextWindow {
        #[serde(default = "default_keywords")]
        keywords: Vec<String>,
        #[serde(default = "default_radius")]
        radius: usize,
    },
    RangedScan,
}

fn default_keyword() -> String {
    "gold".into()
}

fn default_keywords() -> Vec<String> {
    vec!["gold".into(), "usd".into()]
}

fn default_radius() -> usize {
    TextWindow::DEFAULT_RADIUS
}

impl StrategyConfig {
    fn accepts(&self, format: SourceFormat) -> bool {
        match self {
            Self::RateTable { .. } | Self::PriceField { .. } => format == SourceFormat::Json,
            _ => format == SourceFormat::Html,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::RateTable { .. } => "rate_table",
            Self::PriceField { .. } => "price_field",
            Self::MetaTag { .. } => "meta_tag",
            Self::ScriptPrice => "script_price",
            Self::TextWindow { .. } => "text_window",
            Self::RangedScan => "ranged_scan",
        }
    }

    fn build(&self, band: PlausibilityBand) -> Box<dyn Extractor> {
        match self {
            Self::RateTable { rate } => Box::new(RateTable::new(rate)),
            Self::PriceField {
                price,
                change,
                percent_change,
            } => Box::new(PriceField {
                price: price.clone(),
                change: change.clone(),
                percent_change: percent_change.clone(),
            }),
            Self::MetaTag { keyword } => Box::new(MetaTag::new(keyword)),
            Self::ScriptPrice => Box::new(ScriptPrice),
            Self::TextWindow { keywords, radius } => Box::new(TextWindow::new(keywords.as_slice(), *radius)),
            Self::RangedScan => Box::new(RangedScan::new(band)),
        }
    }

    fn pointers(&self) -> Vec<&str> {
        match self {
            Self::RateTable { rate } => vec![rate.as_str()],
            Self::PriceField {
                price,
                change,
                percent_change,
            } => std::iter::once(price.as_str())
                .chain(change.as_deref())
                .chain(percent_change.as_deref())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub preset: Preset,
    pub log_path: PathBuf,
    pub timeout_secs: u64,
    pub utc_offset_hours: i32,
    pub band: PlausibilityBand,
    /// When non-empty, replaces the preset's stage list.
    pub sources: Vec<SourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preset: Preset::default(),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            utc_offset_hours: 0,
            band: PlausibilityBand::default(),
            sources: Vec::new(),
        }
    }
}

impl Config {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads from `path`, else from the file named by `GOLDPRICE_CONFIG`,
    /// else returns validated defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        match resolved {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Read { path, source })?;
                Self::from_toml_str(&text)
            }
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// The configured sources, or the preset's when none are listed.
    pub fn source_configs(&self) -> Vec<SourceConfig> {
        if self.sources.is_empty() {
            self.preset.sources()
        } else {
            self.sources.clone()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "utc_offset_hours {} is out of range",
                    self.utc_offset_hours
                ))
            })
    }

    /// Identifier to record when the run fails before discovery: the single
    /// configured URL, or the multiple-sources marker.
    pub fn source_label(&self) -> String {
        match self.source_configs().as_slice() {
            [only] => Endpoint::new(&only.id, &only.url, only.format.into())
                .map(|ep| ep.url().to_string())
                .unwrap_or_else(|_| only.url.clone()),
            _ => crate::pipeline::MULTIPLE_SOURCES.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&self.timeout_secs) {
            return Err(ConfigError::Invalid(format!(
                "timeout_secs must be between {} and {}, got {}",
                MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS, self.timeout_secs
            )));
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_hours must be between -12 and 14, got {}",
                self.utc_offset_hours
            )));
        }
        check_band("band", &self.band)?;

        let sources = self.source_configs();
        if sources.is_empty() {
            return Err(ConfigError::Invalid("no sources configured".into()));
        }
        for source in &sources {
            validate_source(source)?;
        }
        Ok(())
    }

    /// Builds the ordered stage list.
    pub fn stages(&self) -> Result<Vec<Stage>, ConfigError> {
        self.validate()?;
        self.source_configs()
            .iter()
            .map(|source| {
                let endpoint = Endpoint::new(&source.id, &source.url, source.format.into())
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?;
                let band = source.band.unwrap_or(self.band);
                let stage = source
                    .strategies
                    .iter()
                    .fold(Stage::new(endpoint).with_band(band), |stage, s| {
                        stage.with_boxed_strategy(s.build(band))
                    });
                Ok(stage)
            })
            .collect()
    }

    /// Builds the client and stages for one run.
    pub fn build_pipeline(&self) -> Result<Pipeline, GoldPriceError> {
        let stages = self.stages()?;
        let client = Client::new(self.timeout())?;
        Ok(Pipeline::new(client, stages))
    }
}

fn check_band(label: &str, band: &PlausibilityBand) -> Result<(), ConfigError> {
    if band.is_valid() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{} must satisfy 0 < min < max, got {}-{}",
            label, band.min, band.max
        )))
    }
}

fn validate_source(source: &SourceConfig) -> Result<(), ConfigError> {
    if source.id.trim().is_empty() {
        return Err(ConfigError::Invalid("source id must not be empty".into()));
    }
    Endpoint::new(&source.id, &source.url, source.format.into())
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    if let Some(band) = &source.band {
        check_band(&format!("band of source '{}'", source.id), band)?;
    }
    if source.strategies.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "source '{}' has no strategies",
            source.id
        )));
    }
    for strategy in &source.strategies {
        if !strategy.accepts(source.format) {
            return Err(ConfigError::Invalid(format!(
                "strategy '{}' cannot read {:?} source '{}'",
                strategy.kind(),
                source.format,
                source.id
            )));
        }
        if let Some(bad) = strategy.pointers().into_iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid(format!(
                "JSON pointer '{}' in source '{}' must start with '/'",
                bad, source.id
            )));
        }
        if let StrategyConfig::TextWindow { keywords, .. } = strategy {
            if keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "text_window in source '{}' needs at least one keyword",
                    source.id
                )));
            }
        }
    }
    Ok(())
}
