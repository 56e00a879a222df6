//! One discovery pass: resolve config, run the pipeline, build the record.
//!
//! Anything that stops the pass early becomes an `error: ...` record rather
//! than a crash, so a scheduler always gets a row in the log.

use std::path::PathBuf;

use chrono::{FixedOffset, Offset, Utc};
use goldprice_lib::record::capture_time;
use goldprice_lib::{Config, ConfigError, GoldPriceError, Preset, PriceRecord};

/// Command-line overrides applied on top of the loaded config.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub preset: Option<Preset>,
    pub log: Option<PathBuf>,
}

/// The record for this pass and where it should be appended.
pub struct Pass {
    pub record: PriceRecord,
    pub log_path: PathBuf,
}

pub fn resolve_config(overrides: &Overrides) -> Result<Config, ConfigError> {
    let mut config = Config::load(overrides.config.as_deref())?;
    if let Some(preset) = overrides.preset {
        config.preset = preset;
        if !config.sources.is_empty() {
            tracing::warn!("--preset {} ignored: config lists explicit sources", preset);
        }
    }
    if let Some(log) = &overrides.log {
        config.log_path = log.clone();
    }
    Ok(config)
}

pub async fn run_pass(overrides: &Overrides) -> Pass {
    let config = match resolve_config(overrides) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            let fallback = fallback_config(overrides);
            return Pass {
                record: PriceRecord::from_error(
                    &e.to_string(),
                    &fallback.source_label(),
                    capture_time(utc()),
                ),
                log_path: fallback.log_path,
            };
        }
    };

    let record = match discover(&config).await {
        Ok(record) => record,
        Err(e) => {
            tracing::error!("{}", e);
            let offset = config.offset().unwrap_or_else(|_| utc());
            PriceRecord::from_error(&e.to_string(), &config.source_label(), capture_time(offset))
        }
    };
    Pass {
        record,
        log_path: config.log_path,
    }
}

async fn discover(config: &Config) -> Result<PriceRecord, GoldPriceError> {
    let offset = config.offset()?;
    let pipeline = config.build_pipeline()?;
    tracing::info!(
        "Trying {} source(s) with preset {}",
        pipeline.stages().len(),
        config.preset
    );
    let discovery = pipeline.run().await;
    Ok(PriceRecord::from_discovery(&discovery, capture_time(offset)))
}

/// Defaults plus the command-line overrides, used to label and place the
/// error record when the real config could not be loaded.
fn fallback_config(overrides: &Overrides) -> Config {
    let mut config = Config::default();
    if let Some(preset) = overrides.preset {
        config.preset = preset;
    }
    if let Some(log) = &overrides.log {
        config.log_path = log.clone();
    }
    config
}

fn utc() -> FixedOffset {
    Utc.fix()
}
