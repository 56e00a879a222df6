//! Append-only CSV log of price records.
//!
//! The header is written once, when the file is created or found empty.
//! Rows are appended with the filesystem's normal append semantics; there is
//! no locking, so concurrent writers must be serialized by the caller.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::GoldPriceError;
use crate::record::{PriceRecord, HEADER};

pub const DEFAULT_LOG_PATH: &str = "data/gold_prices.csv";

pub struct PriceLog {
    path: PathBuf,
}

impl PriceLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record, creating parent directories and the header row
    /// as needed.
    pub fn append(&self, record: &PriceRecord) -> Result<(), GoldPriceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let needs_header = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            wtr.write_record(HEADER)?;
        }
        wtr.write_record(record.fields())?;
        wtr.flush()?;

        tracing::debug!("Appended {} record to {}", record.status, self.path.display());
        Ok(())
    }

    /// Reads every data row back, header excluded.
    pub fn rows(&self) -> Result<Vec<Vec<String>>, GoldPriceError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;
        let mut out = Vec::new();
        for row in rdr.records() {
            let row = row?;
            out.push(row.iter().map(str::to_string).collect());
        }
        Ok(out)
    }
}
