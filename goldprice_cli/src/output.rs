use std::str::FromStr;

use goldprice_lib::PriceRecord;
use tabled::{Table, Tabled};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Plain,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "plain" => Ok(Self::Plain),
            other => Err(format!(
                "unknown output format '{}' (expected table, json or plain)",
                other
            )),
        }
    }
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Price (USD/oz)")]
    price: String,
    #[tabled(rename = "Change")]
    change: String,
    #[tabled(rename = "Change %")]
    percent_change: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn build_record_row(record: &PriceRecord) -> RecordRow {
    RecordRow {
        timestamp: record.timestamp.clone(),
        price: record.price.clone(),
        change: record.change.clone(),
        percent_change: record.percent_change.clone(),
        source: record.url.clone(),
        status: record.status.to_string(),
    }
}

fn plain_summary(record: &PriceRecord) -> String {
    format!(
        "Latest gold price: ${} at {} ({})",
        record.price, record.timestamp, record.status
    )
}

pub fn render(record: &PriceRecord, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => Table::new([build_record_row(record)]).to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(record)
            .unwrap_or_else(|e| format!("Failed to serialize to JSON: {}", e)),
        OutputFormat::Plain => plain_summary(record),
    }
}

pub fn print_record(record: &PriceRecord, format: &OutputFormat) {
    println!("{}", render(record, format));
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
