//! Extraction strategies: turn one raw payload into a candidate price.
//!
//! Every strategy answers the same question with a different technique,
//! from the most reliable (a structured API field) to the least (the first
//! in-range numeral anywhere on the page). A stage holds its strategies in
//! fallback order and the pipeline stops at the first candidate that
//! validates.

use std::fmt;
use std::sync::LazyLock;

use goldprice_api::RawPayload;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::band::PlausibilityBand;
use crate::numeral::{
    parse_price, round_cents, standalone_prices, GROUPED_PRICE, LOOSE_PRICE, SCRIPT_PRICE,
};

static META_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").expect("valid meta selector"));
static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("valid script selector"));

/// An unvalidated price pulled out of a payload, with whatever adjacent
/// change figures the source exposed. Missing figures stay `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub price: f64,
    pub change: Option<f64>,
    pub percent_change: Option<f64>,
}

impl Candidate {
    pub fn price_only(price: f64) -> Self {
        Self {
            price,
            change: None,
            percent_change: None,
        }
    }
}

/// One technique for locating a price in a payload.
///
/// Implementations return `None` when the payload is of the wrong kind or
/// holds nothing price-shaped; they never fail.
pub trait Extractor: Send + Sync + fmt::Debug {
    /// Short identifier used in logs and attempt reports.
    fn name(&self) -> &'static str;

    fn extract(&self, payload: &RawPayload) -> Option<Candidate>;
}

// -- Structured JSON lookups --

/// Reads an exchange rate quoted as ounces per currency unit and inverts it:
/// `{"rates": {"XAU": 0.0004}}` is 2500.00 per ounce.
#[derive(Debug, Clone)]
pub struct RateTable {
    /// JSON pointer to the rate, e.g. `/rates/XAU`.
    pub rate: String,
}

impl RateTable {
    pub fn new(rate: &str) -> Self {
        Self {
            rate: rate.to_string(),
        }
    }
}

impl Extractor for RateTable {
    fn name(&self) -> &'static str {
        "rate_table"
    }

    fn extract(&self, payload: &RawPayload) -> Option<Candidate> {
        let value = payload.as_json()?.pointer(&self.rate)?;
        let rate = json_number(value)?;
        if rate <= 0.0 {
            return None;
        }
        let price = round_cents(1.0 / rate);
        price.is_finite().then(|| Candidate::price_only(price))
    }
}

/// Reads a direct price field plus optional change and percent-change
/// fields next to it.
#[derive(Debug, Clone)]
pub struct PriceField {
    pub price: String,
    pub change: Option<String>,
    pub percent_change: Option<String>,
}

impl PriceField {
    pub fn new(price: &str) -> Self {
        Self {
            price: price.to_string(),
            change: None,
            percent_change: None,
        }
    }

    pub fn with_change(mut self, change: &str, percent_change: &str) -> Self {
        self.change = Some(change.to_string());
        self.percent_change = Some(percent_change.to_string());
        self
    }
}

impl Extractor for PriceField {
    fn name(&self) -> &'static str {
        "price_field"
    }

    fn extract(&self, payload: &RawPayload) -> Option<Candidate> {
        let json = payload.as_json()?;
        let price = json.pointer(&self.price).and_then(json_number)?;
        let lookup = |pointer: &Option<String>| {
            pointer
                .as_deref()
                .and_then(|p| json.pointer(p))
                .and_then(json_number)
        };
        Some(Candidate {
            price,
            change: lookup(&self.change),
            percent_change: lookup(&self.percent_change),
        })
    }
}

fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_price(s),
        _ => None,
    }
}

// -- HTML scans --

/// Scans `<meta content="...">` entries for one that mentions the keyword
/// and carries a price-shaped numeral.
#[derive(Debug, Clone)]
pub struct MetaTag {
    keyword: String,
}

impl MetaTag {
    pub fn new(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_lowercase(),
        }
    }
}

impl Extractor for MetaTag {
    fn name(&self) -> &'static str {
        "meta_tag"
    }

    fn extract(&self, payload: &RawPayload) -> Option<Candidate> {
        let doc = Html::parse_document(payload.as_html()?);
        doc.select(&META_SELECTOR)
            .filter_map(|meta| meta.value().attr("content"))
            .filter(|content| content.to_lowercase().contains(&self.keyword))
            .find_map(|content| first_price(&LOOSE_PRICE, content))
            .map(Candidate::price_only)
    }
}

/// Scans `<script>` bodies for a `"price": 2,345.67` style key.
#[derive(Debug, Clone, Default)]
pub struct ScriptPrice;

impl Extractor for ScriptPrice {
    fn name(&self) -> &'static str {
        "script_price"
    }

    fn extract(&self, payload: &RawPayload) -> Option<Candidate> {
        let doc = Html::parse_document(payload.as_html()?);
        doc.select(&SCRIPT_SELECTOR)
            .map(|script| script.text().collect::<String>())
            .find_map(|text| first_price(&SCRIPT_PRICE, &text))
            .map(Candidate::price_only)
    }
}

/// Searches a window of lines around each line that mentions one of the
/// keywords. The first hit in document order wins.
#[derive(Debug, Clone)]
pub struct TextWindow {
    keywords: Vec<String>,
    radius: usize,
}

impl TextWindow {
    pub const DEFAULT_RADIUS: usize = 2;

    pub fn new<S: AsRef<str>>(keywords: &[S], radius: usize) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.as_ref().to_lowercase()).collect(),
            radius,
        }
    }
}

impl Extractor for TextWindow {
    fn name(&self) -> &'static str {
        "text_window"
    }

    fn extract(&self, payload: &RawPayload) -> Option<Candidate> {
        let text = page_text(payload.as_html()?);
        let lines: Vec<&str> = text.split('\n').collect();

        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| {
                let lower = line.to_lowercase();
                self.keywords.iter().any(|k| lower.contains(k.as_str()))
            })
            .find_map(|(i, _)| {
                let start = i.saturating_sub(self.radius);
                let end = (i + self.radius + 1).min(lines.len());
                let window = lines[start..end].join(" ");
                first_price(&GROUPED_PRICE, &window)
            })
            .map(Candidate::price_only)
    }
}

/// Last resort: the first grouped numeral anywhere in the page text whose
/// value lies inside the band.
#[derive(Debug, Clone)]
pub struct RangedScan {
    band: PlausibilityBand,
}

impl RangedScan {
    pub fn new(band: PlausibilityBand) -> Self {
        Self { band }
    }
}

impl Extractor for RangedScan {
    fn name(&self) -> &'static str {
        "ranged_scan"
    }

    fn extract(&self, payload: &RawPayload) -> Option<Candidate> {
        let text = page_text(payload.as_html()?);
        let found = standalone_prices(&GROUPED_PRICE, &text)
            .find(|value| self.band.contains(*value))
            .map(Candidate::price_only);
        found
    }
}

/// All text nodes of the document concatenated, script and style bodies
/// included, line structure preserved.
fn page_text(html: &str) -> String {
    Html::parse_document(html).root_element().text().collect()
}

fn first_price(pattern: &regex::Regex, haystack: &str) -> Option<f64> {
    standalone_prices(pattern, haystack).next()
}
