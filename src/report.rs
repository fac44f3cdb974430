use serde::{Deserialize, Deserializer};
use std::time::Instant;
use tracing::info;

use crate::error::{MapError, Result};

/// One row of a daily report.
///
/// Text fields are kept verbatim so the country name is matched exactly as
/// published; only the counts tolerate surrounding whitespace. Sub-national
/// qualifiers are logged and counted but aggregation keys on the resolved
/// country code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CountryRecord {
    #[serde(rename = "FIPS", default)]
    pub fips: Option<String>,
    #[serde(rename = "Admin2", default)]
    pub admin2: Option<String>,
    #[serde(rename = "Province_State", alias = "Province/State", default)]
    pub province_state: Option<String>,
    #[serde(rename = "Country_Region", alias = "Country/Region")]
    pub country_region: String,
    #[serde(rename = "Confirmed", deserialize_with = "trimmed_count")]
    pub confirmed: u64,
    #[serde(rename = "Deaths", deserialize_with = "trimmed_count")]
    pub deaths: u64,
    #[serde(rename = "Recovered", deserialize_with = "trimmed_count")]
    pub recovered: u64,
}

impl CountryRecord {
    pub fn new(country_region: &str, confirmed: u64, deaths: u64, recovered: u64) -> Self {
        Self {
            fips: None,
            admin2: None,
            province_state: None,
            country_region: country_region.to_string(),
            confirmed,
            deaths,
            recovered,
        }
    }

    pub fn with_province(mut self, province_state: &str) -> Self {
        self.province_state = Some(province_state.to_string());
        self
    }

    pub fn is_sub_national(&self) -> bool {
        self.fips.is_some() || self.admin2.is_some() || self.province_state.is_some()
    }
}

/// Parse the CSV text of a daily report.
///
/// Any row whose counts are not non-negative integers fails the whole parse;
/// no partial record list is returned.
pub fn parse_daily_report(text: &str) -> Result<Vec<CountryRecord>> {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "report_parsing",
        bytes = text.len(),
        "Parsing daily report"
    );

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());
    let headers = reader.headers().map_err(malformed)?.clone();

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(malformed)?;
        let line = row.position().map_or(0, |p| p.line());
        let record: CountryRecord = row
            .deserialize(Some(&headers))
            .map_err(|e| MapError::MalformedRecord {
                line,
                message: e.to_string(),
            })?;
        records.push(record);
    }

    info!(
        action = "complete",
        component = "report_parsing",
        record_count = records.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Parsed daily report"
    );
    Ok(records)
}

fn trimmed_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.trim()
        .parse()
        .map_err(|e| serde::de::Error::custom(format!("invalid count '{}': {}", raw, e)))
}

fn malformed(e: csv::Error) -> MapError {
    MapError::MalformedRecord {
        line: e.position().map_or(0, |p| p.line()),
        message: e.to_string(),
    }
}
