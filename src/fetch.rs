use chrono::{Days, NaiveDate};
use reqwest::blocking::Client;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::{MapError, Result};

pub const DEFAULT_REPORT_URL_TEMPLATE: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_daily_reports/{date}.csv";

pub const USER_AGENT: &str = concat!("covidmap/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Daily reports are named by US-style date.
pub fn report_url(template: &str, date: NaiveDate) -> String {
    template.replace("{date}", &date.format("%m-%d-%Y").to_string())
}

/// Something that can produce the raw daily report for a date.
pub trait ReportSource {
    /// `Ok(None)` when the report for `date` is not available.
    fn fetch(&self, date: NaiveDate) -> Result<Option<String>>;
}

pub struct HttpReportSource {
    client: Client,
    url_template: String,
}

impl HttpReportSource {
    pub fn new(url_template: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url_template: url_template.to_string(),
        })
    }
}

impl ReportSource for HttpReportSource {
    fn fetch(&self, date: NaiveDate) -> Result<Option<String>> {
        let url = report_url(&self.url_template, date);
        info!(action = "fetch", component = "report_fetch", url = %url, "Requesting daily report");

        let response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            warn!(action = "fetch", component = "report_fetch", url = %url, status = %response.status(), "Daily report not available");
            return Ok(None);
        }

        Ok(Some(response.text()?))
    }
}

/// Fetch the report for `today`, falling back once to the day before.
///
/// Returns the date whose report was used together with its text.
pub fn fetch_with_fallback<S: ReportSource + ?Sized>(
    source: &S,
    today: NaiveDate,
) -> Result<(NaiveDate, String)> {
    let start_time = Instant::now();

    if let Some(text) = source.fetch(today)? {
        info!(action = "complete", component = "report_fetch", date = %today, duration_ms = start_time.elapsed().as_millis(), "Fetched daily report");
        return Ok((today, text));
    }

    let yesterday = today - Days::new(1);

    if let Some(text) = source.fetch(yesterday)? {
        info!(action = "complete", component = "report_fetch", date = %yesterday, duration_ms = start_time.elapsed().as_millis(), "Fetched previous day's report");
        return Ok((yesterday, text));
    }

    Err(MapError::ResourceUnavailable {
        today: today.to_string(),
        yesterday: yesterday.to_string(),
    })
}
