use anyhow::{Context, Result};
use regex::Regex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

use crate::fetch::USER_AGENT;

pub const DEFAULT_SOURCES_FILE: &str = "Sources.tab.json";
pub const DEFAULT_WIKI_INDEX_URL: &str = "https://en.wikipedia.org/w/index.php";

const ROW_PATTERN: &str = r"\{\{Medical cases chart/Row\|(.*?)\|(.*?)\|(.*?)\|(.*?)\|";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// The `data` column of `Sources.tab.json`: `[code, page title]` pairs.
#[derive(Debug, Deserialize)]
struct SourceList {
    data: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSource {
    pub code: String,
    pub page: String,
}

/// One chart row: date, deaths, recoveries, active cases.
///
/// Serialized as a JSON array; cells that are not plain numbers become `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartRow(pub String, pub Option<u64>, pub Option<u64>, pub Option<u64>);

#[derive(Debug, Default)]
pub struct CopySummary {
    pub pages: usize,
    pub rows: usize,
    pub written: Vec<PathBuf>,
}

pub fn load_sources(path: &Path) -> Result<Vec<ChartSource>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read sources {:?}", path))?;
    let list: SourceList = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse sources {:?}", path))?;

    let code_pattern = Regex::new(r"^[A-Za-z0-9_-]+$")?;
    list.data
        .into_iter()
        .map(|(code, page)| {
            if !code_pattern.is_match(&code) {
                anyhow::bail!("'{}' is not usable as a chart file name", code);
            }
            Ok(ChartSource { code, page })
        })
        .collect()
}

/// Raw wikitext URL of `title` under an `index.php` endpoint.
pub fn page_url(index_url: &str, title: &str) -> Result<Url> {
    let mut url = Url::parse(index_url)
        .with_context(|| format!("Invalid wiki URL '{}'", index_url))?;
    url.query_pairs_mut()
        .append_pair("action", "raw")
        .append_pair("title", title);
    Ok(url)
}

fn cell(raw: &str) -> Option<u64> {
    raw.trim().replace(',', "").parse().ok()
}

/// Every `{{Medical cases chart/Row|...}}` in page order.
pub fn extract_rows(page: &str) -> Result<Vec<ChartRow>> {
    let row_pattern = Regex::new(ROW_PATTERN)?;
    Ok(row_pattern
        .captures_iter(page)
        .map(|caps| {
            ChartRow(
                caps[1].trim().to_string(),
                cell(&caps[2]),
                cell(&caps[3]),
                cell(&caps[4]),
            )
        })
        .collect())
}

pub fn chart_schema() -> Value {
    json!({
        "fields": [
            { "name": "date", "type": "string", "title": { "en": "Date" } },
            { "name": "deaths", "type": "number", "title": { "en": "Deaths" } },
            { "name": "recoveries", "type": "number", "title": { "en": "Recoveries" } },
            { "name": "cases", "type": "number", "title": { "en": "Active cases" } }
        ]
    })
}

pub fn chart_document(rows: &[ChartRow]) -> Value {
    json!({
        "schema": chart_schema(),
        "data": rows,
    })
}

/// Something that can return the raw wikitext of a page.
pub trait PageSource {
    fn fetch_page(&self, title: &str) -> Result<String>;
}

pub struct HttpPageSource {
    client: Client,
    index_url: String,
}

impl HttpPageSource {
    pub fn new(index_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            index_url: index_url.to_string(),
        })
    }
}

impl PageSource for HttpPageSource {
    fn fetch_page(&self, title: &str) -> Result<String> {
        let url = page_url(&self.index_url, title)?;
        debug!(action = "fetch", component = "chart_copy", url = %url, "Requesting page wikitext");

        let text = self
            .client
            .get(url)
            .send()?
            .error_for_status()
            .with_context(|| format!("Failed to fetch page '{}'", title))?
            .text()?;
        Ok(text)
    }
}

/// Copy the case chart of every listed page into `<code>.tab.json` under `out_dir`.
pub fn copy_charts<S: PageSource + ?Sized>(
    sources_path: &Path,
    out_dir: &Path,
    source: &S,
) -> Result<CopySummary> {
    let start_time = Instant::now();
    let sources = load_sources(sources_path)?;
    info!(action = "start", component = "chart_copy", source_count = sources.len(), "Copying case charts");

    let mut summary = CopySummary::default();
    for ChartSource { code, page } in &sources {
        info!(action = "fetch", component = "chart_copy", code = %code, page = %page, "Getting chart data");
        let text = source.fetch_page(page)?;
        let rows = extract_rows(&text)?;

        let dest = out_dir.join(format!("{}.tab.json", code));
        let contents = serde_json::to_string_pretty(&chart_document(&rows))?;
        fs::write(&dest, contents).with_context(|| format!("Failed to write {:?}", dest))?;
        debug!(action = "write", component = "chart_copy", file_path = ?dest, page_bytes = text.len(), row_count = rows.len(), "Wrote chart data");

        summary.pages += 1;
        summary.rows += rows.len();
        summary.written.push(dest);
    }

    info!(
        action = "complete",
        component = "chart_copy",
        pages = summary.pages,
        rows = summary.rows,
        duration_ms = start_time.elapsed().as_millis(),
        "Case charts copied"
    );
    Ok(summary)
}

pub fn print_copy_summary(summary: &CopySummary) {
    println!("\n--- Case chart copy ---");
    println!(
        "Pages: {}, rows: {}",
        crate::utils::format_number(summary.pages as u64),
        crate::utils::format_number(summary.rows as u64)
    );
    for path in &summary.written {
        println!("- {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const PAGE: &str = "\
{{Medical cases chart
|numwidth=mw
{{Medical cases chart/Row|2020-02-24|||2||||2|n.a.|}}
{{Medical cases chart/Row|2020-03-01|1|2|10||||13|+550%|}}
{{Medical cases chart/Row|2020-03-02|1|2|1,204||||1,207|=|}}
}}";

    struct FakePages(HashMap<String, String>);

    impl PageSource for FakePages {
        fn fetch_page(&self, title: &str) -> Result<String> {
            self.0
                .get(title)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no page {}", title))
        }
    }

    #[test]
    fn test_extract_rows() {
        let rows = extract_rows(PAGE).unwrap();

        assert_eq!(
            rows,
            vec![
                ChartRow("2020-02-24".to_string(), None, None, Some(2)),
                ChartRow("2020-03-01".to_string(), Some(1), Some(2), Some(10)),
                ChartRow("2020-03-02".to_string(), Some(1), Some(2), Some(1204)),
            ]
        );
    }

    #[test]
    fn test_page_without_chart_has_no_rows() {
        assert!(extract_rows("'''Nothing''' to see here.").unwrap().is_empty());
        // A row split over lines does not match.
        assert!(extract_rows("{{Medical cases chart/Row|2020-03-01|1\n|2|3|}}")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_chart_document_shape() {
        let rows = vec![ChartRow("2020-03-01".to_string(), Some(1), None, Some(10))];
        let doc = chart_document(&rows);

        assert_eq!(doc["data"], json!([["2020-03-01", 1, null, 10]]));
        let names: Vec<&str> = doc["schema"]["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["date", "deaths", "recoveries", "cases"]);
        assert_eq!(doc["schema"]["fields"][0]["type"], "string");
        assert_eq!(doc["schema"]["fields"][3]["title"]["en"], "Active cases");
    }

    #[test]
    fn test_page_url_encodes_title() {
        let url = page_url(DEFAULT_WIKI_INDEX_URL, "Template:COVID-19 pandemic data/Italy medical cases chart").unwrap();
        assert_eq!(
            url.as_str(),
            "https://en.wikipedia.org/w/index.php?action=raw&title=Template%3ACOVID-19+pandemic+data%2FItaly+medical+cases+chart"
        );
    }

    #[test]
    fn test_copy_charts_writes_one_file_per_source() {
        let dir = tempfile::tempdir().unwrap();
        let sources = dir.path().join(DEFAULT_SOURCES_FILE);
        fs::write(
            &sources,
            r#"{"data": [["IT", "Italy chart"], ["FR", "France chart"]]}"#,
        )
        .unwrap();
        let pages = FakePages(HashMap::from([
            ("Italy chart".to_string(), PAGE.to_string()),
            ("France chart".to_string(), "no rows".to_string()),
        ]));

        let summary = copy_charts(&sources, dir.path(), &pages).unwrap();

        assert_eq!(summary.pages, 2);
        assert_eq!(summary.rows, 3);
        let italy: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("IT.tab.json")).unwrap())
                .unwrap();
        assert_eq!(italy["data"][2], json!(["2020-03-02", 1, 2, 1204]));
        assert_eq!(italy["schema"], chart_schema());
        let france: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("FR.tab.json")).unwrap())
                .unwrap();
        assert_eq!(france["data"], json!([]));
    }

    #[test]
    fn test_source_code_must_be_a_plain_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let sources = dir.path().join(DEFAULT_SOURCES_FILE);
        fs::write(&sources, r#"{"data": [["../IT", "Italy chart"]]}"#).unwrap();

        assert!(load_sources(&sources).is_err());
    }

    #[test]
    fn test_failed_page_fetch_aborts_copy() {
        let dir = tempfile::tempdir().unwrap();
        let sources = dir.path().join(DEFAULT_SOURCES_FILE);
        fs::write(&sources, r#"{"data": [["IT", "Missing page"]]}"#).unwrap();

        assert!(copy_charts(&sources, dir.path(), &FakePages(HashMap::new())).is_err());
        assert!(!dir.path().join("IT.tab.json").exists());
    }
}
