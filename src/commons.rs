use reqwest::blocking::{multipart, Client};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

use crate::error::{MapError, Result};
use crate::fetch::USER_AGENT;

pub const DEFAULT_API_URL: &str = "https://commons.wikimedia.org/w/api.php";

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Minimal MediaWiki API client for the media repository the map lives in.
///
/// Keeps a cookie jar so a login carries over to later uploads.
pub struct CommonsClient {
    client: Client,
    api_url: Url,
}

impl CommonsClient {
    pub fn new(api_url: &str) -> Result<Self> {
        let api_url = Url::parse(api_url)
            .map_err(|e| MapError::Api(format!("Invalid API URL '{}': {}", api_url, e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()?;

        Ok(Self { client, api_url })
    }

    fn query(&self, params: &[(&str, &str)]) -> Result<Value> {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("format", "json")
            .append_pair("formatversion", "2");

        debug!(action = "request", component = "commons_api", url = %url, "GET");
        let value: Value = self.client.get(url).send()?.error_for_status()?.json()?;
        check_api_error(value)
    }

    fn token(&self, kind: &str) -> Result<String> {
        let value = self.query(&[("action", "query"), ("meta", "tokens"), ("type", kind)])?;
        let pointer = format!("/query/tokens/{}token", kind);
        value
            .pointer(&pointer)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| MapError::Api(format!("No {} token in response", kind)))
    }

    /// Direct download URL of a file page such as `File:BlankMap-World.svg`.
    pub fn file_url(&self, title: &str) -> Result<String> {
        let value = self.query(&[
            ("action", "query"),
            ("prop", "imageinfo"),
            ("iiprop", "url"),
            ("titles", title),
        ])?;
        file_url_from_response(&value, title)
    }

    pub fn download_file(&self, title: &str, dest: &Path) -> Result<()> {
        let start_time = Instant::now();
        let url = self.file_url(title)?;
        info!(action = "download", component = "commons_download", title = title, url = %url, "Downloading file");

        let bytes = self.client.get(&url).send()?.error_for_status()?.bytes()?;
        fs::write(dest, &bytes)?;

        info!(
            action = "complete",
            component = "commons_download",
            title = title,
            destination = ?dest,
            bytes = bytes.len(),
            duration_ms = start_time.elapsed().as_millis(),
            "File downloaded"
        );
        Ok(())
    }

    /// Log in with a bot password.
    pub fn login(&self, username: &str, password: &str) -> Result<()> {
        let login_token = self.token("login")?;
        let form = [
            ("action", "login"),
            ("lgname", username),
            ("lgpassword", password),
            ("lgtoken", login_token.as_str()),
            ("format", "json"),
        ];
        let value: Value = self
            .client
            .post(self.api_url.clone())
            .form(&form)
            .send()?
            .error_for_status()?
            .json()?;
        let value = check_api_error(value)?;

        match value.pointer("/login/result").and_then(Value::as_str) {
            Some("Success") => {
                info!(action = "login", component = "commons_api", username = username, "Logged in");
                Ok(())
            }
            other => Err(MapError::Api(format!(
                "Login failed: {}",
                other.unwrap_or("no result")
            ))),
        }
    }

    /// Upload `path` as `title`, replacing any previous version.
    pub fn upload_file(
        &self,
        path: &Path,
        title: &str,
        comment: &str,
        text: &str,
    ) -> Result<UploadOutcome> {
        let start_time = Instant::now();
        let csrf_token = self.token("csrf")?;
        let filename = title.strip_prefix("File:").unwrap_or(title);

        let form = multipart::Form::new()
            .text("action", "upload")
            .text("format", "json")
            .text("filename", filename.to_string())
            .text("comment", comment.to_string())
            .text("text", text.to_string())
            .text("ignorewarnings", "1")
            .text("token", csrf_token)
            .file("file", path)?;

        info!(action = "upload", component = "commons_upload", title = title, source = ?path, "Uploading file");
        let value: Value = self
            .client
            .post(self.api_url.clone())
            .multipart(form)
            .send()?
            .error_for_status()?
            .json()?;
        let outcome = upload_outcome(value, title)?;

        info!(
            action = "complete",
            component = "commons_upload",
            title = title,
            outcome = ?outcome,
            duration_ms = start_time.elapsed().as_millis(),
            "Upload finished"
        );
        Ok(outcome)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    /// The repository already holds a byte-identical latest version.
    Unchanged,
}

fn upload_outcome(value: Value, title: &str) -> Result<UploadOutcome> {
    if value.pointer("/error/code").and_then(Value::as_str) == Some("fileexists-no-change") {
        return Ok(UploadOutcome::Unchanged);
    }
    let value = check_api_error(value)?;

    match value.pointer("/upload/result").and_then(Value::as_str) {
        Some("Success") => Ok(UploadOutcome::Uploaded),
        other => Err(MapError::Api(format!(
            "Upload of {} did not succeed: {}",
            title,
            other.unwrap_or("no result")
        ))),
    }
}

fn check_api_error(value: Value) -> Result<Value> {
    match value.get("error") {
        Some(error) => {
            let code = error.get("code").and_then(Value::as_str).unwrap_or("unknown");
            let info = error.get("info").and_then(Value::as_str).unwrap_or("");
            Err(MapError::Api(format!("{}: {}", code, info)))
        }
        None => Ok(value),
    }
}

fn file_url_from_response(value: &Value, title: &str) -> Result<String> {
    let page = value
        .pointer("/query/pages/0")
        .ok_or_else(|| MapError::Api(format!("No page returned for {}", title)))?;

    if page.get("missing").is_some() {
        return Err(MapError::Api(format!("{} does not exist", title)));
    }

    page.pointer("/imageinfo/0/url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| MapError::Api(format!("No file URL for {}", title)))
}
