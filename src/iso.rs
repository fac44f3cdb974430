use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::MapError;

// Include the default name -> ISO code table at compile time
const DEFAULT_TABLE_BYTES: &[u8] = include_bytes!("../data/iso_codes.csv");

pub const DEFAULT_TABLE_FILE: &str = "iso_codes.csv";

/// Immutable mapping from a country/region name, exactly as it appears in the
/// daily report, to its two-letter ISO code.
///
/// An empty code marks an entity that is known but has no code of its own
/// (cruise ships and the like).
#[derive(Debug, Clone, Default)]
pub struct IsoTable {
    codes: HashMap<String, String>,
}

impl IsoTable {
    pub fn from_entries<I, N, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, C)>,
        N: Into<String>,
        C: Into<String>,
    {
        Self {
            codes: entries
                .into_iter()
                .map(|(name, code)| (name.into(), code.into()))
                .collect(),
        }
    }

    /// Exact-match lookup. `Some("")` is a known entity without a code,
    /// `None` an unmapped name.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.codes.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct IsoEntry {
    name: String,
    #[serde(default)]
    code: String,
}

/// Parse `name,code` rows. In strict mode the first bad row aborts the load,
/// otherwise it is logged and skipped.
fn parse_table(content: &str, strict: bool, component: &str) -> Result<IsoTable> {
    let code_pattern = Regex::new(r"^(?:[A-Z]{2})?$")?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();

    let mut codes = HashMap::new();
    for result in reader.records() {
        let outcome = result
            .map_err(|e| (e.position().map_or(0, |p| p.line()), e.to_string()))
            .and_then(|record| {
                let line = record.position().map_or(0, |p| p.line());
                let entry: IsoEntry = record
                    .deserialize(Some(&headers))
                    .map_err(|e| (line, e.to_string()))?;
                if !code_pattern.is_match(&entry.code) {
                    return Err((
                        line,
                        format!("'{}' is not a two-letter upper-case code", entry.code),
                    ));
                }
                if codes.contains_key(&entry.name) {
                    return Err((line, format!("duplicate name '{}'", entry.name)));
                }
                codes.insert(entry.name, entry.code);
                Ok(())
            });

        if let Err((line, message)) = outcome {
            if strict {
                return Err(MapError::InvalidTable { line, message }.into());
            }
            warn!(action = "parse", component = component, line_number = line, error = %message, "Skipping invalid ISO table row");
        }
    }

    Ok(IsoTable { codes })
}

pub fn load_iso_table(table_file_path: Option<&Path>) -> Result<IsoTable> {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "iso_table_loading",
        "Starting ISO table loading"
    );

    let mut table = IsoTable::default();

    if let Some(path) = table_file_path {
        info!(action = "load", component = "iso_table_file", file_path = ?path, "Loading ISO table from specified file");
        if !path.exists() {
            anyhow::bail!("ISO table file not found: {:?}", path);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read ISO table {:?}", path))?;
        table = parse_table(&content, true, "iso_table_file")?;
        info!(action = "loaded", component = "iso_table_file", entry_count = table.len(), file_path = ?path, "Loaded ISO table from file");
    } else {
        let default_file = Path::new(DEFAULT_TABLE_FILE);
        if default_file.exists() {
            info!(action = "load", component = "default_iso_table_file", file_path = ?default_file, "Loading ISO table from default file");
            let content = fs::read_to_string(default_file)?;
            table = parse_table(&content, false, "default_iso_table_file")?;
            info!(action = "loaded", component = "default_iso_table_file", entry_count = table.len(), file_path = ?default_file, "Loaded ISO table from default file");
        }

        if table.is_empty() {
            info!(
                action = "load",
                component = "embedded_iso_table",
                "Using embedded default ISO table"
            );
            table = embedded_table()?;
            info!(
                action = "loaded",
                component = "embedded_iso_table",
                entry_count = table.len(),
                "Loaded ISO table from embedded defaults"
            );
        }
    }

    let load_time = start_time.elapsed();
    info!(
        action = "complete",
        component = "iso_table_loading",
        entry_count = table.len(),
        duration_ms = load_time.as_millis(),
        "ISO table ready"
    );
    Ok(table)
}

pub fn embedded_table() -> Result<IsoTable> {
    let content = std::str::from_utf8(DEFAULT_TABLE_BYTES)
        .context("Failed to decode embedded ISO table")?;
    parse_table(content, true, "embedded_iso_table")
}

pub fn init_default_table() -> Result<()> {
    let default_file = Path::new(DEFAULT_TABLE_FILE);

    if default_file.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first if you want to reinitialize.",
            DEFAULT_TABLE_FILE
        );
    }

    let default_content = std::str::from_utf8(DEFAULT_TABLE_BYTES)
        .context("Failed to decode embedded ISO table")?;

    fs::write(default_file, default_content)?;
    println!("Created {} with the default ISO table", DEFAULT_TABLE_FILE);

    Ok(())
}
