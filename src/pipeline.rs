use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::aggregate::{self, CountryAggregate};
use crate::band::{self, Band, ClassMap};
use crate::commons::{CommonsClient, UploadOutcome};
use crate::error::MapError;
use crate::fetch::{self, HttpReportSource};
use crate::iso::{self, IsoTable};
use crate::{compose, report, style, Args};

pub const WORLD_MAP_TEMPLATE: &str = "File:BlankMap-World.svg";
pub const WORLD_MAP_FILE: &str = "BlankMap-World.svg";
pub const WORLD_CASE_MAP_TITLE: &str = "File:COVID-19 Outbreak World Map.svg";

pub const USERNAME_VAR: &str = "COMMONS_USERNAME";
pub const PASSWORD_VAR: &str = "COMMONS_PASSWORD";

const UPLOAD_DESCRIPTION: &str = "=={{int:filedesc}}==
{{Information
|description={{en|1=Map of confirmed COVID-19 cases per country, from the daily reports of the Johns Hopkins CSSE.}}
|source={{Derived from|BlankMap-World.svg}}
|author=COVID-19 Data Bot
}}

=={{int:license-header}}==
{{self|cc0}}

[[Category:COVID-19 pandemic maps]]";

/// Everything a single run derives from the report and the base map.
#[derive(Debug)]
pub struct MapOutput {
    pub aggregate: CountryAggregate,
    pub classes: ClassMap,
    pub stylesheet: String,
    pub document: String,
}

#[derive(Debug)]
pub struct RunSummary {
    pub report_date: NaiveDate,
    pub output_path: PathBuf,
    pub map: MapOutput,
    /// `None` on a dry run.
    pub upload: Option<UploadOutcome>,
}

/// Parse, aggregate, classify, style and compose. No I/O.
pub fn build_map(
    report_text: &str,
    base_document: &str,
    table: &IsoTable,
) -> std::result::Result<MapOutput, MapError> {
    let records = report::parse_daily_report(report_text)?;
    let aggregate = aggregate::aggregate(&records, table);
    let classes = band::classify(&aggregate);
    let stylesheet = style::generate(&classes);
    let document = compose::compose(base_document, &stylesheet)?;

    Ok(MapOutput {
        aggregate,
        classes,
        stylesheet,
        document,
    })
}

fn load_base_map(args: &Args, commons: &CommonsClient) -> Result<String> {
    let path = match &args.base_map {
        Some(path) => path.clone(),
        None => {
            let dest = PathBuf::from(WORLD_MAP_FILE);
            commons
                .download_file(WORLD_MAP_TEMPLATE, &dest)
                .with_context(|| format!("Failed to download {}", WORLD_MAP_TEMPLATE))?;
            dest
        }
    };

    fs::read_to_string(&path).with_context(|| format!("Failed to read base map {:?}", path))
}

fn load_report(args: &Args, today: NaiveDate) -> Result<(NaiveDate, String)> {
    if let Some(path) = &args.report {
        info!(action = "load", component = "report_file", file_path = ?path, "Reading daily report from file");
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read report {:?}", path))?;
        return Ok((today, text));
    }

    let source = HttpReportSource::new(&args.data_url)?;
    Ok(fetch::fetch_with_fallback(&source, today)?)
}

fn credentials() -> Result<(String, String)> {
    let username =
        std::env::var(USERNAME_VAR).with_context(|| format!("{} is not set", USERNAME_VAR))?;
    let password =
        std::env::var(PASSWORD_VAR).with_context(|| format!("{} is not set", PASSWORD_VAR))?;
    Ok((username, password))
}

fn publish(
    commons: &CommonsClient,
    output: &Path,
    report_date: NaiveDate,
) -> Result<UploadOutcome> {
    let (username, password) = credentials()?;
    commons.login(&username, &password)?;

    let comment = format!("Update with case data for {}", report_date);
    let outcome = commons
        .upload_file(output, WORLD_CASE_MAP_TITLE, &comment, UPLOAD_DESCRIPTION)
        .with_context(|| format!("Failed to upload {}", WORLD_CASE_MAP_TITLE))?;
    if outcome == UploadOutcome::Unchanged {
        info!(action = "skip", component = "commons_upload", title = WORLD_CASE_MAP_TITLE, "Map identical to the published version");
    }
    Ok(outcome)
}

pub fn run(args: &Args) -> Result<RunSummary> {
    let total_start_time = Instant::now();
    info!(action = "start", component = "map_update", "Starting world case map update");

    let table = iso::load_iso_table(args.iso_table.as_deref())?;
    let commons = CommonsClient::new(&args.api_url)?;

    let base_document = load_base_map(args, &commons)?;
    let today = args.date.unwrap_or_else(|| Local::now().date_naive());
    let (report_date, report_text) = load_report(args, today)?;

    let map = build_map(&report_text, &base_document, &table)?;

    // Written only once the whole document exists. A failed upload keeps it.
    fs::write(&args.output, &map.document)
        .with_context(|| format!("Failed to write {:?}", args.output))?;
    info!(action = "write", component = "map_update", file_path = ?args.output, bytes = map.document.len(), "Wrote composed map");

    let upload = if args.dry_run {
        info!(action = "skip", component = "commons_upload", "Dry run, not uploading");
        None
    } else {
        Some(publish(&commons, &args.output, report_date)?)
    };

    info!(
        action = "complete",
        component = "map_update",
        report_date = %report_date,
        country_count = map.aggregate.len(),
        duration_ms = total_start_time.elapsed().as_millis(),
        "World case map update completed"
    );

    Ok(RunSummary {
        report_date,
        output_path: args.output.clone(),
        map,
        upload,
    })
}

pub fn print_summary(summary: &RunSummary) {
    let map = &summary.map;
    let total = map.aggregate.total();

    println!("\n--- COVID-19 World Map for {} ---", summary.report_date);
    println!(
        "Countries with data: {}",
        crate::utils::format_number(map.aggregate.len() as u64)
    );
    println!(
        "Confirmed: {}, deaths: {}, recovered: {}",
        crate::utils::format_number(total.confirmed),
        crate::utils::format_number(total.deaths),
        crate::utils::format_number(total.recovered)
    );
    println!(
        "Rows dropped (unmapped name): {}, (no ISO code): {}",
        crate::utils::format_number(map.aggregate.unmapped_rows as u64),
        crate::utils::format_number(map.aggregate.codeless_rows as u64)
    );
    println!(
        "Sub-national rows folded: {}",
        crate::utils::format_number(map.aggregate.sub_national_rows as u64)
    );

    println!("\nCountries per band:");
    for band in Band::ALL {
        println!("- {}: {}", band, map.classes.count(band));
    }

    println!("\nMap written to {}", summary.output_path.display());
    match summary.upload {
        Some(UploadOutcome::Uploaded) => println!("Uploaded as {}", WORLD_CASE_MAP_TITLE),
        Some(UploadOutcome::Unchanged) => {
            println!("{} already up to date", WORLD_CASE_MAP_TITLE)
        }
        None => {}
    }
}
