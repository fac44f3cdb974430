use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

use crate::charts::{DEFAULT_SOURCES_FILE, DEFAULT_WIKI_INDEX_URL};
use crate::commons::DEFAULT_API_URL;
use crate::fetch::DEFAULT_REPORT_URL_TEMPLATE;

#[derive(Parser, Debug)]
#[command(
    name = "covidmap",
    about = "Colour an SVG world map by daily COVID-19 case counts and publish it",
    version,
    long_about = None
)]
pub struct Args {
    /// Report date (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Read the daily report from a local CSV instead of fetching it
    #[arg(short, long)]
    pub report: Option<PathBuf>,

    /// Use a local base map instead of downloading it
    #[arg(short, long)]
    pub base_map: Option<PathBuf>,

    /// Path to a custom country name to ISO code table
    #[arg(short, long)]
    pub iso_table: Option<PathBuf>,

    /// Where to write the composed map
    #[arg(short, long, default_value = "COVID-19_Outbreak_World_Map.svg")]
    pub output: PathBuf,

    /// Daily report URL, `{date}` is replaced by MM-DD-YYYY
    #[arg(long, default_value = DEFAULT_REPORT_URL_TEMPLATE)]
    pub data_url: String,

    /// MediaWiki API endpoint of the media repository
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Build the map but do not upload it
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Initialize iso_codes.csv with the default table
    #[arg(long)]
    pub init: bool,

    /// Copy the case charts listed in --sources into <code>.tab.json files instead of building the map
    #[arg(long)]
    pub copy_charts: bool,

    /// JSON table of [code, page title] pairs for --copy-charts
    #[arg(long, default_value = DEFAULT_SOURCES_FILE)]
    pub sources: PathBuf,

    /// Directory the copied charts are written to
    #[arg(long, default_value = ".")]
    pub charts_dir: PathBuf,

    /// index.php endpoint the chart pages are read from
    #[arg(long, default_value = DEFAULT_WIKI_INDEX_URL)]
    pub wiki_url: String,
}
