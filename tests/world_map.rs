use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use covidmap::iso::embedded_table;
use covidmap::{build_map, classify, generate, parse_daily_report, run, Args, Band, MapError};

const BASE_MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="2754" height="1398">
<style type="text/css" id="style_css_sheet">
.oceanxx { fill:#ffffff; }
.landxx { fill:#e0e0e0; stroke:#ffffff; }
</style>
<path class="landxx fr" d="M 0 0"/>
<path class="landxx de" d="M 1 1"/>
</svg>
"#;

const REPORT: &str = "\
FIPS,Admin2,Province_State,Country_Region,Last_Update,Lat,Long_,Confirmed,Deaths,Recovered,Active,Combined_Key
,,A,France,2020-03-24 23:37:31,46.2,2.2,50,1,2,47,\"A, France\"
,,B,France,2020-03-24 23:37:31,46.2,2.2,75,2,3,70,\"B, France\"
,,,Atlantis,2020-03-24 23:37:31,0,0,5000,0,0,5000,Atlantis
,,,Diamond Princess,2020-03-24 23:37:31,0,0,712,10,325,377,Diamond Princess
,,,Germany,2020-03-24 23:37:31,51.1,10.4,0,0,0,0,Germany
53033,King,Washington,US,2020-03-24 23:37:31,47.4,-121.8,60000,100,0,59900,\"King, Washington, US\"
53061,Snohomish,Washington,US,2020-03-24 23:37:31,48.0,-121.7,40000,50,0,39950,\"Snohomish, Washington, US\"
";

fn iso_table_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data/iso_codes.csv")
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn dry_run_args(report: &Path, base_map: &Path, output: &Path) -> Args {
    let iso_table = iso_table_path();
    Args::parse_from([
        "covidmap",
        "--dry-run",
        "--date",
        "2020-03-24",
        "--report",
        report.to_str().unwrap(),
        "--base-map",
        base_map.to_str().unwrap(),
        "--iso-table",
        iso_table.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
    ])
}

#[test]
fn sub_divisions_sum_into_one_country() {
    let table = embedded_table().unwrap();
    let output = build_map(REPORT, BASE_MAP, &table).unwrap();

    let france = output.aggregate.get("FR").unwrap();
    assert_eq!(france.confirmed, 125);
    assert_eq!(france.deaths, 3);
    assert_eq!(france.recovered, 5);
    assert_eq!(output.classes.band_of("fr"), Some(Band::Hundreds));
}

#[test]
fn unmapped_and_codeless_rows_are_dropped() {
    let table = embedded_table().unwrap();
    let output = build_map(REPORT, BASE_MAP, &table).unwrap();

    let codes: Vec<&str> = output.aggregate.countries.keys().map(String::as_str).collect();
    assert_eq!(codes, vec!["DE", "FR", "US"]);
    assert_eq!(output.aggregate.unmapped_rows, 1);
    assert_eq!(output.aggregate.codeless_rows, 1);
    assert_eq!(output.classes.band_of("de"), None);
    assert!(!output.stylesheet.contains(".de"));
}

#[test]
fn exactly_one_hundred_thousand_is_top_band() {
    let table = embedded_table().unwrap();
    let output = build_map(REPORT, BASE_MAP, &table).unwrap();

    assert_eq!(output.aggregate.get("US").map(|c| c.confirmed), Some(100_000));
    assert_eq!(output.classes.band_of("us"), Some(Band::HundredThousandsPlus));
    assert!(output.stylesheet.contains(".us { fill:#510000; }\n"));
}

#[test]
fn france_lands_in_hundreds_colour_rule() {
    let table = embedded_table().unwrap();
    let records =
        parse_daily_report("Country_Region,Confirmed,Deaths,Recovered\nFrance,120,0,0\n").unwrap();
    let css = generate(&classify(&covidmap::aggregate(&records, &table)));

    assert_eq!(css, ".fr { fill:#ee7070; }\n");
}

#[test]
fn padded_country_name_stays_unmapped() {
    let table = embedded_table().unwrap();
    let records = parse_daily_report(
        "Country_Region,Confirmed,Deaths,Recovered\n Azerbaijan,1,0,0\nAzerbaijan,2,0,0\n",
    )
    .unwrap();
    let aggregate = covidmap::aggregate(&records, &table);

    assert_eq!(aggregate.get("AZ").map(|c| c.confirmed), Some(2));
    assert_eq!(aggregate.unmapped_rows, 1);
}

#[test]
fn stylesheet_generation_is_idempotent() {
    let table = embedded_table().unwrap();
    let first = build_map(REPORT, BASE_MAP, &table).unwrap();
    let second = build_map(REPORT, BASE_MAP, &table).unwrap();

    assert_eq!(first.stylesheet, second.stylesheet);
    assert_eq!(first.document, second.document);
    assert_eq!(
        generate(&classify(&first.aggregate)),
        generate(&classify(&first.aggregate))
    );
}

#[test]
fn composed_document_only_gains_the_fragment() {
    let table = embedded_table().unwrap();
    let output = build_map(REPORT, BASE_MAP, &table).unwrap();

    let expected = BASE_MAP.replacen(
        "</style>",
        &format!("{}\n</style>", output.stylesheet),
        1,
    );
    assert_eq!(output.document, expected);
}

#[test]
fn dry_run_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let report = write(dir.path(), "03-24-2020.csv", REPORT);
    let base_map = write(dir.path(), "BlankMap-World.svg", BASE_MAP);
    let output = dir.path().join("out.svg");

    let summary = run(&dry_run_args(&report, &base_map, &output)).unwrap();

    assert!(summary.upload.is_none());
    assert_eq!(summary.report_date.to_string(), "2020-03-24");
    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(written, summary.map.document);
    assert!(written.contains(".fr { fill:#ee7070; }"));
}

#[test]
fn missing_style_anchor_produces_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let report = write(dir.path(), "03-24-2020.csv", REPORT);
    let base_map = write(dir.path(), "broken.svg", "<svg><path class=\"fr\"/></svg>");
    let output = dir.path().join("out.svg");

    let err = run(&dry_run_args(&report, &base_map, &output)).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MapError>(),
        Some(MapError::MissingStyleAnchor)
    ));
    assert!(!output.exists());
}

#[test]
fn malformed_report_produces_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let report = write(
        dir.path(),
        "03-24-2020.csv",
        "Country_Region,Confirmed,Deaths,Recovered\nFrance,120,3,12\nSpain,n/a,0,0\n",
    );
    let base_map = write(dir.path(), "BlankMap-World.svg", BASE_MAP);
    let output = dir.path().join("out.svg");

    let err = run(&dry_run_args(&report, &base_map, &output)).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MapError>(),
        Some(MapError::MalformedRecord { line: 3, .. })
    ));
    assert!(!output.exists());
}
