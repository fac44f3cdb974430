pub mod aggregate;
pub mod args;
pub mod band;
pub mod charts;
pub mod commons;
pub mod compose;
pub mod error;
pub mod fetch;
pub mod iso;
pub mod pipeline;
pub mod report;
pub mod style;
pub mod utils;

pub use aggregate::{aggregate, CaseCounts, CountryAggregate};
pub use args::Args;
pub use band::{classify, Band, ClassMap};
pub use charts::{copy_charts, extract_rows, ChartRow};
pub use commons::UploadOutcome;
pub use compose::compose;
pub use error::MapError;
pub use iso::{init_default_table, load_iso_table, IsoTable};
pub use pipeline::{build_map, run, MapOutput, RunSummary};
pub use report::{parse_daily_report, CountryRecord};
pub use style::generate;
