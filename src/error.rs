use thiserror::Error;

/// Failures of a single map run.
///
/// Unmapped country names are not represented here: those rows are dropped
/// and counted by the aggregator.
#[derive(Debug, Error)]
pub enum MapError {
    /// Neither today's nor yesterday's daily report could be retrieved.
    #[error("No data file for {today} or {yesterday}")]
    ResourceUnavailable { today: String, yesterday: String },

    /// A report row whose numeric fields do not parse as non-negative integers.
    #[error("Malformed record at line {line}: {message}")]
    MalformedRecord { line: u64, message: String },

    /// The base document has no `</style>` to splice into.
    #[error("Base document has no closing style tag")]
    MissingStyleAnchor,

    /// A row of an explicitly requested ISO code table is invalid.
    #[error("Invalid ISO table entry at line {line}: {message}")]
    InvalidTable { line: u64, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MapError>;
