use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the calendar, binning, u* and MDS pipelines.
///
/// Ingest (CSV parsing, CLI flags, file enumeration) is a collaborator's
/// concern; this enum only covers failures that can originate inside the
/// numerical core itself.
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("invalid timestamp: year={year} month={month} day={day} hour={hour} minute={minute}")]
    InvalidTimestamp {
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
    },

    #[error("row index {index} out of range for year {year} ({rows} rows at this resolution)")]
    RowIndexOutOfRange { index: i64, year: i32, rows: i64 },

    #[error("season grouping string was empty")]
    NoStringToParse,

    #[error("month {0} is out of the 1..=12 range")]
    MonthOutOfRange(u32),

    #[error("month {0} appears in more than one season group")]
    DuplicateMonth(u32),

    #[error("'{0}' is not a valid month token in a season grouping string")]
    InvalidSeasonToken(String),

    #[error("not enough valid values to derive a u* threshold ({valid} valid of {required} required)")]
    NotEnoughValues { valid: usize, required: usize },

    #[error("ta_classes x ustar_classes ({ta} x {ustar}) is incompatible with {rows} available rows")]
    ConfigInvalid { ta: usize, ustar: usize, rows: usize },
}
