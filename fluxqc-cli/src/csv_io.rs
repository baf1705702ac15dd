//! CSV ingest: header-driven column lookup and TIMESTAMP_END parsing.
//!
//! Deliberately simple line-splitting rather than a full CSV dialect
//! (quoting, embedded commas) — AmeriFlux/FLUXNET exports are
//! comma-separated with no quoted fields.

use fluxqc::calendar::Timestamp;
use scan_fmt::scan_fmt;
use std::fs;
use std::io;
use std::path::Path;

pub struct CsvFile {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvFile {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    pub fn field(&self, row: usize, column: usize) -> &str {
        self.rows[row].get(column).map(String::as_str).unwrap_or("")
    }
}

pub fn read_csv(path: &Path) -> io::Result<CsvFile> {
    let contents = fs::read_to_string(path)?;
    let mut lines = contents.lines();
    let header = lines
        .next()
        .map(|line| line.split(',').map(str::trim).map(String::from).collect())
        .unwrap_or_default();
    let rows = lines
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(',').map(str::trim).map(String::from).collect())
        .collect();
    Ok(CsvFile { header, rows })
}

/// Parses a `YYYYMMDDHHMM` TIMESTAMP_END field.
pub fn parse_timestamp_end(field: &str) -> Option<Timestamp> {
    let (year, month, day, hour, minute) =
        scan_fmt!(field, "{4d}{2d}{2d}{2d}{2d}", i32, u8, u8, u8, u8);
    Some(Timestamp::new(year?, month?, day?, hour?, minute?, 0))
}

/// Parses a field as `f64`, mapping empty strings and `-9999` variants
/// to fluxqc's invalid sentinel rather than failing the row.
pub fn parse_numeric(field: &str) -> f64 {
    if field.is_empty() {
        return fluxqc::sentinel::INVALID;
    }
    field.parse().unwrap_or(fluxqc::sentinel::INVALID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compact_timestamp() {
        let ts = parse_timestamp_end("202101010030").unwrap();
        assert_eq!(ts, Timestamp::new(2021, 1, 1, 0, 30, 0));
    }

    #[test]
    fn empty_numeric_field_is_invalid() {
        assert_eq!(parse_numeric(""), fluxqc::sentinel::INVALID);
    }

    #[test]
    fn numeric_field_parses() {
        assert_eq!(parse_numeric("3.5"), 3.5);
    }
}
