//! Site-year orchestration: file discovery, ingest, and dispatch into
//! the numerical core.

use crate::cli::Cli;
use crate::csv_io::{self, CsvFile};
use fluxqc::calendar::{Resolution, Timestamp, YearCalendar};
use fluxqc::mds::MdsRow;
use fluxqc::row::YearVec;
use fluxqc::sentinel::is_valid;
use fluxqc::ustar::UstarRow;
use log::warn;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Expands `cli.input` (files or directories) into a flat list of CSV
/// file paths, logging and skipping anything that isn't readable.
pub fn discover_inputs(cli: &Cli) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in &cli.input {
        if input.is_dir() {
            for entry in WalkDir::new(input).into_iter().filter_map(Result::ok) {
                let path = entry.path();
                if path.is_file() && path.extension().is_some_and(|e| e == "csv") {
                    files.push(path.to_path_buf());
                }
            }
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            warn!("input path not found: {}", input.display());
        }
    }
    files
}

fn resolution(cli: &Cli) -> Resolution {
    if cli.hourly {
        Resolution::Hourly
    } else {
        Resolution::HalfHourly
    }
}

/// Loads u* rows, falling back to `itpTA`/`itpSW_IN` for rows where the
/// primary TA/SW_IN column is invalid, and flagging which source a row
/// actually used. Missing rows are never silently reindexed: the result
/// is a dense, calendar-addressed array (see [`densify_ustar_rows`]), so
/// a gap in the input reads as an explicit invalid row rather than
/// shifting every later row's position.
pub fn load_ustar_rows(path: &Path, cli: &Cli) -> Option<Vec<UstarRow>> {
    let csv = csv_io::read_csv(path).ok()?;
    let ts_col = csv.column_index("TIMESTAMP_END")?;
    let nee_col = csv.column_index(&cli.to_fill)?;
    let ta_col = csv.column_index(&cli.ta)?;
    let itp_ta_col = csv.column_index("itpTA");
    let ustar_col = csv.column_index(cli.ustar.as_deref()?)?;
    let sw_col = csv.column_index(&cli.sw_in)?;
    let itp_sw_col = csv.column_index("itpSW_IN");

    let parsed = build_ustar_rows(&csv, ts_col, nee_col, ta_col, itp_ta_col, ustar_col, sw_col, itp_sw_col);
    Some(densify_ustar_rows(parsed, resolution(cli)))
}

/// Reads a value from `primary_col`, falling back to `itp_col` (if
/// present) when the primary reading is invalid. Returns the value and
/// whether the fallback was the one actually used.
fn read_with_itp_fallback(csv: &CsvFile, row: usize, primary_col: usize, itp_col: Option<usize>) -> (f64, bool) {
    let primary = csv_io::parse_numeric(csv.field(row, primary_col));
    if is_valid(primary) {
        return (primary, false);
    }
    match itp_col {
        Some(col) => {
            let fallback = csv_io::parse_numeric(csv.field(row, col));
            if is_valid(fallback) { (fallback, true) } else { (primary, false) }
        }
        None => (primary, false),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_ustar_rows(
    csv: &CsvFile,
    ts_col: usize,
    nee_col: usize,
    ta_col: usize,
    itp_ta_col: Option<usize>,
    ustar_col: usize,
    sw_col: usize,
    itp_sw_col: Option<usize>,
) -> Vec<UstarRow> {
    let mut rows = Vec::with_capacity(csv.rows.len());
    for i in 0..csv.rows.len() {
        let Some(timestamp) = csv_io::parse_timestamp_end(csv.field(i, ts_col)) else {
            continue;
        };
        let (ta, ta_interpolated) = read_with_itp_fallback(csv, i, ta_col, itp_ta_col);
        let (swin, swin_interpolated) = read_with_itp_fallback(csv, i, sw_col, itp_sw_col);
        rows.push(UstarRow {
            timestamp,
            nee: csv_io::parse_numeric(csv.field(i, nee_col)),
            ta,
            ustar: csv_io::parse_numeric(csv.field(i, ustar_col)),
            swin,
            ta_interpolated,
            swin_interpolated,
        });
    }
    rows
}

/// `YYYY0101 0000` is the rolled-over end label of the previous year's
/// final row ([`YearCalendar::end_timestamp`]), not the first row of
/// `YYYY` — so it buckets under `YYYY - 1`.
fn owning_year(ts: &Timestamp) -> i32 {
    if ts.month == 1 && ts.day == 1 && ts.hour == 0 && ts.minute == 0 {
        ts.year - 1
    } else {
        ts.year
    }
}

/// Lays parsed rows onto one dense, calendar-indexed [`YearVec`] per
/// year, then flattens them back out in row-index order. A row whose
/// TIMESTAMP_END never resolves to a slot in its own year is dropped;
/// a calendar slot no input row reached comes back as
/// [`UstarRow::invalid`].
fn densify_ustar_rows(parsed: Vec<UstarRow>, resolution: Resolution) -> Vec<UstarRow> {
    let mut by_year: BTreeMap<i32, Vec<UstarRow>> = BTreeMap::new();
    for row in parsed {
        by_year.entry(owning_year(&row.timestamp)).or_default().push(row);
    }

    let mut dense = Vec::new();
    for (year, year_rows) in by_year {
        let cal = YearCalendar::new(year, resolution);
        let mut slots = YearVec::new(cal.rows(), UstarRow::invalid(Timestamp::new(year, 1, 1, 0, 0, 0)));
        for row in year_rows {
            if let Ok(index) = cal.row_of_end(&row.timestamp) {
                slots.set(index, row);
            }
        }
        for index in 0..cal.rows() {
            if slots.is_assigned(index) {
                dense.push(*slots.get(index));
            } else if let Ok(ts) = cal.end_timestamp(index) {
                dense.push(UstarRow::invalid(ts));
            }
        }
    }
    dense
}

/// Loads MDS rows the same way [`load_ustar_rows`] does: parsed against
/// TIMESTAMP_END, then densified onto one calendar-indexed array per
/// year so a missing input row shows up as a gap rather than a shift.
pub fn load_mds_rows(path: &Path, cli: &Cli) -> Option<Vec<MdsRow>> {
    let csv = csv_io::read_csv(path).ok()?;
    let ts_col = csv.column_index("TIMESTAMP_END")?;
    let target_col = csv.column_index(&cli.to_fill)?;
    let sw_col = csv.column_index(&cli.sw_in)?;
    let ta_col = csv.column_index(&cli.ta)?;
    let vpd_col = csv.column_index(cli.vpd.as_deref()?)?;

    let mut parsed = Vec::with_capacity(csv.rows.len());
    for i in 0..csv.rows.len() {
        let Some(timestamp) = csv_io::parse_timestamp_end(csv.field(i, ts_col)) else {
            continue;
        };
        parsed.push((
            timestamp,
            MdsRow {
                target: csv_io::parse_numeric(csv.field(i, target_col)),
                sw_in: csv_io::parse_numeric(csv.field(i, sw_col)),
                ta: csv_io::parse_numeric(csv.field(i, ta_col)),
                vpd: csv_io::parse_numeric(csv.field(i, vpd_col)),
            },
        ));
    }
    Some(densify_mds_rows(parsed, resolution(cli)))
}

fn densify_mds_rows(parsed: Vec<(Timestamp, MdsRow)>, resolution: Resolution) -> Vec<MdsRow> {
    let mut by_year: BTreeMap<i32, Vec<(Timestamp, MdsRow)>> = BTreeMap::new();
    for entry in parsed {
        by_year.entry(owning_year(&entry.0)).or_default().push(entry);
    }

    let mut dense = Vec::new();
    for (year, year_rows) in by_year {
        let cal = YearCalendar::new(year, resolution);
        let mut slots = YearVec::new(cal.rows(), MdsRow::invalid());
        for (ts, row) in year_rows {
            if let Ok(index) = cal.row_of_end(&ts) {
                slots.set(index, row);
            }
        }
        for index in 0..cal.rows() {
            dense.push(*slots.get(index));
        }
    }
    dense
}

pub fn active_resolution(cli: &Cli) -> Resolution {
    resolution(cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_at(year: i32, month: u8, day: u8, hour: u8, minute: u8, ta: f64) -> UstarRow {
        let mut row = UstarRow::invalid(Timestamp::new(year, month, day, hour, minute, 0));
        row.ta = ta;
        row
    }

    #[test]
    fn densify_fills_missing_slots_with_invalid_rows() {
        let parsed = vec![row_at(2021, 1, 1, 0, 30, 12.0)];
        let dense = densify_ustar_rows(parsed, Resolution::HalfHourly);
        assert_eq!(dense.len(), YearCalendar::new(2021, Resolution::HalfHourly).rows());
        assert_eq!(dense[0].ta, 12.0);
        assert!(!is_valid(dense[1].ta));
    }

    #[test]
    fn densify_splits_rows_by_year() {
        // 2021-01-01 00:00 is 2020's rolled-over end label, not 2021's
        // first row; both must land as assigned slots, not one dropped.
        let parsed = vec![
            row_at(2020, 12, 31, 23, 30, 1.0),
            row_at(2021, 1, 1, 0, 0, 2.0),
        ];
        let dense = densify_ustar_rows(parsed, Resolution::HalfHourly);
        let year_2020_rows = YearCalendar::new(2020, Resolution::HalfHourly).rows();
        let expected = year_2020_rows + YearCalendar::new(2021, Resolution::HalfHourly).rows();
        assert_eq!(dense.len(), expected);
        assert_eq!(dense[year_2020_rows - 2].ta, 1.0);
        assert_eq!(dense[year_2020_rows - 1].ta, 2.0);
    }
}
