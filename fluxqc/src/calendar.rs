//! Calendar / row-index mapping (CAL).
//!
//! Maps between `(year, month, day, hour, minute)` and the zero-based row
//! index of a year at half-hourly or hourly resolution. Every stamp in
//! this crate labels the **end** of its measurement interval: row 0 at
//! half-hourly resolution is `00:00`-`00:30`, and its end timestamp is
//! `00:30`.

use crate::errors::{Error, Result};
use hifitime::Epoch;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Half-hourly (48 slots/day) or hourly (24 slots/day) measurement
/// cadence. Sub-hourly resolutions are out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Resolution {
    #[default]
    HalfHourly,
    Hourly,
}

impl Resolution {
    pub fn slots_per_day(self) -> u32 {
        match self {
            Resolution::HalfHourly => 48,
            Resolution::Hourly => 24,
        }
    }

    pub fn step_minutes(self) -> u32 {
        match self {
            Resolution::HalfHourly => 30,
            Resolution::Hourly => 60,
        }
    }
}

/// A calendar timestamp; may represent either the start or the end of a
/// measurement interval depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timestamp {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Timestamp {
    pub fn new(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Renders as `YYYYMMDDHHMM`, the form used by TIMESTAMP_START /
    /// TIMESTAMP_END columns.
    pub fn to_compact_string(&self) -> String {
        format!(
            "{:04}{:02}{:02}{:02}{:02}",
            self.year, self.month, self.day, self.hour, self.minute
        )
    }

    /// Converts to a UTC [`hifitime::Epoch`] at midnight-relative
    /// precision (seconds truncated to the stored field).
    pub fn to_epoch(&self) -> Epoch {
        Epoch::from_gregorian_utc(
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            0,
        )
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_compact_string())
    }
}

/// `true` for years divisible by 4, except centuries not divisible by 400
/// (the standard Gregorian rule).
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

const MONTH_LENGTHS: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

fn days_in_month(year: i32, month: u8) -> Result<u8> {
    if !(1..=12).contains(&month) {
        return Err(Error::InvalidTimestamp {
            year,
            month,
            day: 0,
            hour: 0,
            minute: 0,
        });
    }
    if month == 2 && is_leap_year(year) {
        Ok(29)
    } else {
        Ok(MONTH_LENGTHS[(month - 1) as usize])
    }
}

/// 1-based day-of-year for a validated `(year, month, day)` triple.
fn day_of_year(year: i32, month: u8, day: u8) -> Result<u32> {
    let dim = days_in_month(year, month)?;
    if day < 1 || day > dim {
        return Err(Error::InvalidTimestamp {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
        });
    }
    let mut doy = day as u32;
    for m in 1..month {
        doy += days_in_month(year, m)? as u32;
    }
    Ok(doy)
}

/// Inverse of [`day_of_year`]: turns a 1-based day-of-year back into
/// `(month, day)` for `year`.
fn month_day_of(year: i32, doy: u32) -> (u8, u8) {
    let mut remaining = doy;
    for month in 1..=12u8 {
        let dim = days_in_month(year, month).unwrap_or(31) as u32;
        if remaining <= dim {
            return (month, remaining as u8);
        }
        remaining -= dim;
    }
    (12, 31)
}

/// Row-index / timestamp mapping for a single calendar year at a fixed
/// resolution. One instance is built per site-year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearCalendar {
    year: i32,
    resolution: Resolution,
}

impl YearCalendar {
    pub fn new(year: i32, resolution: Resolution) -> Self {
        Self { year, resolution }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn is_leap(&self) -> bool {
        is_leap_year(self.year)
    }

    /// Total row count for this year at this resolution: 17568/17520
    /// half-hourly, 8784/8760 hourly.
    pub fn rows(&self) -> usize {
        days_in_year(self.year) as usize * self.resolution.slots_per_day() as usize
    }

    fn step(&self) -> u32 {
        self.resolution.step_minutes()
    }

    fn slots_per_day(&self) -> u32 {
        self.resolution.slots_per_day()
    }

    /// Row index of the slot whose interval *starts* at `ts`.
    pub fn row_of_start(&self, ts: &Timestamp) -> Result<usize> {
        if ts.year != self.year {
            return Err(Error::InvalidTimestamp {
                year: ts.year,
                month: ts.month,
                day: ts.day,
                hour: ts.hour,
                minute: ts.minute,
            });
        }
        let doy = day_of_year(ts.year, ts.month, ts.day)?;
        let minute_of_day = ts.hour as u32 * 60 + ts.minute as u32;
        if minute_of_day % self.step() != 0 {
            return Err(Error::InvalidTimestamp {
                year: ts.year,
                month: ts.month,
                day: ts.day,
                hour: ts.hour,
                minute: ts.minute,
            });
        }
        let total_minutes = (doy - 1) as i64 * 1440 + minute_of_day as i64;
        Ok((total_minutes / self.step() as i64) as usize)
    }

    /// Timestamp of the start of slot `row`.
    pub fn start_timestamp(&self, row: usize) -> Result<Timestamp> {
        self.checked_row(row)?;
        let total_minutes = row as i64 * self.step() as i64;
        Ok(self.timestamp_from_total_minutes(total_minutes))
    }

    /// Timestamp of the end of slot `row` — the canonical TIMESTAMP_END.
    /// The last slot of the year rolls over to `YYYY+1 0101 0000`.
    pub fn end_timestamp(&self, row: usize) -> Result<Timestamp> {
        self.checked_row(row)?;
        let total_minutes = (row as i64 + 1) * self.step() as i64;
        Ok(self.timestamp_from_total_minutes(total_minutes))
    }

    /// Recovers the row index from a TIMESTAMP_END string's timestamp
    /// (the inverse of [`Self::end_timestamp`]).
    pub fn row_of_end(&self, ts: &Timestamp) -> Result<usize> {
        let rolled_over = ts.year == self.year + 1 && ts.month == 1 && ts.day == 1 && ts.hour == 0 && ts.minute == 0;
        let total_minutes = if rolled_over {
            days_in_year(self.year) as i64 * 1440
        } else if ts.year == self.year {
            let doy = day_of_year(ts.year, ts.month, ts.day)? as i64;
            (doy - 1) * 1440 + ts.hour as i64 * 60 + ts.minute as i64
        } else {
            return Err(Error::InvalidTimestamp {
                year: ts.year,
                month: ts.month,
                day: ts.day,
                hour: ts.hour,
                minute: ts.minute,
            });
        };
        let step = self.step() as i64;
        if total_minutes % step != 0 || total_minutes < step {
            return Err(Error::InvalidTimestamp {
                year: ts.year,
                month: ts.month,
                day: ts.day,
                hour: ts.hour,
                minute: ts.minute,
            });
        }
        Ok((total_minutes / step - 1) as usize)
    }

    fn timestamp_from_total_minutes(&self, total_minutes: i64) -> Timestamp {
        let year_minutes = days_in_year(self.year) as i64 * 1440;
        if total_minutes >= year_minutes {
            let overflow = total_minutes - year_minutes;
            debug_assert_eq!(overflow, 0, "only the final slot may roll into next year");
            return Timestamp::new(self.year + 1, 1, 1, 0, 0, 0);
        }
        let doy = (total_minutes / 1440) as u32 + 1;
        let minute_of_day = (total_minutes % 1440) as u32;
        let (month, day) = month_day_of(self.year, doy);
        Timestamp::new(
            self.year,
            month,
            day,
            (minute_of_day / 60) as u8,
            (minute_of_day % 60) as u8,
            0,
        )
    }

    fn checked_row(&self, row: usize) -> Result<()> {
        if row >= self.rows() {
            return Err(Error::RowIndexOutOfRange {
                index: row as i64,
                year: self.year,
                rows: self.rows() as i64,
            });
        }
        Ok(())
    }

    /// Fractional decimal day-of-year ("DTime") of the slot ending at
    /// `row`: `row/slots_per_day + 1/slots_per_day`.
    pub fn dtime_of_row(&self, row: usize) -> f64 {
        let n = self.slots_per_day() as f64;
        row as f64 / n + 1.0 / n
    }

    /// Inverse of [`Self::dtime_of_row`]: `round(dtime*slots_per_day -
    /// slots_per_day)`, then shifted by one to land back on a 0-based
    /// row index.
    pub fn row_of_dtime(&self, dtime: f64) -> i64 {
        let n = self.slots_per_day() as f64;
        (dtime * n - n).round() as i64 - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leap_year_rule() {
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(is_leap_year(2020));
        assert!(!is_leap_year(2021));
    }

    #[test]
    fn half_hourly_row_counts() {
        assert_eq!(YearCalendar::new(2020, Resolution::HalfHourly).rows(), 17568);
        assert_eq!(YearCalendar::new(2021, Resolution::HalfHourly).rows(), 17520);
        assert_eq!(YearCalendar::new(2021, Resolution::Hourly).rows(), 8760);
    }

    #[test]
    fn row_zero_is_first_half_hour() {
        let cal = YearCalendar::new(2021, Resolution::HalfHourly);
        let start = cal.start_timestamp(0).unwrap();
        assert_eq!(start, Timestamp::new(2021, 1, 1, 0, 0, 0));
        let end = cal.end_timestamp(0).unwrap();
        assert_eq!(end, Timestamp::new(2021, 1, 1, 0, 30, 0));
    }

    #[test]
    fn last_row_end_rolls_into_next_year() {
        let cal = YearCalendar::new(2021, Resolution::HalfHourly);
        let end = cal.end_timestamp(17519).unwrap();
        assert_eq!(end, Timestamp::new(2022, 1, 1, 0, 0, 0));
    }

    #[test]
    fn round_trip_every_row_half_hourly_leap_year() {
        let cal = YearCalendar::new(2020, Resolution::HalfHourly);
        for row in 0..cal.rows() {
            let end = cal.end_timestamp(row).unwrap();
            let back = cal.row_of_end(&end).unwrap();
            assert_eq!(back, row, "round trip failed at row {row}");
        }
    }

    #[test]
    fn round_trip_every_row_hourly_non_leap() {
        let cal = YearCalendar::new(2021, Resolution::Hourly);
        for row in 0..cal.rows() {
            let end = cal.end_timestamp(row).unwrap();
            let back = cal.row_of_end(&end).unwrap();
            assert_eq!(back, row);
        }
    }

    #[test]
    fn dtime_of_first_half_hour() {
        let cal = YearCalendar::new(2021, Resolution::HalfHourly);
        assert!((cal.dtime_of_row(0) - 1.0 / 48.0).abs() < 1e-9);
    }

    #[test]
    fn row_of_dtime_matches_documented_formula() {
        // row_of_dtime is the literal round(dtime*n - n) - 1 inverse;
        // it is offset from dtime_of_row's own input by `n`, not a
        // round trip. See DESIGN.md for the source of this formula.
        let cal = YearCalendar::new(2021, Resolution::HalfHourly);
        let dtime = 2.0;
        assert_eq!(cal.row_of_dtime(dtime), 47);
    }

    #[test]
    fn row_out_of_range_never_addressed() {
        let cal = YearCalendar::new(2021, Resolution::HalfHourly);
        assert!(cal.start_timestamp(17520).is_err());
    }

    #[test]
    fn feb_29_boundary_round_trips() {
        let cal = YearCalendar::new(2020, Resolution::HalfHourly);
        let ts = Timestamp::new(2020, 2, 29, 12, 0, 0);
        let row = cal.row_of_start(&ts).unwrap();
        assert_eq!(cal.start_timestamp(row).unwrap(), ts);
    }
}
