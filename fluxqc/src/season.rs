//! Season-grouping grammar (SEAS): `group (';' group)*`, `group := uint
//! (',' uint)*`. Each uint names a calendar month in `1..=12`; a month
//! may appear in at most one group. Output is zero-based: the first
//! group written is season `0`.

use crate::calendar::Timestamp;
use crate::errors::{Error, Result};
use std::collections::HashSet;

/// A parsed, validated season grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonGroups {
    groups: Vec<Vec<u8>>,
}

impl SeasonGroups {
    /// Parses a grouping string such as `"12,1,2;3,4,5;6,7,8;9,10,11"`.
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(Error::NoStringToParse);
        }

        let mut seen = HashSet::new();
        let mut groups = Vec::new();

        for group_str in input.split(';') {
            let group_str = group_str.trim();
            if group_str.is_empty() {
                return Err(Error::InvalidSeasonToken(String::new()));
            }
            let mut months = Vec::new();
            for token in group_str.split(',') {
                let token = token.trim();
                let month: u32 = token
                    .parse()
                    .map_err(|_| Error::InvalidSeasonToken(token.to_string()))?;
                if !(1..=12).contains(&month) {
                    return Err(Error::MonthOutOfRange(month));
                }
                if !seen.insert(month) {
                    return Err(Error::DuplicateMonth(month));
                }
                months.push(month as u8);
            }
            groups.push(months);
        }

        Ok(Self { groups })
    }

    /// Number of seasons in the grouping.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn months(&self, season: usize) -> &[u8] {
        &self.groups[season]
    }

    /// Zero-based season index that `month` (1..=12) belongs to, if any.
    pub fn season_of_month(&self, month: u8) -> Option<usize> {
        self.groups.iter().position(|g| g.contains(&month))
    }

    /// Zero-based season index a timestamp belongs to.
    ///
    /// A timestamp that lands exactly on `00:00` of the first day of a
    /// month (the end-of-interval label of the previous month's final
    /// row) is attributed to the *previous* month, not the one named in
    /// its own `month` field.
    pub fn season_of_timestamp(&self, ts: &Timestamp) -> Option<usize> {
        let is_month_boundary = ts.day == 1 && ts.hour == 0 && ts.minute == 0;
        let effective_month = if is_month_boundary {
            if ts.month == 1 { 12 } else { ts.month - 1 }
        } else {
            ts.month
        };
        self.season_of_month(effective_month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_four_seasons() {
        let seasons = SeasonGroups::parse("12,1,2;3,4,5;6,7,8;9,10,11").unwrap();
        assert_eq!(seasons.len(), 4);
        assert_eq!(seasons.season_of_month(1), Some(0));
        assert_eq!(seasons.season_of_month(6), Some(2));
    }

    #[test]
    fn rejects_duplicate_month() {
        let err = SeasonGroups::parse("1,2;2,3").unwrap_err();
        assert_eq!(err, Error::DuplicateMonth(2));
    }

    #[test]
    fn rejects_month_out_of_range() {
        let err = SeasonGroups::parse("0,1").unwrap_err();
        assert_eq!(err, Error::MonthOutOfRange(0));
        let err = SeasonGroups::parse("1,13").unwrap_err();
        assert_eq!(err, Error::MonthOutOfRange(13));
    }

    #[test]
    fn rejects_empty_string() {
        assert_eq!(SeasonGroups::parse("").unwrap_err(), Error::NoStringToParse);
    }

    #[test]
    fn month_boundary_belongs_to_previous_month() {
        let seasons = SeasonGroups::parse("12,1,2;3,4,5;6,7,8;9,10,11").unwrap();
        let ts = Timestamp::new(2021, 4, 1, 0, 0, 0);
        // 00:00 on April 1st is the end label of March's last row.
        assert_eq!(seasons.season_of_timestamp(&ts), seasons.season_of_month(3));
    }

    #[test]
    fn non_boundary_timestamp_uses_own_month() {
        let seasons = SeasonGroups::parse("12,1,2;3,4,5;6,7,8;9,10,11").unwrap();
        let ts = Timestamp::new(2021, 4, 15, 12, 0, 0);
        assert_eq!(seasons.season_of_timestamp(&ts), seasons.season_of_month(4));
    }
}
