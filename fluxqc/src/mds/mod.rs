//! Marginal Distribution Sampling gap-filler (MDS), after Reichstein et
//! al. (2005).
//!
//! Works over a single flat, chronologically ordered row sequence —
//! multiple years are the caller's concatenation, and a look-alike
//! search window is clipped at the ends of that sequence rather than
//! wrapping around.

use crate::calendar::Resolution;
use crate::sentinel::{INVALID, is_valid};
use strum_macros::Display;

/// One half-hourly or hourly observation feeding the gap-filler. `vpd`
/// and `ta` may be [`crate::sentinel::INVALID`] on rows that otherwise
/// have everything else the look-alike search needs.
#[derive(Debug, Clone, Copy)]
pub struct MdsRow {
    pub target: f64,
    pub sw_in: f64,
    pub ta: f64,
    pub vpd: f64,
}

impl MdsRow {
    /// A row with every field at the invalid sentinel, the gap filler's
    /// representation of a calendar slot no input row ever reached.
    pub fn invalid() -> Self {
        Self {
            target: INVALID,
            sw_in: INVALID,
            ta: INVALID,
            vpd: INVALID,
        }
    }
}

/// Which of the three tiers produced the `HAT` estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Method {
    #[strum(serialize = "tier_a")]
    TierA,
    #[strum(serialize = "tier_b")]
    TierB,
    #[strum(serialize = "tier_c")]
    TierC,
}

#[derive(Debug, Clone, Copy)]
pub struct MdsConfig {
    /// Lower/upper clamp, in W·m⁻², on the SW_IN driver-match tolerance,
    /// which otherwise scales with 5% of the target's own SW_IN.
    pub sw_in_tolerance_min: f64,
    pub sw_in_tolerance_max: f64,
    pub ta_tolerance: f64,
    pub vpd_tolerance: f64,
    /// Minimum contributor count a window must reach before a tier
    /// accepts it.
    pub rows_min: usize,
    pub tier_a_windows_days: [u32; 2],
    pub tier_b_max_window_days: u32,
    pub tier_b_step_days: u32,
    pub tier_c_offsets_days: &'static [u32],
}

impl Default for MdsConfig {
    fn default() -> Self {
        Self {
            sw_in_tolerance_min: 20.0,
            sw_in_tolerance_max: 50.0,
            ta_tolerance: 2.5,
            vpd_tolerance: 5.0,
            rows_min: 2,
            tier_a_windows_days: [7, 14],
            tier_b_max_window_days: 70,
            tier_b_step_days: 7,
            tier_c_offsets_days: &[0, 1, 2, 7, 14, 21, 28, 35, 42, 49, 56, 63, 70],
        }
    }
}

/// Per-row outcome. The look-alike search always runs, even when the
/// original target is valid, so that `hat`/`quality_hat` report what
/// MDS *would* have filled had the value been missing.
#[derive(Debug, Clone, Copy)]
pub struct GapResult {
    pub row: usize,
    /// The original target value, sentinel-preserving.
    pub original: f64,
    /// `value` reported in the `FILLED` column: the original
    /// observation when valid, the tier estimate (`hat`) otherwise.
    pub value: f64,
    /// Coarse QC: `0` when the original value was valid, else
    /// `quality_hat`.
    pub quality: u8,
    /// The tier estimate, computed regardless of whether the original
    /// was valid (the `HAT` output column). Sentinel if no tier found
    /// `rows_min` contributors.
    pub hat: f64,
    pub samples_count: usize,
    pub stddev: f64,
    /// Which tier produced `hat`; `None` if no tier qualified.
    pub method: Option<Method>,
    /// Fine QC: the quality of `hat` regardless of `target_valid`.
    pub quality_hat: u8,
    pub time_window_days: u32,
    pub target_valid: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GapFillOutcome {
    pub results: Vec<GapResult>,
    /// Rows where no tier reached `rows_min` contributors.
    pub unfilled: usize,
}

fn stats(samples: &[f64]) -> (f64, f64) {
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    if samples.len() < 2 {
        return (mean, 0.0);
    }
    let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}

fn window_bounds(i: usize, len: usize, half_width_rows: i64) -> (usize, usize) {
    let lo = (i as i64 - half_width_rows).max(0) as usize;
    let hi = ((i as i64 + half_width_rows) as usize).min(len.saturating_sub(1));
    (lo, hi)
}

fn sw_in_tolerance(target: f64, config: &MdsConfig) -> f64 {
    (target.abs() * 0.05).clamp(config.sw_in_tolerance_min, config.sw_in_tolerance_max)
}

struct TierOutcome {
    value: f64,
    quality: u8,
    samples_count: usize,
    stddev: f64,
    time_window_days: u32,
}

fn try_tier_a(rows: &[MdsRow], i: usize, slots_per_day: u32, config: &MdsConfig) -> Option<TierOutcome> {
    let target_row = &rows[i];
    if !is_valid(target_row.sw_in) || !is_valid(target_row.ta) || !is_valid(target_row.vpd) {
        return None;
    }
    let tol = sw_in_tolerance(target_row.sw_in, config);

    for (quality, &window_days) in config.tier_a_windows_days.iter().enumerate() {
        let half_width = window_days as i64 * slots_per_day as i64;
        let (lo, hi) = window_bounds(i, rows.len(), half_width);
        let mut samples = Vec::new();
        for j in lo..=hi {
            if j == i {
                continue;
            }
            let candidate = &rows[j];
            if !is_valid(candidate.target) {
                continue;
            }
            if !is_valid(candidate.sw_in) || !is_valid(candidate.ta) || !is_valid(candidate.vpd) {
                continue;
            }
            if (candidate.sw_in - target_row.sw_in).abs() > tol {
                continue;
            }
            if (candidate.ta - target_row.ta).abs() > config.ta_tolerance {
                continue;
            }
            if (candidate.vpd - target_row.vpd).abs() > config.vpd_tolerance {
                continue;
            }
            samples.push(candidate.target);
        }

        if samples.len() >= config.rows_min {
            let (mean, stddev) = stats(&samples);
            return Some(TierOutcome {
                value: mean,
                quality: quality as u8 + 1,
                samples_count: samples.len(),
                stddev,
                time_window_days: window_days,
            });
        }
    }
    None
}

fn try_tier_b(rows: &[MdsRow], i: usize, slots_per_day: u32, config: &MdsConfig) -> Option<TierOutcome> {
    let target_row = &rows[i];
    if !is_valid(target_row.sw_in) {
        return None;
    }
    let tol = sw_in_tolerance(target_row.sw_in, config);

    let mut window_days = config.tier_b_step_days;
    while window_days <= config.tier_b_max_window_days {
        let half_width = window_days as i64 * slots_per_day as i64;
        let (lo, hi) = window_bounds(i, rows.len(), half_width);
        let mut samples = Vec::new();
        for j in lo..=hi {
            if j == i {
                continue;
            }
            let candidate = &rows[j];
            if !is_valid(candidate.target) || !is_valid(candidate.sw_in) {
                continue;
            }
            if (candidate.sw_in - target_row.sw_in).abs() > tol {
                continue;
            }
            samples.push(candidate.target);
        }

        if samples.len() >= config.rows_min {
            let (mean, stddev) = stats(&samples);
            let quality = if window_days <= 14 {
                1
            } else if window_days <= 28 {
                2
            } else {
                3
            };
            return Some(TierOutcome {
                value: mean,
                quality,
                samples_count: samples.len(),
                stddev,
                time_window_days: window_days,
            });
        }
        window_days += config.tier_b_step_days;
    }
    None
}

fn try_tier_c(rows: &[MdsRow], i: usize, slots_per_day: u32, config: &MdsConfig) -> Option<TierOutcome> {
    for &offset_days in config.tier_c_offsets_days {
        let half_width = offset_days as i64 * slots_per_day as i64;
        let (lo, hi) = window_bounds(i, rows.len(), half_width);
        let mut samples = Vec::new();
        for j in lo..=hi {
            if j == i {
                continue;
            }
            // Same time-of-day slot only.
            if (j as i64 - i as i64) % slots_per_day as i64 != 0 {
                continue;
            }
            let candidate = &rows[j];
            if is_valid(candidate.target) {
                samples.push(candidate.target);
            }
        }

        if samples.len() >= config.rows_min {
            let (mean, stddev) = stats(&samples);
            let quality = if offset_days <= 1 {
                1
            } else if offset_days <= 7 {
                2
            } else {
                3
            };
            return Some(TierOutcome {
                value: mean,
                quality,
                samples_count: samples.len(),
                stddev,
                time_window_days: offset_days,
            });
        }
    }
    None
}

/// Gap-fills every row of `rows`, never overwriting a valid target.
/// The look-alike search runs for every row regardless of target
/// validity, since `hat`/`quality_hat` report the tier estimate MDS
/// would have used had the value been missing. Reads only from the
/// original `rows` array, so output is independent of processing
/// order. Always emits exactly one [`GapResult`] per input row.
pub fn fill_gaps(rows: &[MdsRow], config: &MdsConfig, resolution: Resolution) -> GapFillOutcome {
    let slots_per_day = resolution.slots_per_day();
    let mut results = Vec::with_capacity(rows.len());
    let mut unfilled = 0;

    for (i, row) in rows.iter().enumerate() {
        let target_valid = is_valid(row.target);

        let tier = try_tier_a(rows, i, slots_per_day, config)
            .map(|t| (Method::TierA, t))
            .or_else(|| try_tier_b(rows, i, slots_per_day, config).map(|t| (Method::TierB, t)))
            .or_else(|| try_tier_c(rows, i, slots_per_day, config).map(|t| (Method::TierC, t)));

        let (method, hat, quality_hat, samples_count, stddev, time_window_days) = match tier {
            Some((method, outcome)) => (
                Some(method),
                outcome.value,
                outcome.quality,
                outcome.samples_count,
                outcome.stddev,
                outcome.time_window_days,
            ),
            None => {
                if !target_valid {
                    unfilled += 1;
                }
                (None, crate::sentinel::INVALID, 0, 0, crate::sentinel::INVALID, 0)
            }
        };

        let value = if target_valid { row.target } else { hat };
        let quality = if target_valid { 0 } else { quality_hat };

        results.push(GapResult {
            row: i,
            original: row.target,
            value,
            quality,
            hat,
            samples_count,
            stddev,
            method,
            quality_hat,
            time_window_days,
            target_valid,
        });
    }

    GapFillOutcome { results, unfilled }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(target: f64, sw_in: f64, ta: f64, vpd: f64) -> MdsRow {
        MdsRow { target, sw_in, ta, vpd }
    }

    #[test]
    fn empty_input_yields_no_results() {
        let outcome = fill_gaps(&[], &MdsConfig::default(), Resolution::HalfHourly);
        assert_eq!(outcome.results.len(), 0);
        assert_eq!(outcome.unfilled, 0);
    }

    #[test]
    fn observed_rows_pass_through_unchanged() {
        let rows = vec![row(5.0, 100.0, 20.0, 1.0)];
        let outcome = fill_gaps(&rows, &MdsConfig::default(), Resolution::HalfHourly);
        assert!(outcome.results[0].target_valid);
        assert_eq!(outcome.results[0].value, 5.0);
        assert_eq!(outcome.results[0].quality, 0);
    }

    #[test]
    fn tier_a_fills_from_similar_neighbors() {
        let mut rows = Vec::new();
        for i in 0..20 {
            rows.push(row(1.0 + i as f64 * 0.01, 100.0, 20.0, 1.0));
        }
        rows[10] = row(-9999.0, 100.0, 20.0, 1.0);
        let outcome = fill_gaps(&rows, &MdsConfig::default(), Resolution::HalfHourly);
        assert_eq!(outcome.results[10].method, Some(Method::TierA));
        assert_eq!(outcome.results[10].quality, 1);
        assert!(outcome.results[10].samples_count >= 2);
    }

    #[test]
    fn tier_c_falls_back_when_drivers_missing() {
        let mut rows = Vec::new();
        for i in 0..5 {
            rows.push(row(2.0 + i as f64, -9999.0, -9999.0, -9999.0));
        }
        rows[2] = row(-9999.0, -9999.0, -9999.0, -9999.0);
        let outcome = fill_gaps(&rows, &MdsConfig::default(), Resolution::HalfHourly);
        assert_eq!(outcome.results[2].method, Some(Method::TierC));
    }

    #[test]
    fn never_overwrites_a_valid_target() {
        let rows = vec![row(3.0, -9999.0, -9999.0, -9999.0)];
        let outcome = fill_gaps(&rows, &MdsConfig::default(), Resolution::HalfHourly);
        assert_eq!(outcome.results[0].value, 3.0);
        assert!(outcome.results[0].target_valid);
    }

    #[test]
    fn single_sample_is_not_enough_to_fill() {
        let rows = vec![
            row(-9999.0, -9999.0, -9999.0, -9999.0),
            row(4.0, -9999.0, -9999.0, -9999.0),
        ];
        let outcome = fill_gaps(&rows, &MdsConfig::default(), Resolution::HalfHourly);
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.unfilled, 1);
        assert!(!outcome.results[0].target_valid);
        assert_eq!(outcome.results[0].method, None);
    }
}
