//! Nested-binning friction-velocity (`u*`) threshold estimator (UST).

mod mode;

use crate::calendar::Timestamp;
use crate::classer::classify;
use crate::errors::{Error, Result};
use crate::season::SeasonGroups;
use crate::sentinel::{INVALID, USTAR_THRESHOLD_NOT_FOUND, is_valid};
use crate::stat::{correlation, median_filtered};
use strum_macros::Display;

pub use mode::{ModeOutcome, back_mode, forward_mode};

/// One half-hourly or hourly observation feeding the u* engine.
#[derive(Debug, Clone, Copy)]
pub struct UstarRow {
    pub timestamp: Timestamp,
    pub nee: f64,
    pub ta: f64,
    pub ustar: f64,
    pub swin: f64,
    /// `true` when `ta` was filled in from an `itpTA` fallback column
    /// rather than read directly, so downstream reporting can tell the
    /// two apart.
    pub ta_interpolated: bool,
    /// Same as `ta_interpolated`, for `swin`/`itpSW_IN`.
    pub swin_interpolated: bool,
}

impl UstarRow {
    /// A row carrying only its calendar slot — every measurement is the
    /// invalid sentinel until something is actually assigned to it.
    pub fn invalid(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            nee: INVALID,
            ta: INVALID,
            ustar: INVALID,
            swin: INVALID,
            ta_interpolated: false,
            swin_interpolated: false,
        }
    }

    pub(crate) fn all_valid(&self) -> bool {
        is_valid(self.nee) && is_valid(self.ta) && is_valid(self.ustar)
    }

    pub(crate) fn is_night(&self, swin_for_night: f64) -> bool {
        is_valid(self.swin) && self.swin < swin_for_night
    }
}

/// One of the six plateau-detection kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Mode {
    #[strum(serialize = "forward_mode_1")]
    Forward1,
    #[strum(serialize = "forward_mode_2")]
    Forward2,
    #[strum(serialize = "forward_mode_3")]
    Forward3,
    #[strum(serialize = "back_mode_1")]
    Back1,
    #[strum(serialize = "back_mode_2")]
    Back2,
    #[strum(serialize = "back_mode_3")]
    Back3,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::Forward1,
        Mode::Forward2,
        Mode::Forward3,
        Mode::Back1,
        Mode::Back2,
        Mode::Back3,
    ];

    fn n(self) -> usize {
        match self {
            Mode::Forward1 | Mode::Back1 => 1,
            Mode::Forward2 | Mode::Back2 => 2,
            Mode::Forward3 | Mode::Back3 => 3,
        }
    }

    fn is_forward(self) -> bool {
        matches!(self, Mode::Forward1 | Mode::Forward2 | Mode::Forward3)
    }
}

/// Tunables for the nested-binning engine, defaulted to the values used
/// by the reference u* post-processing tool.
#[derive(Debug, Clone, Copy)]
pub struct UstarConfig {
    pub ta_classes: usize,
    pub ustar_classes: usize,
    pub swin_for_night: f64,
    pub correlation_check: f64,
    /// Whether the percentile short-circuit is enabled in the mode
    /// kernels. Off by default, matching the reference tool.
    pub percentile_check: bool,
    pub percentile_value: f64,
    pub first_ustar_mean_check: f64,
    pub threshold_check: f64,
    pub min_value_period: usize,
    pub min_value_season: usize,
    pub ta_class_min_sample: usize,
    pub forward_window: usize,
    pub back_window: usize,
}

impl UstarConfig {
    /// Rejects class counts that can never produce a usable binning
    /// regardless of how much data is available.
    pub fn validate(&self, available_rows: usize) -> Result<()> {
        if self.ta_classes == 0 || self.ustar_classes == 0 {
            return Err(Error::ConfigInvalid {
                ta: self.ta_classes,
                ustar: self.ustar_classes,
                rows: available_rows,
            });
        }
        Ok(())
    }
}

impl Default for UstarConfig {
    fn default() -> Self {
        Self {
            ta_classes: 7,
            ustar_classes: 20,
            swin_for_night: 10.0,
            correlation_check: 0.5,
            percentile_check: false,
            percentile_value: 90.0,
            first_ustar_mean_check: 0.2,
            threshold_check: 1.0,
            min_value_period: 3000,
            min_value_season: 160,
            ta_class_min_sample: 100,
            forward_window: 10,
            back_window: 10,
        }
    }
}

/// Per-season, per-mode thresholds plus the headline "selected" value.
#[derive(Debug, Clone)]
pub struct UstarResult {
    /// `thresholds[season][mode]`, `season` indices match
    /// [`SeasonGroups`] unless the engine collapsed to a single season,
    /// in which case there is exactly one row.
    pub thresholds: Vec<[f64; 6]>,
    /// `percentiled[season][mode][ta_class]` — `true` where that
    /// per-class threshold was accepted via the percentile
    /// short-circuit rather than the plateau rule.
    pub percentiled: Vec<[Vec<bool>; 6]>,
    /// Nighttime, fully-valid row count feeding each season, same
    /// indexing as `thresholds`.
    pub samples: Vec<usize>,
    /// Maximum, across seasons, of the per-season median across modes.
    pub selected: f64,
}

struct TaClassStat {
    ustar_mean: Vec<f64>,
    fx_mean: Vec<f64>,
}

fn bin_means(ta_rows: &[&UstarRow], ustar_classes: usize) -> Option<TaClassStat> {
    let mut by_ustar: Vec<&&UstarRow> = ta_rows.iter().collect();
    by_ustar.sort_by(|a, b| a.ustar.partial_cmp(&b.ustar).unwrap());
    let keys: Vec<f64> = by_ustar.iter().map(|r| r.ustar).collect();
    let windows = classify(&keys, ustar_classes);

    let mut ustar_mean = Vec::with_capacity(ustar_classes);
    let mut fx_mean = Vec::with_capacity(ustar_classes);
    for w in &windows {
        if w.is_empty() {
            ustar_mean.push(INVALID);
            fx_mean.push(INVALID);
            continue;
        }
        let slice = &by_ustar[w.start as usize..=w.end as usize];
        let n = slice.len() as f64;
        ustar_mean.push(slice.iter().map(|r| r.ustar).sum::<f64>() / n);
        fx_mean.push(slice.iter().map(|r| r.nee).sum::<f64>() / n);
    }
    Some(TaClassStat { ustar_mean, fx_mean })
}

pub(crate) fn thresholds_for_season(
    rows: &[&UstarRow],
    config: &UstarConfig,
) -> ([f64; 6], [Vec<bool>; 6]) {
    let mut by_ta: Vec<&&UstarRow> = rows.iter().collect();
    by_ta.sort_by(|a, b| a.ta.partial_cmp(&b.ta).unwrap());
    let ta_keys: Vec<f64> = by_ta.iter().map(|r| r.ta).collect();
    let ustar_keys_for_corr: Vec<f64> = by_ta.iter().map(|r| r.ustar).collect();
    let ta_windows = classify(&ta_keys, config.ta_classes);

    let mut per_mode: [Vec<f64>; 6] = std::array::from_fn(|_| Vec::new());
    let mut percentiled: [Vec<bool>; 6] = std::array::from_fn(|_| Vec::new());

    for w in &ta_windows {
        if w.is_empty() || w.len() < config.ta_class_min_sample {
            continue;
        }
        let start = w.start as usize;
        let end = w.end as usize + 1;

        let corr = correlation(&ta_keys, &ustar_keys_for_corr, start, end);
        if corr.abs() > config.correlation_check {
            continue;
        }

        let class_rows: Vec<&UstarRow> = by_ta[start..end].iter().map(|r| **r).collect();
        let Some(stat) = bin_means(&class_rows, config.ustar_classes) else {
            continue;
        };
        if !is_valid(stat.ustar_mean[0]) || stat.ustar_mean[0] > config.first_ustar_mean_check {
            continue;
        }
        let un = stat.ustar_mean.len();

        for (i, mode) in Mode::ALL.into_iter().enumerate() {
            let outcome = if mode.is_forward() {
                forward_mode(
                    &stat.ustar_mean,
                    &stat.fx_mean,
                    un,
                    config.forward_window,
                    mode.n(),
                    config.percentile_check,
                    config.percentile_value,
                    config.threshold_check,
                )
            } else {
                back_mode(
                    &stat.ustar_mean,
                    &stat.fx_mean,
                    un,
                    config.back_window,
                    mode.n(),
                    config.percentile_check,
                    config.percentile_value,
                    config.threshold_check,
                )
            };
            per_mode[i].push(outcome.value());
            percentiled[i].push(outcome.is_percentiled());
        }
    }

    let mut result = [INVALID; 6];
    for (i, values) in per_mode.iter().enumerate() {
        result[i] = median_filtered(values);
    }
    (result, percentiled)
}

/// Buckets `rows` by season, tagging each nighttime/fully-valid row with
/// its original position so [`season_layout_from_buckets`] can restore
/// row order after a resampling pass shuffles it. Also returns the
/// daytime row count, needed by the same collapse decision.
pub(crate) fn bucket_by_season<'a>(
    rows: &'a [UstarRow],
    seasons: &SeasonGroups,
    config: &UstarConfig,
) -> (Vec<Vec<(usize, &'a UstarRow)>>, usize) {
    let season_count = seasons.len().max(1);
    let mut by_season: Vec<Vec<(usize, &UstarRow)>> = vec![Vec::new(); season_count];
    let mut day_rows = 0usize;
    for (idx, row) in rows.iter().enumerate() {
        if row.all_valid() && row.is_night(config.swin_for_night) {
            let season_idx = seasons.season_of_timestamp(&row.timestamp).unwrap_or(0);
            by_season[season_idx.min(season_count - 1)].push((idx, row));
        } else if is_valid(row.swin) && row.swin >= config.swin_for_night {
            day_rows += 1;
        }
    }
    (by_season, day_rows)
}

/// Season selection, in order: if `night_rows + day_rows >= min_value_period`
/// the configured seasons are used, unless every one of them still falls
/// short of `ta_class_min_sample * ta_classes` samples, in which case the
/// record collapses to one season regardless. If the combined count falls
/// short of `min_value_period`, the record collapses to one season when
/// it has more than `min_value_season` nighttime rows, and fails
/// otherwise. Collapsed groups are restored to original row order, per
/// row index, since a resampled bucket does not arrive pre-sorted.
pub(crate) fn season_layout_from_buckets<'a>(
    mut by_season: Vec<Vec<(usize, &'a UstarRow)>>,
    day_rows: usize,
    config: &UstarConfig,
) -> Result<Vec<Vec<&'a UstarRow>>> {
    for bucket in &mut by_season {
        bucket.sort_by_key(|(idx, _)| *idx);
    }
    let total_rows: usize = by_season.iter().map(Vec::len).sum();

    let collapsed = |by_season: &[Vec<(usize, &'a UstarRow)>]| -> Vec<&'a UstarRow> {
        let mut all: Vec<(usize, &UstarRow)> = by_season.iter().flatten().copied().collect();
        all.sort_by_key(|(idx, _)| *idx);
        all.into_iter().map(|(_, row)| row).collect()
    };

    if total_rows + day_rows < config.min_value_period {
        if total_rows > config.min_value_season {
            return Ok(vec![collapsed(&by_season)]);
        }
        return Err(Error::NotEnoughValues {
            valid: total_rows,
            required: config.min_value_season,
        });
    }

    let every_season_too_small = by_season
        .iter()
        .all(|s| s.len() < config.ta_class_min_sample * config.ta_classes);
    if every_season_too_small {
        return Ok(vec![collapsed(&by_season)]);
    }

    Ok(by_season
        .into_iter()
        .map(|bucket| bucket.into_iter().map(|(_, row)| row).collect())
        .collect())
}

/// Nighttime, fully-valid rows grouped into their (possibly collapsed)
/// seasons, shared by [`estimate_thresholds`] and the bootstrap wrapper.
/// See [`season_layout_from_buckets`] for the collapse rule.
pub(crate) fn seasonal_groups<'a>(
    rows: &'a [UstarRow],
    seasons: &SeasonGroups,
    config: &UstarConfig,
) -> Result<Vec<Vec<&'a UstarRow>>> {
    config.validate(rows.len())?;
    let (by_season, day_rows) = bucket_by_season(rows, seasons, config);
    season_layout_from_buckets(by_season, day_rows, config)
}

/// Derives `u*` thresholds from nighttime observations, following the
/// season grouping in `seasons`.
///
/// Collapses to a single season covering the whole record when the
/// per-season sample counts are too small to support `seasons` (see
/// `DESIGN.md` for the exact collapse rule), and fails outright if even
/// the collapsed single season does not have enough nighttime data.
pub fn estimate_thresholds(
    rows: &[UstarRow],
    seasons: &SeasonGroups,
    config: &UstarConfig,
    _resolution: crate::calendar::Resolution,
) -> Result<UstarResult> {
    let groups = seasonal_groups(rows, seasons, config)?;

    let mut thresholds = Vec::with_capacity(groups.len());
    let mut percentiled = Vec::with_capacity(groups.len());
    let mut samples = Vec::with_capacity(groups.len());
    let mut selected = USTAR_THRESHOLD_NOT_FOUND;
    for group in &groups {
        let (season_thresholds, season_percentiled) = thresholds_for_season(group, config);
        let season_median = median_filtered(&season_thresholds);
        if is_valid(season_median) && (selected == USTAR_THRESHOLD_NOT_FOUND || season_median > selected) {
            selected = season_median;
        }
        thresholds.push(season_thresholds);
        percentiled.push(season_percentiled);
        samples.push(group.len());
    }

    Ok(UstarResult {
        thresholds,
        percentiled,
        samples,
        selected,
    })
}
