//! Bootstrap wrapper around the u* threshold engine (BOOT).
//!
//! Resamples the nighttime record with replacement, re-derives
//! thresholds for every mode on each draw, and reports the spread of
//! the resulting distribution via a fixed percentile set.

use crate::calendar::Resolution;
use crate::errors::Result;
use crate::season::SeasonGroups;
use crate::sentinel::{USTAR_THRESHOLD_NOT_FOUND, is_valid};
use crate::stat::percentile;
use crate::ustar::{Mode, UstarConfig, UstarRow, season_layout_from_buckets, thresholds_for_season};
use rand::Rng;

/// The percentiles reported for each mode's bootstrap distribution.
pub const PERCENTILES: [f64; 9] = [1.0, 5.0, 10.0, 25.0, 50.0, 75.0, 90.0, 95.0, 99.0];

#[derive(Debug, Clone, Copy)]
pub struct BootstrapConfig {
    pub iterations: usize,
    pub min_valid_for_percentiles: usize,
    pub ustar: UstarConfig,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            min_valid_for_percentiles: 9,
            ustar: UstarConfig::default(),
        }
    }
}

/// Outcome of the bootstrap for one mode: the full set of per-iteration
/// "selected" thresholds, the sorted subset that fed the percentile
/// table, and the table itself if enough draws were valid.
#[derive(Debug, Clone, Default)]
pub struct ModeReport {
    pub draws: Vec<f64>,
    pub sorted_valid: Vec<f64>,
    pub percentiles: Option<[f64; 9]>,
}

/// One season's threshold row within one bootstrap iteration.
#[derive(Debug, Clone, Copy)]
pub struct IterationSeasonRecord {
    pub thresholds: [f64; 6],
    pub sample_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BootstrapReport {
    pub modes: [ModeReport; 6],
    /// `iterations[i]` is the per-season record set produced by draw
    /// `i`; season count may vary between iterations if a draw collapses
    /// to a single season while another doesn't.
    pub iterations: Vec<Vec<IterationSeasonRecord>>,
    /// One-line summary of how this report was produced.
    pub provenance: String,
}

/// Runs `config.iterations` resampling rounds over `rows` and reports,
/// per mode, the distribution of the season-maximum threshold.
///
/// Every iteration draws `rows.len()` indices, with replacement, from
/// the full row space (day rows included), then re-derives the season
/// partition and the season-collapse decision from scratch on that
/// draw — it does not reuse a season layout computed once up front.
pub fn run_bootstrap(
    rows: &[UstarRow],
    seasons: &SeasonGroups,
    config: &BootstrapConfig,
    resolution: Resolution,
) -> Result<BootstrapReport> {
    config.ustar.validate(rows.len())?;
    let _ = resolution;
    let season_count = seasons.len().max(1);

    let mut report = BootstrapReport::default();
    let mut rng = rand::thread_rng();

    for _ in 0..config.iterations {
        let mut by_season: Vec<Vec<(usize, &UstarRow)>> = vec![Vec::new(); season_count];
        let mut day_rows = 0usize;
        for _ in 0..rows.len() {
            let idx = rng.gen_range(0..rows.len());
            let row = &rows[idx];
            if row.all_valid() && row.is_night(config.ustar.swin_for_night) {
                let season_idx = seasons.season_of_timestamp(&row.timestamp).unwrap_or(0);
                by_season[season_idx.min(season_count - 1)].push((idx, row));
            } else if is_valid(row.swin) && row.swin >= config.ustar.swin_for_night {
                day_rows += 1;
            }
        }

        let groups = season_layout_from_buckets(by_season, day_rows, &config.ustar).unwrap_or_default();

        let mut per_mode_seasonal: [Vec<f64>; 6] = std::array::from_fn(|_| Vec::new());
        let mut iteration_record = Vec::with_capacity(groups.len());
        for group in &groups {
            if group.is_empty() {
                continue;
            }
            let (season_thresholds, _) = thresholds_for_season(group, &config.ustar);
            for (i, value) in season_thresholds.into_iter().enumerate() {
                per_mode_seasonal[i].push(value);
            }
            iteration_record.push(IterationSeasonRecord {
                thresholds: season_thresholds,
                sample_count: group.len(),
            });
        }
        report.iterations.push(iteration_record);

        for (mode_idx, _) in Mode::ALL.into_iter().enumerate() {
            let taken = per_mode_seasonal[mode_idx]
                .iter()
                .copied()
                .filter(|v| is_valid(*v) && (*v - USTAR_THRESHOLD_NOT_FOUND).abs() > 1e-7)
                .fold(USTAR_THRESHOLD_NOT_FOUND, f64::max);
            report.modes[mode_idx].draws.push(taken);
        }
    }

    for mode_report in &mut report.modes {
        let mut valid: Vec<f64> = mode_report
            .draws
            .iter()
            .copied()
            .filter(|v| is_valid(*v) && (*v - USTAR_THRESHOLD_NOT_FOUND).abs() > 1e-7)
            .collect();
        valid.sort_by(|a, b| a.partial_cmp(b).unwrap());
        mode_report.sorted_valid = valid.clone();
        if valid.len() >= config.min_valid_for_percentiles {
            let mut table = [0.0; 9];
            for (i, p) in PERCENTILES.iter().enumerate() {
                table[i] = percentile(&valid, *p);
            }
            mode_report.percentiles = Some(table);
        }
    }

    report.provenance = format!(
        "bootstrap: {} iteration(s) over {} row(s), {} configured season(s)",
        config.iterations,
        rows.len(),
        seasons.len(),
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Timestamp;

    fn synthetic_rows(n: usize) -> Vec<UstarRow> {
        (0..n)
            .map(|i| {
                let ustar = 0.05 + (i as f64 % 50.0) * 0.02;
                let plateau = 0.5;
                let nee = if ustar < plateau {
                    ustar * 10.0
                } else {
                    plateau * 10.0 + (i as f64 % 3.0) * 0.01
                };
                UstarRow {
                    timestamp: Timestamp::new(2021, (i % 12) as u8 + 1, 1, 1, 0, 0),
                    nee,
                    ta: (i as f64 % 30.0) - 10.0,
                    ustar,
                    swin: 0.0,
                    ta_interpolated: false,
                    swin_interpolated: false,
                }
            })
            .collect()
    }

    #[test]
    fn bootstrap_reports_all_six_modes() {
        let seasons = SeasonGroups::parse("1,2,3;4,5,6;7,8,9;10,11,12").unwrap();
        let rows = synthetic_rows(5000);
        let config = BootstrapConfig {
            iterations: 5,
            ..BootstrapConfig::default()
        };
        let report = run_bootstrap(&rows, &seasons, &config, Resolution::HalfHourly).unwrap();
        assert_eq!(report.modes.len(), 6);
        for mode in &report.modes {
            assert_eq!(mode.draws.len(), 5);
        }
    }

    #[test]
    fn too_few_draws_skip_percentiles() {
        let seasons = SeasonGroups::parse("1,2,3;4,5,6;7,8,9;10,11,12").unwrap();
        let rows = synthetic_rows(5000);
        let config = BootstrapConfig {
            iterations: 3,
            ..BootstrapConfig::default()
        };
        let report = run_bootstrap(&rows, &seasons, &config, Resolution::HalfHourly).unwrap();
        for mode in &report.modes {
            assert!(mode.percentiles.is_none());
        }
    }
}
