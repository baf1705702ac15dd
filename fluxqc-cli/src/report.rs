//! Output writers: the u*/bootstrap fixed-width report and the MDS gap
//! CSV, both mirroring the column layout of the reference tools.

use fluxqc::bootstrap::{BootstrapReport, PERCENTILES};
use fluxqc::mds::GapFillOutcome;
use fluxqc::stat::median_filtered;
use fluxqc::ustar::{Mode, UstarResult};
use std::io::{self, Write};

const TABSPACE: usize = 15;

/// Writes the per-season, per-mode threshold table, per-season sample
/// counts, per-season selected threshold (the per-season median across
/// modes), and the overall selected threshold.
pub fn write_ustar_report<W: Write>(mut out: W, result: &UstarResult) -> io::Result<()> {
    write!(out, "{:>TABSPACE$}", "season")?;
    for mode in Mode::ALL {
        write!(out, "{:>TABSPACE$}", mode.to_string())?;
    }
    write!(out, "{:>TABSPACE$}", "samples")?;
    write!(out, "{:>TABSPACE$}", "median")?;
    writeln!(out)?;

    for (season, thresholds) in result.thresholds.iter().enumerate() {
        write!(out, "{season:>TABSPACE$}")?;
        for (mode_idx, value) in thresholds.iter().enumerate() {
            let any_percentiled = result
                .percentiled
                .get(season)
                .map(|p| p[mode_idx].iter().any(|&b| b))
                .unwrap_or(false);
            let cell = if any_percentiled {
                format!("{value:.5}*")
            } else {
                format!("{value:.5}")
            };
            write!(out, "{cell:>TABSPACE$}")?;
        }
        let samples = result.samples.get(season).copied().unwrap_or(0);
        write!(out, "{samples:>TABSPACE$}")?;
        write!(out, "{:>TABSPACE$.5}", median_filtered(thresholds))?;
        writeln!(out)?;
    }

    writeln!(out, "\nselected: {:.5}", result.selected)
}

/// Writes the bootstrap section: one block per iteration listing each
/// mode's per-season median and sample count, then per-mode sorted
/// valid draws, then the per-mode percentile table, then a provenance
/// line.
pub fn write_bootstrap_report<W: Write>(mut out: W, report: &BootstrapReport) -> io::Result<()> {
    for (iter_idx, seasons) in report.iterations.iter().enumerate() {
        writeln!(out, "iteration {iter_idx}")?;
        write!(out, "{:>TABSPACE$}", "season")?;
        for mode in Mode::ALL {
            write!(out, "{:>TABSPACE$}", mode.to_string())?;
        }
        write!(out, "{:>TABSPACE$}", "samples")?;
        writeln!(out)?;
        for (season_idx, record) in seasons.iter().enumerate() {
            write!(out, "{season_idx:>TABSPACE$}")?;
            for value in record.thresholds {
                write!(out, "{value:>TABSPACE$.5}")?;
            }
            write!(out, "{:>TABSPACE$}", record.sample_count)?;
            writeln!(out)?;
        }
    }
    writeln!(out)?;

    for (mode, mode_report) in Mode::ALL.into_iter().zip(&report.modes) {
        write!(out, "{:>TABSPACE$} sorted valid:", mode)?;
        for value in &mode_report.sorted_valid {
            write!(out, " {value:.5}")?;
        }
        writeln!(out)?;
    }
    writeln!(out)?;

    write!(out, "{:>TABSPACE$}", "mode")?;
    for p in PERCENTILES {
        write!(out, "{:>TABSPACE$}", format!("p{p:.0}"))?;
    }
    writeln!(out)?;

    for (mode, mode_report) in Mode::ALL.into_iter().zip(&report.modes) {
        write!(out, "{:>TABSPACE$}", mode.to_string())?;
        match &mode_report.percentiles {
            Some(table) => {
                for value in table {
                    write!(out, "{value:>TABSPACE$.5}")?;
                }
                writeln!(out)?;
            }
            None => writeln!(out, "{:>TABSPACE$}", "not enough values")?,
        }
    }

    writeln!(out, "\n{}", report.provenance)
}

/// Writes the gap-fill CSV: `TIMESTAMP,<target>,FILLED,QC,HAT,SAMPLE,STDDEV,METHOD,QC_HAT,TIMEWINDOW`.
pub fn write_gap_csv<W: Write>(mut out: W, target_name: &str, outcome: &GapFillOutcome) -> io::Result<()> {
    writeln!(
        out,
        "TIMESTAMP,{target_name},FILLED,QC,HAT,SAMPLE,STDDEV,METHOD,QC_HAT,TIMEWINDOW"
    )?;
    for result in &outcome.results {
        let method_tag = result
            .method
            .map(|m| m.to_string())
            .unwrap_or_else(|| "none".to_string());
        writeln!(
            out,
            "{},{:.5},{:.5},{},{:.5},{},{:.5},{},{},{}",
            result.row,
            result.original,
            result.value,
            result.quality,
            result.hat,
            result.samples_count,
            result.stddev,
            method_tag,
            result.quality_hat,
            result.time_window_days,
        )?;
    }
    Ok(())
}
