#[macro_use]
extern crate log;

mod cli;
mod csv_io;
mod processing;
mod report;

use clap::Parser;
use cli::{Cli, Command};
use fluxqc::bootstrap::{self, BootstrapConfig};
use fluxqc::mds::{self, MdsConfig};
use fluxqc::season::SeasonGroups;
use fluxqc::ustar::{self, UstarConfig};
use std::fs::{self, File};

fn main() {
    let mut builder = env_logger::Builder::new();
    builder.target(env_logger::Target::Stdout);
    let cli = Cli::parse();
    builder.filter_level(if cli.quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    });
    builder.init();

    let seasons = match SeasonGroups::parse(&cli.date) {
        Ok(seasons) => seasons,
        Err(err) => {
            error!("invalid --date season grouping: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = fs::create_dir_all(&cli.output) {
        error!("could not create output directory {}: {err}", cli.output.display());
        std::process::exit(1);
    }

    let files = processing::discover_inputs(&cli);
    if files.is_empty() {
        warn!("no input files found");
        return;
    }

    let mut processed = 0usize;
    let mut skipped = 0usize;

    for path in &files {
        let outcome = match &cli.command {
            Command::Ustar { bootstrap: iterations } => run_ustar(&cli, path, &seasons, *iterations),
            Command::Fill {
                rows_min,
                sw_in_tolerance,
                ta_tolerance,
                vpd_tolerance,
            } => run_fill(&cli, path, *rows_min, sw_in_tolerance, *ta_tolerance, *vpd_tolerance),
        };

        match outcome {
            Ok(()) => {
                info!("{}: ok", path.display());
                processed += 1;
            }
            Err(reason) => {
                warn!("{}: skipped ({reason})", path.display());
                skipped += 1;
            }
        }
    }

    info!("{} file(s) found: {processed} processed, {skipped} skipped.", files.len());
}

fn run_ustar(
    cli: &Cli,
    path: &std::path::Path,
    seasons: &SeasonGroups,
    iterations: usize,
) -> Result<(), String> {
    let rows = processing::load_ustar_rows(path, cli).ok_or("missing required columns")?;
    let resolution = processing::active_resolution(cli);
    let config = UstarConfig::default();

    let result =
        ustar::estimate_thresholds(&rows, seasons, &config, resolution).map_err(|e| e.to_string())?;

    let out_path = cli.output.join(output_name(path, "ustar.txt"));
    let file = File::create(&out_path).map_err(|e| e.to_string())?;
    report::write_ustar_report(file, &result).map_err(|e| e.to_string())?;

    if iterations > 0 {
        let boot_config = BootstrapConfig {
            iterations,
            ustar: config,
            ..BootstrapConfig::default()
        };
        let boot_report =
            bootstrap::run_bootstrap(&rows, seasons, &boot_config, resolution).map_err(|e| e.to_string())?;
        let boot_path = cli.output.join(output_name(path, "bootstrap.txt"));
        let file = File::create(&boot_path).map_err(|e| e.to_string())?;
        report::write_bootstrap_report(file, &boot_report).map_err(|e| e.to_string())?;
    }

    Ok(())
}

fn run_fill(
    cli: &Cli,
    path: &std::path::Path,
    rows_min: usize,
    sw_in_tolerance: &str,
    ta_tolerance: f64,
    vpd_tolerance: f64,
) -> Result<(), String> {
    let rows = processing::load_mds_rows(path, cli).ok_or("missing required columns")?;
    let resolution = processing::active_resolution(cli);
    let (sw_in_tolerance_min, sw_in_tolerance_max) = parse_sw_in_tolerance(sw_in_tolerance)?;
    let config = MdsConfig {
        rows_min,
        sw_in_tolerance_min,
        sw_in_tolerance_max,
        ta_tolerance,
        vpd_tolerance,
        ..MdsConfig::default()
    };

    let outcome = mds::fill_gaps(&rows, &config, resolution);

    let out_path = cli.output.join(output_name(path, "filled.csv"));
    let file = File::create(&out_path).map_err(|e| e.to_string())?;
    report::write_gap_csv(file, &cli.to_fill, &outcome).map_err(|e| e.to_string())?;

    if outcome.unfilled > 0 {
        info!("{} gap(s) left unfilled", outcome.unfilled);
    }
    Ok(())
}

fn parse_sw_in_tolerance(spec: &str) -> Result<(f64, f64), String> {
    let (min, max) = spec
        .split_once(',')
        .ok_or_else(|| format!("-sw_int expects \"min,max\", got {spec:?}"))?;
    let min: f64 = min.trim().parse().map_err(|_| format!("bad sw_int min {min:?}"))?;
    let max: f64 = max.trim().parse().map_err(|_| format!("bad sw_int max {max:?}"))?;
    Ok((min, max))
}

fn output_name(input: &std::path::Path, suffix: &str) -> String {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    format!("{stem}_{suffix}")
}
