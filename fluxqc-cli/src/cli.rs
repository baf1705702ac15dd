use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "fluxqc-cli",
    author,
    version,
    about = "Derive u* thresholds and gap-fill NEE time series"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// One or more input CSV files or directories to walk.
    #[arg(long, global = true, required = true)]
    pub input: Vec<PathBuf>,

    /// Directory new output files are written into.
    #[arg(long, global = true, default_value = "./out")]
    pub output: PathBuf,

    /// Treat input as hourly instead of half-hourly.
    #[arg(long, global = true)]
    pub hourly: bool,

    /// Column holding the gap-fill/threshold target (e.g. NEE).
    #[arg(long = "tofill", global = true)]
    pub to_fill: String,

    /// Air temperature column.
    #[arg(long = "ta", global = true)]
    pub ta: String,

    /// Incoming shortwave radiation column.
    #[arg(long = "sw_in", global = true)]
    pub sw_in: String,

    /// Vapor pressure deficit column.
    #[arg(long = "vpd", global = true)]
    pub vpd: Option<String>,

    /// Friction velocity column (only needed for `ustar`).
    #[arg(long = "ustar", global = true)]
    pub ustar: Option<String>,

    /// Month season grouping, e.g. "12,1,2;3,4,5;6,7,8;9,10,11".
    #[arg(long = "date", global = true, default_value = "12,1,2;3,4,5;6,7,8;9,10,11")]
    pub date: String,

    /// Suppress informational logging; only warnings and errors.
    #[arg(long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Estimate u* thresholds (nested binning + bootstrap).
    Ustar {
        /// Number of bootstrap iterations; 0 disables bootstrapping.
        #[arg(long, default_value_t = 100)]
        bootstrap: usize,
    },
    /// Gap-fill the target column with Marginal Distribution Sampling.
    Fill {
        /// Minimum valid-sample count accepted by a look-alike window.
        #[arg(long = "rows_min", default_value_t = 2)]
        rows_min: usize,

        /// SW_IN tolerance clamp as "min,max", W/m^2.
        #[arg(long = "sw_int", default_value = "20,50")]
        sw_in_tolerance: String,

        /// TA tolerance, degrees C.
        #[arg(long = "tat", default_value_t = 2.5)]
        ta_tolerance: f64,

        /// VPD tolerance, hPa.
        #[arg(long = "vpdt", default_value_t = 5.0)]
        vpd_tolerance: f64,
    },
}
