//! `fluxqc` is the numerical core of an eddy-covariance post-processing
//! toolkit. It derives a nighttime friction-velocity (`u*`) filtering
//! threshold and gap-fills a net-ecosystem-exchange (NEE) time series
//! using Marginal Distribution Sampling (MDS, Reichstein et al. 2005).
//!
//! # u* threshold
//! ```
//! use fluxqc::calendar::Resolution;
//! use fluxqc::season::SeasonGroups;
//! use fluxqc::ustar::{UstarConfig, UstarRow, estimate_thresholds};
//!
//! let seasons = SeasonGroups::parse("1,2,3;4,5,6;7,8,9;10,11,12").unwrap();
//! let config = UstarConfig::default();
//! let rows: Vec<UstarRow> = Vec::new();
//! let result = estimate_thresholds(&rows, &seasons, &config, Resolution::HalfHourly);
//! assert!(result.is_err()); // not enough samples in this toy example
//! ```
//!
//! # MDS gap-filling
//! ```
//! use fluxqc::calendar::Resolution;
//! use fluxqc::mds::{MdsConfig, MdsRow, fill_gaps};
//!
//! let rows: Vec<MdsRow> = Vec::new();
//! let outcome = fill_gaps(&rows, &MdsConfig::default(), Resolution::HalfHourly);
//! assert_eq!(outcome.results.len(), 0);
//! ```

pub mod bootstrap;
pub mod calendar;
pub mod classer;
pub mod errors;
pub mod mds;
pub mod row;
pub mod season;
pub mod sentinel;
pub mod stat;
pub mod ustar;

pub mod prelude {
    pub use crate::bootstrap::{BootstrapConfig, BootstrapReport, run_bootstrap};
    pub use crate::calendar::{Resolution, Timestamp, YearCalendar};
    pub use crate::classer::{Window, classify};
    pub use crate::errors::{Error, Result};
    pub use crate::mds::{GapResult, Method, MdsConfig, MdsRow, fill_gaps};
    pub use crate::season::SeasonGroups;
    pub use crate::sentinel::{INVALID, is_valid};
    pub use crate::ustar::{Mode, UstarConfig, UstarResult, UstarRow, estimate_thresholds};
}
