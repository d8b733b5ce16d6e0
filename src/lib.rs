//! Stat-view tables for a surveillance data release.
//!
//! Loads the sample, mutation-call and clade-call tables of one release,
//! normalizes dates and geography, and writes the battery of per-period
//! cross-tabulations the stat pages are built from.

pub mod axis;
pub mod crosstab;
pub mod error;
pub mod loader;
pub mod output;
pub mod reports;
pub mod runner;
pub mod types;
pub mod util;

pub use crosstab::{cross_tab, CrossTab, CrossTabRow};
pub use error::StatError;
pub use runner::{run, RunConfig, RunSummary};
pub use types::{Field, Granularity};
