//! Source-agnostic analysis engines
//!
//! Every function here is pure: it borrows its input and returns a new
//! structure.

pub mod filter;
pub mod gaps;
pub mod stats;

pub use filter::{filter_outliers, filter_outliers_by, trim_slowest, SLOWEST_LAPS_DROPPED};
pub use gaps::{cumulative_times, gap_progression, GapReference};
pub use stats::{aggregate, best_possible_laps, lap_time_stat};
