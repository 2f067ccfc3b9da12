//! Gap engine
//!
//! Turns lap times into cumulative race time per driver and compares every
//! driver against a reference driver at the same lap index. Drivers that
//! have not completed a lap index take no part in the comparison at that
//! index.

use crate::model::{CumulativeGap, DriverMap, GapPoint, LapRecord, LapSeries};
use crate::units::Seconds;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which driver a gap is measured against at each lap index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapReference {
    /// Gap = largest cumulative time at the index - own time
    #[default]
    MaxElapsed,
    /// Gap = own time - smallest cumulative time at the index
    MinElapsed,
}

impl FromStr for GapReference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "max" | "max_elapsed" => Ok(Self::MaxElapsed),
            "min" | "min_elapsed" => Ok(Self::MinElapsed),
            other => Err(format!("unknown gap reference '{other}', expected max or min")),
        }
    }
}

impl fmt::Display for GapReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxElapsed => f.write_str("max"),
            Self::MinElapsed => f.write_str("min"),
        }
    }
}

/// Prefix sums of lap times, starting at 0 for the race start
pub fn cumulative_times(laps: &[LapRecord]) -> Vec<Seconds> {
    let mut elapsed = Vec::with_capacity(laps.len() + 1);
    elapsed.push(Seconds(0.0));
    let mut total = Seconds(0.0);
    for lap in laps {
        total = total + lap.lap_time;
        elapsed.push(total);
    }
    elapsed
}

/// Cumulative time and gap per driver per lap index
///
/// Conventionally fed the unfiltered series so every driver keeps the full
/// race length.
pub fn gap_progression(series: &LapSeries, reference: GapReference) -> DriverMap<CumulativeGap> {
    let elapsed: DriverMap<Vec<Seconds>> = series
        .iter()
        .map(|(driver, laps)| (driver.clone(), cumulative_times(laps)))
        .collect();

    let depth = elapsed.values().map(Vec::len).max().unwrap_or(0);
    let references: Vec<Seconds> = (0..depth)
        .map(|i| {
            let at_index = elapsed.values().filter_map(|times| times.get(i)).map(|t| t.0);
            let value = match reference {
                GapReference::MaxElapsed => at_index.fold(f64::NEG_INFINITY, f64::max),
                GapReference::MinElapsed => at_index.fold(f64::INFINITY, f64::min),
            };
            Seconds(value)
        })
        .collect();

    elapsed
        .into_iter()
        .map(|(driver, times)| {
            let points = times
                .iter()
                .zip(&references)
                .enumerate()
                .map(|(lap_index, (own, reference_time))| GapPoint {
                    lap_index,
                    elapsed: *own,
                    gap: match reference {
                        GapReference::MaxElapsed => *reference_time - *own,
                        GapReference::MinElapsed => *own - *reference_time,
                    },
                })
                .collect();
            (driver, points)
        })
        .collect()
}
