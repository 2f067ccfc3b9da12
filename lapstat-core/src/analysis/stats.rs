//! Per-driver lap time statistics

use crate::model::{AggregateStat, DriverMap, LapRecord, LapSeries, SectorBests};
use crate::units::Seconds;
use std::collections::BTreeMap;

/// Mean and population standard deviation of a driver's lap times
///
/// Returns `None` for an empty slice.
pub fn lap_time_stat(laps: &[LapRecord]) -> Option<AggregateStat> {
    if laps.is_empty() {
        return None;
    }

    let count = laps.len() as f64;
    let mean = laps.iter().map(|l| l.lap_time.0).sum::<f64>() / count;
    let variance = laps
        .iter()
        .map(|l| (l.lap_time.0 - mean).powi(2))
        .sum::<f64>()
        / count;

    Some(AggregateStat {
        mean: Seconds(mean),
        std_dev: Seconds(variance.sqrt()),
        lap_count: laps.len(),
    })
}

/// [`lap_time_stat`] for every driver of a series, filtered or not
pub fn aggregate(series: &LapSeries) -> DriverMap<AggregateStat> {
    series
        .iter()
        .filter_map(|(driver, laps)| lap_time_stat(laps).map(|stat| (driver.clone(), stat)))
        .collect()
}

/// Best possible lap per companion nickname
pub fn best_possible_laps(bests: &SectorBests) -> BTreeMap<String, Option<Seconds>> {
    bests
        .iter()
        .map(|(driver, best)| (driver.clone(), best.best_possible_lap()))
        .collect()
}
