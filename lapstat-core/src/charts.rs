//! Chart feeds
//!
//! Series the presentation layer plots directly. Nothing here renders; each
//! function turns normalized or aggregated data into the exact numbers a
//! chart needs.

use crate::model::{
    AggregateStat, DriverMap, IncidentEvent, LapSeries, PitStopEvent, PitStops, ValidityRecords,
};
use crate::units::{KilometersPerHour, Percent, Seconds};
use serde::Serialize;
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Slower laps than this share of the alien time are off the pace
pub const PACE_THRESHOLD_PCT: f64 = 103.0;

/// Density curves start this share of the alien time below it
const DENSITY_WINDOW_LOW: f64 = 0.98;
/// and stop (exclusive) this share above it
const DENSITY_WINDOW_HIGH: f64 = 1.1;
const DENSITY_STEP_S: f64 = 0.05;

/// Alien time and the 103% line
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceLines {
    pub alien_time: Seconds,
    pub pace_threshold: Seconds,
}

impl ReferenceLines {
    pub fn for_alien_time(alien_time: Seconds) -> Self {
        Self {
            alien_time,
            pace_threshold: Seconds(alien_time.0 * PACE_THRESHOLD_PCT / 100.0),
        }
    }
}

/// Mean of the per-lap top speeds of each driver
pub fn mean_top_speed(series: &LapSeries) -> DriverMap<KilometersPerHour> {
    series
        .iter()
        .filter(|(_, laps)| !laps.is_empty())
        .map(|(driver, laps)| {
            let mean = laps.iter().map(|l| l.top_speed.0).sum::<f64>() / laps.len() as f64;
            (driver.clone(), KilometersPerHour(mean))
        })
        .collect()
}

/// Lap times sorted fastest first, as a share of the alien time
pub fn ranked_laps(series: &LapSeries, alien_time: Seconds) -> DriverMap<Vec<Percent>> {
    series
        .iter()
        .map(|(driver, laps)| {
            let mut times: Vec<f64> = laps.iter().map(|l| l.lap_time.0).collect();
            times.sort_by(f64::total_cmp);
            let ranked = times
                .into_iter()
                .map(|t| Percent::of(t, alien_time.0))
                .collect();
            (driver.clone(), ranked)
        })
        .collect()
}

/// One sample of a lap time density curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DensityPoint {
    pub lap_time: Seconds,
    pub density: f64,
}

fn normal_pdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    let z = (x - mean) / std_dev;
    (-0.5 * z * z).exp() / (std_dev * (2.0 * PI).sqrt())
}

/// Sample points of the density window around an alien time
fn density_grid(alien_time: Seconds) -> Vec<f64> {
    let start = alien_time.0 * DENSITY_WINDOW_LOW;
    let end = alien_time.0 * DENSITY_WINDOW_HIGH;
    let steps = ((end - start) / DENSITY_STEP_S).ceil().max(0.0) as usize;
    (0..steps)
        .map(|i| start + i as f64 * DENSITY_STEP_S)
        .filter(|x| *x < end)
        .collect()
}

/// Normal density of each driver's lap times around the alien time
///
/// Drivers with a zero standard deviation get no curve.
pub fn lap_time_density(
    stats: &DriverMap<AggregateStat>,
    alien_time: Seconds,
) -> DriverMap<Vec<DensityPoint>> {
    let grid = density_grid(alien_time);
    stats
        .iter()
        .filter(|(_, stat)| stat.std_dev.0 > 0.0)
        .map(|(driver, stat)| {
            let curve = grid
                .iter()
                .map(|x| DensityPoint {
                    lap_time: Seconds(*x),
                    density: normal_pdf(*x, stat.mean.0, stat.std_dev.0),
                })
                .collect();
            (driver.clone(), curve)
        })
        .collect()
}

/// Valid/invalid lap counts of one driver
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValiditySummary {
    pub valid: usize,
    pub invalid: usize,
    pub valid_share: Percent,
}

pub fn validity_summary(records: &ValidityRecords) -> BTreeMap<String, ValiditySummary> {
    records
        .iter()
        .map(|(driver, laps)| {
            let valid = laps.iter().filter(|v| v.is_valid()).count();
            let invalid = laps.len() - valid;
            let summary = ValiditySummary {
                valid,
                invalid,
                valid_share: Percent::of(valid as f64, laps.len() as f64),
            };
            (driver.clone(), summary)
        })
        .collect()
}

/// Pit stops in driver, then lap order
pub fn pit_stop_events(pit_stops: &PitStops) -> Vec<PitStopEvent> {
    pit_stops
        .iter()
        .flat_map(|(driver, stops)| {
            stops.iter().map(move |(lap_number, duration)| PitStopEvent {
                driver: driver.clone(),
                lap_number: *lap_number,
                duration: *duration,
                seconds: duration.as_seconds(),
            })
        })
        .collect()
}

/// Number of lap ticks needed to show every incident (highest lap + 1)
pub fn incident_lap_span(incidents: &[IncidentEvent]) -> u32 {
    incidents
        .iter()
        .map(|i| i.lap_number.saturating_add(1))
        .max()
        .unwrap_or(0)
}

/// Format a lap time as `MM:SS.ss`
///
/// Rounds to whole centiseconds before splitting off the minutes.
pub fn format_lap_time(time: Seconds) -> String {
    let centis = (time.0.max(0.0) * 100.0).round() as u64;
    let minutes = centis / 6000 % 60;
    let seconds = centis % 6000;
    format!("{minutes:02}:{:02}.{:02}", seconds / 100, seconds % 100)
}
