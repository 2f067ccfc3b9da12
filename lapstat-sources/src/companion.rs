//! Companion-app dump normalization
//!
//! The companion app writes one JSON file per session with a flat `laps`
//! list. Every entry carries the driver's nickname (the same tag the replay
//! document calls `shortName`), pit time, flags, an accident code and sector
//! times, all times in milliseconds.
//!
//! One pass over the laps produces four independent views: pit stops,
//! per-lap validity, incidents and clean sector bests.

use lapstat_core::config::IncidentRule;
use lapstat_core::error::SourceError;
use lapstat_core::model::{
    IncidentEvent, LapValidity, PitStops, SectorBests, ValidityRecords, SECTOR_COUNT,
};
use lapstat_core::units::Milliseconds;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pit entries at or below this are recorder noise
pub const PIT_NOISE_THRESHOLD: Milliseconds = Milliseconds(10_000.0);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanionLap {
    pub driver_nick_name: String,
    pub lap_number: u32,
    #[serde(default)]
    pub pit_time: f64,
    /// 0 for a clean lap; a lap without flags is skipped
    #[serde(default)]
    pub flags: Option<i64>,
    #[serde(default)]
    pub accidents: i64,
    #[serde(default)]
    pub sector1: Option<f64>,
    #[serde(default)]
    pub sector2: Option<f64>,
    #[serde(default)]
    pub sector3: Option<f64>,
}

impl CompanionLap {
    fn sector_times(&self) -> [Option<f64>; SECTOR_COUNT] {
        [self.sector1, self.sector2, self.sector3]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanionDump {
    #[serde(default)]
    pub laps: Vec<CompanionLap>,
}

/// Everything derived from one companion dump
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanionDigest {
    pub pit_stops: PitStops,
    pub validity: ValidityRecords,
    pub incidents: Vec<IncidentEvent>,
    pub sector_bests: SectorBests,
}

impl CompanionDump {
    /// Decode a companion dump; `location` only labels errors
    pub fn from_json(text: &str, location: &str) -> Result<Self, SourceError> {
        serde_json::from_str(text).map_err(|source| SourceError::Decode {
            location: location.to_owned(),
            source,
        })
    }

    /// Derive pit stops, validity, incidents and sector bests in one pass
    ///
    /// Laps must be in lap order per driver; validity sequences follow the
    /// document order. Laps without `flags` cannot be classified and are
    /// skipped entirely.
    pub fn digest(&self, incident_rule: &IncidentRule) -> CompanionDigest {
        let mut digest = CompanionDigest::default();
        let mut noise_pits = 0usize;
        let mut incomplete = 0usize;

        for lap in &self.laps {
            let Some(flags) = lap.flags else {
                incomplete += 1;
                continue;
            };
            let driver = &lap.driver_nick_name;

            let pit_time = Milliseconds(lap.pit_time);
            if pit_time > PIT_NOISE_THRESHOLD {
                digest
                    .pit_stops
                    .entry(driver.clone())
                    .or_default()
                    .insert(lap.lap_number, pit_time);
            } else if lap.pit_time > 0.0 {
                noise_pits += 1;
            }

            let validity = LapValidity::from_companion_flags(flags);
            digest
                .validity
                .entry(driver.clone())
                .or_default()
                .push(validity);

            if incident_rule.is_incident(lap.accidents) {
                digest.incidents.push(IncidentEvent {
                    driver: driver.clone(),
                    lap_number: lap.lap_number,
                });
            }

            if validity.is_valid() {
                let best = digest.sector_bests.entry(driver.clone()).or_default();
                for (i, time) in lap.sector_times().into_iter().enumerate() {
                    if let Some(ms) = time {
                        best.observe(i + 1, Milliseconds(ms).as_seconds());
                    }
                }
            }
        }

        debug!(
            laps = self.laps.len(),
            drivers = digest.validity.len(),
            pit_stops = digest.pit_stops.values().map(|p| p.len()).sum::<usize>(),
            noise_pits,
            incomplete,
            incidents = digest.incidents.len(),
            "Digested companion dump"
        );

        digest
    }
}
