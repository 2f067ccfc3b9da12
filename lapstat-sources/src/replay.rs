//! Replay document decoding and normalization
//!
//! The replay service returns one JSON document per session with three
//! collections: `cars`, `drivers` and `laps`. Cars and drivers are joined
//! into [`DriverIdentity`] values; laps are grouped per identity.
//!
//! The `laps` collection is messy. Entries can be `null`, and entries for
//! laps that were never completed lack `topSpeedKMH`. Both are skipped.

use lapstat_core::analysis::filter_outliers;
use lapstat_core::error::{ReferenceKind, SourceError};
use lapstat_core::model::{DriverIdentity, LapRecord, LapSeries, LapValidity};
use lapstat_core::units::{KilometersPerHour, Milliseconds};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Identifier of a car or driver
///
/// The document uses numbers, but string ids are accepted and compare equal
/// to their numeric spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(serde_json::Number),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => Self(n.to_string()),
            RawId::Text(s) => Self(s),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayCar {
    pub id: RecordId,
    pub car_model_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayDriver {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub car_id: RecordId,
    pub short_name: String,
}

/// One entry of the `laps` collection; every field may be missing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayLap {
    pub driver_id: Option<RecordId>,
    pub lap_number: Option<u32>,
    #[serde(rename = "lapTimeMS")]
    pub lap_time_ms: Option<f64>,
    pub is_valid: Option<bool>,
    #[serde(rename = "topSpeedKMH")]
    pub top_speed_kmh: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayDocument {
    #[serde(default)]
    pub cars: Vec<ReplayCar>,
    #[serde(default)]
    pub drivers: Vec<ReplayDriver>,
    #[serde(default)]
    pub laps: Vec<Option<ReplayLap>>,
}

impl ReplayDocument {
    /// Decode a replay document; `location` only labels errors
    pub fn from_json(text: &str, location: &str) -> Result<Self, SourceError> {
        serde_json::from_str(text).map_err(|source| SourceError::Decode {
            location: location.to_owned(),
            source,
        })
    }
}

/// Whether the lap normalizer trims outliers before returning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    /// Drop each driver's slowest laps (see [`filter_outliers`])
    #[default]
    Filtered,
    Unfiltered,
}

/// Driver id -> identity, joining drivers with their cars
///
/// A driver referencing a car the document does not define is fatal.
pub fn resolve_drivers(
    doc: &ReplayDocument,
) -> Result<HashMap<RecordId, DriverIdentity>, SourceError> {
    let cars: HashMap<&RecordId, &str> = doc
        .cars
        .iter()
        .map(|car| (&car.id, car.car_model_name.as_str()))
        .collect();

    doc.drivers
        .iter()
        .map(|driver| {
            let car_model = cars
                .get(&driver.car_id)
                .ok_or_else(|| SourceError::malformed(ReferenceKind::Car, &driver.car_id))?;
            let identity = DriverIdentity::from_parts(
                &driver.first_name,
                &driver.last_name,
                car_model,
                &driver.short_name,
            );
            Ok((driver.id.clone(), identity))
        })
        .collect()
}

/// Group the document's complete laps per driver, in source order
///
/// Null entries and entries missing any field are skipped. A complete entry
/// for an unknown driver id is fatal.
pub fn normalize_laps(
    doc: &ReplayDocument,
    identities: &HashMap<RecordId, DriverIdentity>,
    mode: FilterMode,
) -> Result<LapSeries, SourceError> {
    let mut series = LapSeries::new();
    let mut skipped = 0usize;

    for entry in &doc.laps {
        let Some(lap) = entry else {
            skipped += 1;
            continue;
        };
        let (
            Some(driver_id),
            Some(lap_number),
            Some(lap_time_ms),
            Some(is_valid),
            Some(top_speed),
        ) = (
            lap.driver_id.as_ref(),
            lap.lap_number,
            lap.lap_time_ms,
            lap.is_valid,
            lap.top_speed_kmh,
        ) else {
            skipped += 1;
            continue;
        };
        let driver = identities
            .get(driver_id)
            .ok_or_else(|| SourceError::malformed(ReferenceKind::Driver, driver_id))?;

        series.push(
            driver.clone(),
            LapRecord {
                lap_number,
                lap_time: Milliseconds(lap_time_ms).as_seconds(),
                validity: LapValidity::from_replay_flag(is_valid),
                top_speed: KilometersPerHour(top_speed),
            },
        );
    }

    debug!(
        drivers = series.len(),
        laps = series.lap_count(),
        skipped,
        "Normalized replay laps"
    );

    Ok(match mode {
        FilterMode::Unfiltered => series,
        FilterMode::Filtered => {
            let filtered = filter_outliers(&series);
            for dropped in series.drivers().filter(|d| !filtered.contains(d)) {
                debug!(driver = %dropped, "Driver has no laps left after outlier filtering");
            }
            filtered
        }
    })
}

/// Resolve drivers and normalize laps in one step
pub fn parse_replay(doc: &ReplayDocument, mode: FilterMode) -> Result<LapSeries, SourceError> {
    let identities = resolve_drivers(doc)?;
    normalize_laps(doc, &identities, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_accepts_numbers_and_strings() {
        let ids: Vec<RecordId> = serde_json::from_str(r#"[7, "7", "car-9"]"#).unwrap();
        assert_eq!(ids[0], ids[1]);
        assert_eq!(ids[2], RecordId::new("car-9"));
    }

    #[test]
    fn test_lap_fields_are_optional() {
        let lap: ReplayLap = serde_json::from_str(r#"{"driverId": 3, "lapNumber": 1}"#).unwrap();
        assert_eq!(lap.driver_id, Some(RecordId::new("3")));
        assert_eq!(lap.lap_number, Some(1));
        assert!(lap.top_speed_kmh.is_none());
        assert!(lap.lap_time_ms.is_none());
    }

    #[test]
    fn test_null_lap_entries_decode() {
        let doc: ReplayDocument =
            serde_json::from_str(r#"{"cars": [], "drivers": [], "laps": [null, {}]}"#).unwrap();
        assert_eq!(doc.laps.len(), 2);
        assert!(doc.laps[0].is_none());
        assert!(doc.laps[1].is_some());
    }

    #[test]
    fn test_decode_error_carries_location() {
        let err = ReplayDocument::from_json("{not json", "replays/1").unwrap_err();
        assert!(matches!(err, SourceError::Decode { ref location, .. } if location == "replays/1"));
    }
}
