//! Unified lap data model
//!
//! Defines the per-driver lap records that both source normalizers convert
//! to, and the derived structures the analysis engines produce.
//!
//! Validity convention: every source flag is mapped onto [`LapValidity`] at
//! the normalizer boundary. The replay document's `isValid: true` and the
//! companion dump's `flags == 0` both become [`LapValidity::Valid`].

use crate::units::*;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Number of timed sectors per lap
pub const SECTOR_COUNT: usize = 3;

/// Mapping keyed by driver identity, ordered by (name, short code)
pub type DriverMap<V> = BTreeMap<DriverIdentity, V>;

/// Serialize a [`DriverMap`] as a list of `{ driver, value }` entries
///
/// JSON object keys must be strings, so identity-keyed maps are flattened
/// into a sequence for reports.
pub fn serialize_driver_map<S, V>(map: &DriverMap<V>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    #[derive(Serialize)]
    struct Entry<'a, V> {
        driver: &'a DriverIdentity,
        value: &'a V,
    }

    s.collect_seq(map.iter().map(|(driver, value)| Entry { driver, value }))
}

/// A driver as seen by the replay document
///
/// Equality is structural over both fields, so the same person entered with
/// a different car produces a different identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DriverIdentity {
    /// `"<firstName> <lastName>: <carModelName>"`
    pub name: String,

    /// Fixed-length driver tag, matches the companion dump nickname and the
    /// palette key
    pub short_code: String,
}

impl DriverIdentity {
    pub fn new(name: impl Into<String>, short_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_code: short_code.into(),
        }
    }

    /// Build the display name the way the replay document is rendered
    pub fn from_parts(
        first_name: &str,
        last_name: &str,
        car_model: &str,
        short_code: &str,
    ) -> Self {
        Self::new(format!("{first_name} {last_name}: {car_model}"), short_code)
    }
}

impl fmt::Display for DriverIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.short_code)
    }
}

/// Canonical lap validity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LapValidity {
    Valid,
    Invalid,
}

impl LapValidity {
    /// Replay document: `isValid` is true for a lap that counts
    pub fn from_replay_flag(is_valid: bool) -> Self {
        if is_valid {
            Self::Valid
        } else {
            Self::Invalid
        }
    }

    /// Companion dump: `flags` is 0 for a clean lap, any bit set invalidates it
    pub fn from_companion_flags(flags: i64) -> Self {
        if flags == 0 {
            Self::Valid
        } else {
            Self::Invalid
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        !self.is_valid()
    }
}

/// One completed lap of one driver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    /// Lap number (1-based)
    pub lap_number: u32,

    /// Lap time
    pub lap_time: Seconds,

    /// Whether the lap counts
    pub validity: LapValidity,

    /// Top speed reached during the lap
    pub top_speed: KilometersPerHour,
}

/// Ordered laps per driver
///
/// Laps keep the order they were appended in; the normalizer appends in
/// source order and the outlier filter re-sorts by lap number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LapSeries {
    laps: DriverMap<Vec<LapRecord>>,
}

impl LapSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lap to a driver's series, creating the series if needed
    pub fn push(&mut self, driver: DriverIdentity, lap: LapRecord) {
        self.laps.entry(driver).or_default().push(lap);
    }

    /// Replace a driver's whole series
    pub fn insert(&mut self, driver: DriverIdentity, laps: Vec<LapRecord>) {
        self.laps.insert(driver, laps);
    }

    pub fn get(&self, driver: &DriverIdentity) -> Option<&[LapRecord]> {
        self.laps.get(driver).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DriverIdentity, &[LapRecord])> {
        self.laps.iter().map(|(d, l)| (d, l.as_slice()))
    }

    pub fn drivers(&self) -> impl Iterator<Item = &DriverIdentity> {
        self.laps.keys()
    }

    pub fn contains(&self, driver: &DriverIdentity) -> bool {
        self.laps.contains_key(driver)
    }

    /// Number of drivers
    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    /// Total number of laps across all drivers
    pub fn lap_count(&self) -> usize {
        self.laps.values().map(Vec::len).sum()
    }
}

impl FromIterator<(DriverIdentity, Vec<LapRecord>)> for LapSeries {
    fn from_iter<I: IntoIterator<Item = (DriverIdentity, Vec<LapRecord>)>>(iter: I) -> Self {
        Self {
            laps: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for LapSeries {
    type Item = (DriverIdentity, Vec<LapRecord>);
    type IntoIter = std::collections::btree_map::IntoIter<DriverIdentity, Vec<LapRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.laps.into_iter()
    }
}

impl Serialize for LapSeries {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Entry<'a> {
            driver: &'a DriverIdentity,
            laps: &'a [LapRecord],
        }

        s.collect_seq(self.iter().map(|(driver, laps)| Entry { driver, laps }))
    }
}

/// Pit stop durations: nickname -> lap number -> duration
pub type PitStops = BTreeMap<String, BTreeMap<u32, Milliseconds>>;

/// A single pit stop, flattened out of [`PitStops`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitStopEvent {
    pub driver: String,
    pub lap_number: u32,
    pub duration: Milliseconds,
    pub seconds: Seconds,
}

/// Per-lap validity in lap order: nickname -> validity per lap
pub type ValidityRecords = BTreeMap<String, Vec<LapValidity>>;

/// A lap on which the companion dump reported an incident
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentEvent {
    pub driver: String,
    pub lap_number: u32,
}

/// Best clean sector times of one driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorBest {
    /// Index 0 holds sector 1. `None` until a clean sample is seen.
    pub sectors: [Option<Seconds>; SECTOR_COUNT],
}

impl SectorBest {
    /// Fold a sample into the running minimum of `sector` (1-based).
    /// Out-of-range sector ids are ignored.
    pub fn observe(&mut self, sector: usize, time: Seconds) {
        let Some(slot) = sector.checked_sub(1).and_then(|i| self.sectors.get_mut(i)) else {
            return;
        };
        *slot = match *slot {
            Some(best) if best <= time => Some(best),
            _ => Some(time),
        };
    }

    /// Best time of `sector` (1-based)
    pub fn sector(&self, sector: usize) -> Option<Seconds> {
        sector
            .checked_sub(1)
            .and_then(|i| self.sectors.get(i))
            .copied()
            .flatten()
    }

    pub fn is_complete(&self) -> bool {
        self.sectors.iter().all(Option::is_some)
    }

    /// Sum of the three sector bests, `None` while any sector has no sample
    pub fn best_possible_lap(&self) -> Option<Seconds> {
        self.sectors.iter().copied().sum::<Option<Seconds>>()
    }
}

/// Sector bests per nickname
pub type SectorBests = BTreeMap<String, SectorBest>;

/// Lap time distribution of one driver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateStat {
    pub mean: Seconds,

    /// Population standard deviation
    pub std_dev: Seconds,

    pub lap_count: usize,
}

/// One point of a driver's race progression
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapPoint {
    /// 0 = race start, i = after completing lap i
    pub lap_index: usize,

    /// Cumulative elapsed time
    pub elapsed: Seconds,

    /// Gap to the reference driver at the same index
    pub gap: Seconds,
}

/// Race progression of one driver, one point per completed lap plus the start
pub type CumulativeGap = Vec<GapPoint>;

/// Session kinds a track catalog can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Practice,
    Qualifying,
    Race,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Practice => "practice",
            Self::Qualifying => "qualifying",
            Self::Race => "race",
        };
        f.write_str(name)
    }
}

impl FromStr for SessionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "practice" | "fp" => Ok(Self::Practice),
            "qualifying" | "quali" | "q" => Ok(Self::Qualifying),
            "race" | "r" => Ok(Self::Race),
            other => Err(format!("unknown session '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lap(lap_number: u32, time: f64) -> LapRecord {
        LapRecord {
            lap_number,
            lap_time: Seconds(time),
            validity: LapValidity::Valid,
            top_speed: KilometersPerHour(250.0),
        }
    }

    #[test]
    fn test_driver_identity_from_parts() {
        let id = DriverIdentity::from_parts("Ana", "Rid", "Ferrari 296 GT3", "RID");
        assert_eq!(id.name, "Ana Rid: Ferrari 296 GT3");
        assert_eq!(id.short_code, "RID");
    }

    #[test]
    fn test_driver_identity_structural_equality() {
        let a = DriverIdentity::new("Ana Rid: Ferrari 296 GT3", "RID");
        let b = DriverIdentity::new("Ana Rid: Ferrari 296 GT3", "RID");
        let c = DriverIdentity::new("Ana Rid: BMW M4 GT3", "RID");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_validity_polarity_per_source() {
        assert_eq!(LapValidity::from_replay_flag(true), LapValidity::Valid);
        assert_eq!(LapValidity::from_replay_flag(false), LapValidity::Invalid);
        assert_eq!(LapValidity::from_companion_flags(0), LapValidity::Valid);
        assert_eq!(LapValidity::from_companion_flags(4), LapValidity::Invalid);
        assert!(LapValidity::from_companion_flags(1).is_invalid());
    }

    #[test]
    fn test_lap_series_preserves_append_order() {
        let driver = DriverIdentity::new("A B: Car", "ABC");
        let mut series = LapSeries::new();
        series.push(driver.clone(), lap(2, 90.0));
        series.push(driver.clone(), lap(1, 91.0));

        let laps = series.get(&driver).unwrap();
        assert_eq!(laps[0].lap_number, 2);
        assert_eq!(laps[1].lap_number, 1);
        assert_eq!(series.len(), 1);
        assert_eq!(series.lap_count(), 2);
    }

    #[test]
    fn test_lap_series_serializes_as_entry_list() {
        let driver = DriverIdentity::new("A B: Car", "ABC");
        let mut series = LapSeries::new();
        series.push(driver, lap(1, 90.0));

        let json: serde_json::Value = serde_json::to_value(&series).unwrap();
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["driver"]["short_code"], "ABC");
        assert_eq!(entries[0]["laps"][0]["lap_number"], 1);
        assert_eq!(entries[0]["laps"][0]["validity"], "valid");
    }

    #[test]
    fn test_sector_best_keeps_minimum() {
        let mut best = SectorBest::default();
        best.observe(1, Seconds(28.5));
        best.observe(1, Seconds(28.2));
        best.observe(1, Seconds(28.9));
        assert_eq!(best.sector(1), Some(Seconds(28.2)));
        assert_eq!(best.sector(2), None);
    }

    #[test]
    fn test_sector_best_ignores_out_of_range_sector() {
        let mut best = SectorBest::default();
        best.observe(0, Seconds(10.0));
        best.observe(4, Seconds(10.0));
        assert_eq!(best, SectorBest::default());
        assert_eq!(best.sector(0), None);
    }

    #[test]
    fn test_best_possible_lap_requires_all_sectors() {
        let mut best = SectorBest::default();
        best.observe(1, Seconds(28.2));
        best.observe(2, Seconds(30.0));
        assert!(!best.is_complete());
        assert_eq!(best.best_possible_lap(), None);

        best.observe(3, Seconds(34.0));
        assert!(best.is_complete());
        let total = best.best_possible_lap().unwrap();
        assert!((total.0 - 92.2).abs() < 1e-9);
    }

    #[test]
    fn test_session_kind_serialization() {
        let json = serde_json::to_string(&SessionKind::Qualifying).unwrap();
        assert_eq!(json, "\"qualifying\"");
        let parsed: SessionKind = serde_json::from_str("\"race\"").unwrap();
        assert_eq!(parsed, SessionKind::Race);
    }

    #[test]
    fn test_session_kind_from_str() {
        assert_eq!("Quali".parse::<SessionKind>(), Ok(SessionKind::Qualifying));
        assert_eq!("race".parse::<SessionKind>(), Ok(SessionKind::Race));
        assert!("sprint".parse::<SessionKind>().is_err());
    }
}
