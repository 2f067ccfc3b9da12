//! Session report and section masking
//!
//! The report bundles every derived structure of one session plus the chart
//! feeds computed from them. It is the only thing sinks see.

use chrono::{DateTime, Utc};
use lapstat_core::analysis::{aggregate, best_possible_laps, gap_progression, GapReference};
use lapstat_core::charts::{
    incident_lap_span, lap_time_density, mean_top_speed, pit_stop_events, ranked_laps,
    validity_summary, DensityPoint, ReferenceLines, ValiditySummary,
};
use lapstat_core::config::DriverPalette;
use lapstat_core::model::{
    serialize_driver_map, AggregateStat, CumulativeGap, DriverMap, IncidentEvent, LapSeries,
    PitStopEvent, PitStops, SectorBests, SessionKind, ValidityRecords,
};
use lapstat_core::units::{KilometersPerHour, Percent, Seconds};
use lapstat_sources::CompanionDigest;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Report keys every masked output keeps
const ALWAYS_INCLUDED: [&str; 4] = ["track", "season", "session", "generated_at"];

/// Everything one analysis run produced
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub track: String,
    pub season: String,
    pub session: SessionKind,
    pub generated_at: DateTime<Utc>,

    /// Alien time and the 103% line
    pub references: ReferenceLines,

    /// Laps after outlier filtering
    pub laps: LapSeries,
    pub unfiltered_laps: LapSeries,

    #[serde(serialize_with = "serialize_driver_map")]
    pub stats: DriverMap<AggregateStat>,
    pub stats_filtered: bool,

    #[serde(serialize_with = "serialize_driver_map")]
    pub gaps: DriverMap<CumulativeGap>,
    pub gap_reference: GapReference,

    pub pit_stops: PitStops,
    pub validity: ValidityRecords,
    pub incidents: Vec<IncidentEvent>,
    pub sector_bests: SectorBests,
    pub best_possible_laps: BTreeMap<String, Option<Seconds>>,

    pub charts: ChartFeeds,

    /// Short codes the palette has no colour for
    pub uncoloured_drivers: Vec<String>,
}

/// Data series for each chart of the session
#[derive(Debug, Clone, Serialize)]
pub struct ChartFeeds {
    #[serde(serialize_with = "serialize_driver_map")]
    pub top_speed: DriverMap<KilometersPerHour>,
    #[serde(serialize_with = "serialize_driver_map")]
    pub ranked_laps: DriverMap<Vec<Percent>>,
    #[serde(serialize_with = "serialize_driver_map")]
    pub lap_time_density: DriverMap<Vec<DensityPoint>>,
    pub pit_stops: Vec<PitStopEvent>,
    pub validity: BTreeMap<String, ValiditySummary>,
    pub incident_lap_span: u32,
}

/// Inputs of [`SessionReport::build`] that are not data
#[derive(Debug, Clone)]
pub struct ReportSettings<'a> {
    pub track: &'a str,
    pub season: &'a str,
    pub session: SessionKind,
    pub alien_time: Seconds,
    pub gap_reference: GapReference,
    /// Aggregate over the filtered laps (default) or all laps
    pub stats_filtered: bool,
    pub palette: &'a DriverPalette,
}

impl SessionReport {
    pub fn build(
        settings: &ReportSettings<'_>,
        laps: LapSeries,
        unfiltered_laps: LapSeries,
        companion: CompanionDigest,
    ) -> Self {
        let stats = if settings.stats_filtered {
            aggregate(&laps)
        } else {
            aggregate(&unfiltered_laps)
        };
        let gaps = gap_progression(&unfiltered_laps, settings.gap_reference);

        let charts = ChartFeeds {
            top_speed: mean_top_speed(&laps),
            ranked_laps: ranked_laps(&laps, settings.alien_time),
            lap_time_density: lap_time_density(&stats, settings.alien_time),
            pit_stops: pit_stop_events(&companion.pit_stops),
            validity: validity_summary(&companion.validity),
            incident_lap_span: incident_lap_span(&companion.incidents),
        };

        let uncoloured_drivers = settings.palette.missing(
            unfiltered_laps
                .drivers()
                .map(|d| d.short_code.as_str())
                .chain(companion.validity.keys().map(String::as_str)),
        );

        Self {
            track: settings.track.to_owned(),
            season: settings.season.to_owned(),
            session: settings.session,
            generated_at: Utc::now(),
            references: ReferenceLines::for_alien_time(settings.alien_time),
            best_possible_laps: best_possible_laps(&companion.sector_bests),
            laps,
            unfiltered_laps,
            stats,
            stats_filtered: settings.stats_filtered,
            gaps,
            gap_reference: settings.gap_reference,
            pit_stops: companion.pit_stops,
            validity: companion.validity,
            incidents: companion.incidents,
            sector_bests: companion.sector_bests,
            charts,
            uncoloured_drivers,
        }
    }

    /// Serialize this report, keeping only the sections of `mask`
    ///
    /// `None` serializes everything. The identifying keys are always kept.
    pub fn to_json_filtered(&self, mask: Option<&SectionMask>) -> serde_json::Result<String> {
        let Some(mask) = mask else {
            return serde_json::to_string_pretty(self);
        };

        let serde_json::Value::Object(full) = serde_json::to_value(self)? else {
            return serde_json::to_string_pretty(self);
        };
        let filtered: serde_json::Map<String, serde_json::Value> = full
            .into_iter()
            .filter(|(key, _)| ALWAYS_INCLUDED.contains(&key.as_str()) || mask.covers(key))
            .collect();
        serde_json::to_string_pretty(&filtered)
    }
}

/// Selectable report sections and the top-level keys each one covers
static SECTIONS: [(&str, &[&str]); 12] = [
    ("references", &["references"]),
    ("laps", &["laps"]),
    ("unfiltered_laps", &["unfiltered_laps"]),
    ("stats", &["stats", "stats_filtered"]),
    ("gaps", &["gaps", "gap_reference"]),
    ("pit_stops", &["pit_stops"]),
    ("validity", &["validity"]),
    ("incidents", &["incidents"]),
    ("sector_bests", &["sector_bests"]),
    ("best_possible_laps", &["best_possible_laps"]),
    ("charts", &["charts"]),
    ("uncoloured_drivers", &["uncoloured_drivers"]),
];

/// Names accepted by [`SectionMask::parse`]
pub fn section_names() -> impl Iterator<Item = &'static str> {
    SECTIONS.iter().map(|(name, _)| *name)
}

/// A non-empty set of report sections to keep in serialized output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMask {
    sections: BTreeSet<&'static str>,
}

impl SectionMask {
    /// Parse a comma-separated list of section names, case-insensitive
    pub fn parse(list: &str) -> Result<Self, String> {
        let mut sections = BTreeSet::new();
        for requested in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let requested = requested.to_lowercase();
            let name = section_names().find(|name| *name == requested).ok_or_else(|| {
                format!(
                    "unknown report section '{requested}', expected one of: {}",
                    section_names().collect::<Vec<_>>().join(", ")
                )
            })?;
            sections.insert(name);
        }

        if sections.is_empty() {
            return Err("no report sections given".to_owned());
        }
        Ok(Self { sections })
    }

    pub fn includes(&self, section: &str) -> bool {
        self.sections.contains(section)
    }

    /// Whether a top-level report key belongs to a selected section
    fn covers(&self, key: &str) -> bool {
        SECTIONS
            .iter()
            .any(|(name, keys)| self.sections.contains(name) && keys.contains(&key))
    }
}

impl FromStr for SectionMask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
