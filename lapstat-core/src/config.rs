//! Immutable analysis configuration
//!
//! Holds the static tables the analysis and the presentation layer need:
//! driver colours, the track catalog with replay locations and alien times,
//! the incident rule, and fetch settings. Loaded once per run and passed
//! explicitly.

use crate::model::SessionKind;
use crate::units::Seconds;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Incident codes that denote an accident or contact in the extended dump
pub const CONTACT_INCIDENT_CODES: [i64; 2] = [1, 1025];

/// Decides which companion-dump accident codes count as incidents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum IncidentRule {
    /// Any non-zero code is an incident
    #[default]
    AnyNonZero,
    /// Only the listed codes are incidents
    Codes { codes: BTreeSet<i64> },
}

impl IncidentRule {
    pub fn codes(codes: impl IntoIterator<Item = i64>) -> Self {
        Self::Codes {
            codes: codes.into_iter().collect(),
        }
    }

    /// Accident/contact codes only
    pub fn contact() -> Self {
        Self::codes(CONTACT_INCIDENT_CODES)
    }

    pub fn is_incident(&self, code: i64) -> bool {
        match self {
            Self::AnyNonZero => code != 0,
            Self::Codes { codes } => codes.contains(&code),
        }
    }
}

/// Short code -> display colour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverPalette(BTreeMap<String, String>);

impl DriverPalette {
    pub fn colour(&self, short_code: &str) -> Option<&str> {
        self.0.get(short_code).map(String::as_str)
    }

    /// Short codes without a colour. Rendering needs every driver covered.
    pub fn missing<'a>(&self, short_codes: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let missing: BTreeSet<&str> = short_codes
            .into_iter()
            .filter(|code| !self.0.contains_key(*code))
            .collect();
        missing.into_iter().map(str::to_owned).collect()
    }
}

impl Default for DriverPalette {
    fn default() -> Self {
        let colours = [
            ("CRE", "black"),
            ("RID", "indianred"),
            ("VLK", "darkgoldenrod"),
            ("DIV", "darkolivegreen"),
            ("WOJ", "springgreen"),
            ("RJT", "teal"),
            ("JKE", "darkorchid"),
            ("IYK", "red"),
        ];
        Self(
            colours
                .into_iter()
                .map(|(code, colour)| (code.to_owned(), colour.to_owned()))
                .collect(),
        )
    }
}

/// Replay locations of one season at one track
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonSources {
    pub race: Option<String>,
    pub qualifying: Option<String>,
    pub practice: Vec<String>,
}

impl SeasonSources {
    /// Location of a session; `index` selects among practice sessions
    pub fn location(&self, kind: SessionKind, index: usize) -> Option<&str> {
        let location = match kind {
            SessionKind::Race => self.race.as_deref(),
            SessionKind::Qualifying => self.qualifying.as_deref(),
            SessionKind::Practice => self.practice.get(index).map(String::as_str),
        };
        location.filter(|l| !l.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Reference lap of an exceptionally fast driver
    pub alien_time: Seconds,

    #[serde(default)]
    pub seasons: BTreeMap<String, SeasonSources>,
}

/// Track name -> track info
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackCatalog(BTreeMap<String, TrackInfo>);

impl TrackCatalog {
    pub fn track(&self, name: &str) -> Option<&TrackInfo> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TrackInfo)> {
        self.0.iter().map(|(name, info)| (name.as_str(), info))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

const REPLAY_API: &str = "https://www.accreplay.com/api/replays";

impl Default for TrackCatalog {
    fn default() -> Self {
        let race_2024 = [
            ("bathurst", 31871, 118.9),
            ("silverstone", 31874, 116.6),
            ("kyalami", 32377, 99.5),
            ("monza", 32378, 105.9),
            ("hungaroring", 32379, 102.2),
            ("zolder", 32380, 86.9),
            ("spa", 32381, 135.2),
            ("imola", 32382, 99.5),
            ("nurburgring_24h", 32383, 485.0),
            ("laguna_seca", 32384, 81.2),
            ("misano", 32392, 92.4),
        ];

        let mut tracks: BTreeMap<String, TrackInfo> = race_2024
            .into_iter()
            .map(|(name, replay, alien)| {
                let season = SeasonSources {
                    race: Some(format!("{REPLAY_API}/{replay}")),
                    ..SeasonSources::default()
                };
                let info = TrackInfo {
                    alien_time: Seconds(alien),
                    seasons: BTreeMap::from([("2024".to_owned(), season)]),
                };
                (name.to_owned(), info)
            })
            .collect();

        if let Some(season) = tracks
            .get_mut("misano")
            .and_then(|t| t.seasons.get_mut("2024"))
        {
            season.qualifying = Some(format!("{REPLAY_API}/32463"));
            season.practice = vec![format!("{REPLAY_API}/32464")];
        }

        Self(tracks)
    }
}

/// Retry behaviour of network sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Attempts after the first one
    pub retries: u32,
    /// Delay before retry n is n * backoff_ms
    pub backoff_ms: u64,
    pub timeout_s: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff_ms: 500,
            timeout_s: 30,
        }
    }
}

/// Everything a run needs besides the two documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub palette: DriverPalette,
    pub tracks: TrackCatalog,
    pub incident_rule: IncidentRule,
    /// Directory holding `<track>.json` companion dumps
    pub companion_dir: String,
    pub fetch: FetchSettings,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            palette: DriverPalette::default(),
            tracks: TrackCatalog::default(),
            incident_rule: IncidentRule::default(),
            companion_dir: "ACC_companion_dumps".to_owned(),
            fetch: FetchSettings::default(),
        }
    }
}
