//! Session analysis pipeline
//!
//! Resolves what to load from the config and command line, loads the replay
//! document and the companion dump concurrently, then normalizes and
//! analyzes them into a [`SessionReport`].

use crate::report::{ReportSettings, SessionReport};
use anyhow::{anyhow, Context, Result};
use lapstat_core::analysis::GapReference;
use lapstat_core::config::{AnalysisConfig, DriverPalette, FetchSettings, IncidentRule};
use lapstat_core::model::SessionKind;
use lapstat_core::units::Seconds;
use lapstat_core::SourceError;
use lapstat_sources::replay::{normalize_laps, resolve_drivers};
use lapstat_sources::{source_for, CompanionDump, FilterMode, ReplayDocument};
use std::path::Path;
use tracing::{debug, info, warn};

/// Which session the user asked for
#[derive(Debug, Clone)]
pub struct SessionSelection {
    pub track: String,
    pub season: String,
    pub session: SessionKind,
    /// Which practice session, when there are several
    pub practice_index: usize,
    /// Replay location replacing the catalog entry
    pub replay_override: Option<String>,
    /// Companion dump location replacing `<companion_dir>/<track>.json`
    pub companion_override: Option<String>,
}

/// Everything one run needs, resolved
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub track: String,
    pub season: String,
    pub session: SessionKind,
    pub alien_time: Seconds,
    pub replay_location: String,
    pub companion_location: String,
    pub incident_rule: IncidentRule,
    pub gap_reference: GapReference,
    /// Aggregate over filtered laps (true) or all laps
    pub stats_filtered: bool,
    pub fetch: FetchSettings,
    pub palette: DriverPalette,
}

impl SessionPlan {
    /// Resolve a selection against the track catalog
    ///
    /// The track must be in the catalog, since its alien time is needed. The
    /// replay location comes from the selection or the catalog, in that order.
    pub fn from_config(config: &AnalysisConfig, selection: &SessionSelection) -> Result<Self> {
        let track = config
            .tracks
            .track(&selection.track)
            .ok_or_else(|| anyhow!("Unknown track '{}'", selection.track))?;

        let replay_location = match &selection.replay_override {
            Some(location) => location.clone(),
            None => track
                .seasons
                .get(&selection.season)
                .and_then(|s| s.location(selection.session, selection.practice_index))
                .map(str::to_owned)
                .ok_or_else(|| {
                    anyhow!(
                        "No {} replay for {} season {}",
                        selection.session,
                        selection.track,
                        selection.season
                    )
                })?,
        };

        let companion_location = match &selection.companion_override {
            Some(location) => location.clone(),
            None => Path::new(&config.companion_dir)
                .join(format!("{}.json", selection.track))
                .to_string_lossy()
                .into_owned(),
        };

        Ok(Self {
            track: selection.track.clone(),
            season: selection.season.clone(),
            session: selection.session,
            alien_time: track.alien_time,
            replay_location,
            companion_location,
            incident_rule: config.incident_rule.clone(),
            gap_reference: GapReference::default(),
            stats_filtered: true,
            fetch: config.fetch.clone(),
            palette: config.palette.clone(),
        })
    }
}

/// Load one document on the blocking pool
///
/// The source is built inside the task too: the blocking HTTP client must not
/// be created or dropped on an async worker.
async fn load_document(location: String, fetch: FetchSettings) -> Result<String> {
    let what = location.clone();
    let text = tokio::task::spawn_blocking(move || -> Result<String, SourceError> {
        let source = source_for(&location, &fetch)?;
        debug!(source = source.name(), location = %source.location(), "Loading document");
        source.load()
    })
    .await
    .with_context(|| format!("Loader task for {what} failed"))??;
    Ok(text)
}

/// Run the whole analysis for one session
pub async fn run(plan: &SessionPlan) -> Result<SessionReport> {
    info!(
        track = %plan.track,
        season = %plan.season,
        session = %plan.session,
        "Analyzing session"
    );

    let (replay_text, companion_text) = tokio::try_join!(
        load_document(plan.replay_location.clone(), plan.fetch.clone()),
        load_document(plan.companion_location.clone(), plan.fetch.clone()),
    )?;

    let replay = ReplayDocument::from_json(&replay_text, &plan.replay_location)?;
    let identities = resolve_drivers(&replay)?;
    let unfiltered = normalize_laps(&replay, &identities, FilterMode::Unfiltered)?;
    let filtered = normalize_laps(&replay, &identities, FilterMode::Filtered)?;
    info!(
        drivers = unfiltered.len(),
        laps = unfiltered.lap_count(),
        filtered_laps = filtered.lap_count(),
        "Normalized replay"
    );

    let companion = CompanionDump::from_json(&companion_text, &plan.companion_location)?
        .digest(&plan.incident_rule);
    info!(
        pit_stops = companion.pit_stops.values().map(|s| s.len()).sum::<usize>(),
        incidents = companion.incidents.len(),
        "Digested companion dump"
    );

    let settings = ReportSettings {
        track: &plan.track,
        season: &plan.season,
        session: plan.session,
        alien_time: plan.alien_time,
        gap_reference: plan.gap_reference,
        stats_filtered: plan.stats_filtered,
        palette: &plan.palette,
    };
    let report = SessionReport::build(&settings, filtered, unfiltered, companion);

    if !report.uncoloured_drivers.is_empty() {
        warn!(
            "No palette colour for {}; charts will use a fallback",
            report.uncoloured_drivers.join(", ")
        );
    }

    Ok(report)
}
