//! lapstat
//!
//! Race and practice session analysis from replay documents and companion dumps

use anyhow::Result;
use clap::{Parser, Subcommand};
use lapstat_cli::config;
use lapstat_cli::pipeline::{self, SessionPlan, SessionSelection};
use lapstat_cli::report::SectionMask;
use lapstat_cli::sinks::{ConsoleSink, JsonFileSink, ReportSink};
use lapstat_core::analysis::GapReference;
use lapstat_core::charts::format_lap_time;
use lapstat_core::config::{AnalysisConfig, IncidentRule};
use lapstat_core::model::SessionKind;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Config file (default: <config dir>/lapstat/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze one session and print a summary
    Analyze {
        #[arg(short, long)]
        track: String,

        #[arg(long, default_value = "2024")]
        season: String,

        /// race, qualifying or practice
        #[arg(long, default_value = "race")]
        session: SessionKind,

        #[arg(long, default_value_t = 0)]
        practice_index: usize,

        /// Replay URL or file, instead of the catalog entry
        #[arg(long)]
        replay: Option<String>,

        /// Companion dump file, instead of <companion_dir>/<track>.json
        #[arg(long)]
        companion: Option<String>,

        /// Accident codes counted as incidents (default: any non-zero)
        #[arg(long, value_delimiter = ',')]
        incident_codes: Option<Vec<i64>>,

        /// max: gap to the slowest cumulative time, min: gap to the leader
        #[arg(long, default_value = "max")]
        gap_reference: GapReference,

        /// Aggregate statistics over all laps instead of filtered laps
        #[arg(long)]
        unfiltered_stats: bool,

        /// Write the report as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Comma-separated report sections to keep in the JSON output,
        /// e.g. stats,gaps,charts
        #[arg(long)]
        sections: Option<SectionMask>,
    },
    /// List the tracks and sessions of the catalog
    Tracks,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn list_tracks(config: &AnalysisConfig) {
    for (name, track) in config.tracks.iter() {
        println!("{name:<18} alien {}", format_lap_time(track.alien_time));
        for (season, sources) in &track.seasons {
            let mut sessions = Vec::new();
            if sources.race.is_some() {
                sessions.push("race".to_owned());
            }
            if sources.qualifying.is_some() {
                sessions.push("qualifying".to_owned());
            }
            if !sources.practice.is_empty() {
                sessions.push(format!("practice x{}", sources.practice.len()));
            }
            println!("  {season}: {}", sessions.join(", "));
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = config::load(args.config.as_deref())?;

    match args.command {
        Commands::Tracks => list_tracks(&config),
        Commands::Analyze {
            track,
            season,
            session,
            practice_index,
            replay,
            companion,
            incident_codes,
            gap_reference,
            unfiltered_stats,
            output,
            sections,
        } => {
            let selection = SessionSelection {
                track,
                season,
                session,
                practice_index,
                replay_override: replay,
                companion_override: companion,
            };
            let mut plan = SessionPlan::from_config(&config, &selection)?;
            if let Some(codes) = incident_codes {
                plan.incident_rule = IncidentRule::codes(codes);
            }
            plan.gap_reference = gap_reference;
            plan.stats_filtered = !unfiltered_stats;

            let report = pipeline::run(&plan).await?;

            let console = ConsoleSink::stdout(config.palette.clone());
            let mut sinks: Vec<Box<dyn ReportSink>> = vec![Box::new(console)];
            if let Some(path) = output {
                sinks.push(Box::new(JsonFileSink::new(path, sections)));
            }
            for sink in &mut sinks {
                sink.emit(&report)?;
            }
            info!("Done");
        }
    }

    Ok(())
}
