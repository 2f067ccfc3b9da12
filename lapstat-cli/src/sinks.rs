//! Report sink implementations
//!
//! Sinks forward a finished session report to a destination (JSON file, terminal)

use crate::report::{SectionMask, SessionReport};
use anyhow::{Context, Result};
use lapstat_core::charts::format_lap_time;
use lapstat_core::config::DriverPalette;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Trait for output sinks
pub trait ReportSink {
    fn emit(&mut self, report: &SessionReport) -> Result<()>;
}

/// Pretty JSON written to a file, optionally masked to some sections
pub struct JsonFileSink {
    path: PathBuf,
    mask: Option<SectionMask>,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>, mask: Option<SectionMask>) -> Self {
        Self {
            path: path.into(),
            mask,
        }
    }
}

impl ReportSink for JsonFileSink {
    fn emit(&mut self, report: &SessionReport) -> Result<()> {
        let json = report.to_json_filtered(self.mask.as_ref())?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Could not write report to {}", self.path.display()))?;
        info!("Wrote report to {}", self.path.display());
        Ok(())
    }
}

/// Plain-text summary table, one row per driver ordered by mean lap time
///
/// Each row shows the driver's chart colour from the palette.
pub struct ConsoleSink<W: Write> {
    out: W,
    palette: DriverPalette,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout(palette: DriverPalette) -> Self {
        Self::new(std::io::stdout(), palette)
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W, palette: DriverPalette) -> Self {
        Self { out, palette }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for ConsoleSink<W> {
    fn emit(&mut self, report: &SessionReport) -> Result<()> {
        writeln!(
            self.out,
            "{} {} {} (alien {}, 103% {})",
            report.track,
            report.season,
            report.session,
            format_lap_time(report.references.alien_time),
            format_lap_time(report.references.pace_threshold),
        )?;
        writeln!(
            self.out,
            "{:<5} {:<36} {:<16} {:>9} {:>7} {:>5} {:>9} {:>7}",
            "CODE", "DRIVER", "COLOUR", "MEAN", "STD", "LAPS", "BEST POS", "PITS"
        )?;

        let mut rows: Vec<_> = report.stats.iter().collect();
        rows.sort_by(|(_, a), (_, b)| a.mean.0.total_cmp(&b.mean.0));

        for (driver, stat) in rows {
            let best = report
                .best_possible_laps
                .get(&driver.short_code)
                .copied()
                .flatten()
                .map(format_lap_time)
                .unwrap_or_else(|| "-".to_owned());
            let pits = report
                .pit_stops
                .get(&driver.short_code)
                .map_or(0, |stops| stops.len());
            let colour = self.palette.colour(&driver.short_code).unwrap_or("-");

            writeln!(
                self.out,
                "{:<5} {:<36} {:<16} {:>9} {:>7.3} {:>5} {:>9} {:>7}",
                driver.short_code,
                driver.name,
                colour,
                format_lap_time(stat.mean),
                stat.std_dev.0,
                stat.lap_count,
                best,
                pits,
            )?;
        }

        if !report.incidents.is_empty() {
            writeln!(self.out, "{} incidents", report.incidents.len())?;
        }
        self.out.flush()?;
        Ok(())
    }
}
