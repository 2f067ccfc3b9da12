//! lapstat Core Library
//!
//! This crate provides the per-driver lap data model, the document source
//! trait, and the analysis engines shared by every session source.

pub mod analysis;
pub mod charts;
pub mod config;
pub mod error;
pub mod model;
pub mod source;
pub mod units;

pub use config::AnalysisConfig;
pub use error::SourceError;
pub use model::{DriverIdentity, LapRecord, LapSeries, LapValidity};
pub use source::DocumentSource;
