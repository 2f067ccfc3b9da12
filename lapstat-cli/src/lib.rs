//! lapstat CLI library
//!
//! Session analysis pipeline, report assembly and output sinks behind the
//! `lapstat` binary.

pub mod config;
pub mod pipeline;
pub mod report;
pub mod sinks;
