//! Session sources for lapstat
//!
//! Decoders and normalizers for the replay document and the companion-app
//! dump, plus the HTTP and file collaborators that deliver them.

pub mod companion;
pub mod fetch;
pub mod replay;

pub use companion::{CompanionDigest, CompanionDump};
pub use fetch::{source_for, FileSource, HttpSource};
pub use replay::{parse_replay, FilterMode, ReplayDocument};
