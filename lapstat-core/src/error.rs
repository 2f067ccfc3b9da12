//! Errors that abort an analysis run
//!
//! Incomplete records and drivers emptied by filtering are not errors; the
//! normalizers and filters handle them locally.

use std::fmt;
use thiserror::Error;

/// What kind of identifier failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Car,
    Driver,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Car => f.write_str("car"),
            Self::Driver => f.write_str("driver"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    /// A record references an id that the document never defines
    #[error("malformed source: {kind} id {id} is not defined")]
    MalformedSource { kind: ReferenceKind, id: String },

    /// The document could not be fetched or read
    #[error("source unavailable: {location}: {reason}")]
    SourceUnavailable { location: String, reason: String },

    /// The document is not valid JSON for its schema
    #[error("could not decode {location}")]
    Decode {
        location: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SourceError {
    pub fn malformed(kind: ReferenceKind, id: impl fmt::Display) -> Self {
        Self::MalformedSource {
            kind,
            id: id.to_string(),
        }
    }

    pub fn unavailable(location: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::SourceUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_source_message() {
        let err = SourceError::malformed(ReferenceKind::Car, 42);
        assert_eq!(err.to_string(), "malformed source: car id 42 is not defined");
    }

    #[test]
    fn test_source_unavailable_message() {
        let err = SourceError::unavailable("dumps/misano.json", "No such file or directory");
        assert_eq!(
            err.to_string(),
            "source unavailable: dumps/misano.json: No such file or directory"
        );
    }
}
