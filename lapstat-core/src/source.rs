//! Document source trait definition

use crate::error::SourceError;

/// Trait for the collaborators that deliver raw session documents
///
/// Each source is responsible for:
/// - Knowing where its document lives (URL, file path)
/// - Fetching the document as text, blocking until done
/// - Reporting failures as [`SourceError::SourceUnavailable`]
///
/// Decoding the text into a schema is the caller's job.
pub trait DocumentSource: Send + Sync {
    /// Short name of this source kind (e.g. "http", "file")
    fn name(&self) -> &str;

    /// Human-readable location of the document, used in logs and errors
    fn location(&self) -> String;

    /// Fetch the whole document
    ///
    /// This blocks; async callers should run it on a blocking task.
    fn load(&self) -> Result<String, SourceError>;
}
