use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a moderation request outright.
///
/// Per-extractor failures are deliberately not represented here: they are
/// carried inside the analysis report as `SignalOutcome::Failed` and never
/// abort the pipeline.
#[derive(Debug, Error)]
pub enum ModerationError {
    /// The video source could not be opened or probed at all.
    #[error("cannot read video source {path}: {message}")]
    SourceUnreadable { path: PathBuf, message: String },

    /// Configuration value outside the accepted range.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ModerationError {
    pub fn source_unreadable(path: &std::path::Path, message: impl Into<String>) -> Self {
        ModerationError::SourceUnreadable {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}
