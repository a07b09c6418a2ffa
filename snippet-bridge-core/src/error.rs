//! Error taxonomy for the migration pipeline.
//!
//! Every failure raised while talking to the remote services ends up as one
//! [`MigrationError`] and is rendered as a single human-readable line. Only the
//! bounded fallback search in [`crate::fallback`] ever recovers from an error;
//! everything else propagates to the orchestrator untouched.

use thiserror::Error;

use crate::contract::TargetArtifact;

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, MigrationError>;

#[derive(Debug, Error)]
pub enum MigrationError {
    /// Missing source id or credential. Raised before any remote call.
    #[error("{0}")]
    Validation(String),

    /// A gist file only came back as a truncated preview.
    #[error(
        "Gist file '{file}' is not available inline (likely too large or truncated); \
         its full content cannot be retrieved through the gist metadata endpoint"
    )]
    ContentUnavailable { file: String },

    /// Every fallback candidate for a snippet file answered 404 or 400.
    #[error("GitLab snippet file raw fetch failed for {file}: {status}")]
    NotFound { file: String, status: u16 },

    /// No file of a multi-file snippet could be retrieved.
    #[error("No files could be fetched from GitLab snippet {id} (file endpoints returned 404)")]
    NoFilesRetrieved { id: String },

    /// The source gist has no files at all.
    #[error("Gist {id} has no files")]
    EmptySource { id: String },

    /// Any other non-success status from either service.
    #[error("{context} failed: {status} {body}")]
    Remote {
        context: String,
        status: u16,
        body: String,
    },

    /// Internal invariant breach, e.g. a writer invoked with an empty batch.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// The request could not be sent, or its body could not be read.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// A success response carried a body that is not the expected JSON.
    #[error("unexpected response from {context}: {message}")]
    Decode { context: String, message: String },

    /// A pipeline checkpoint observed cancellation.
    #[error("migration cancelled")]
    Cancelled,

    /// The guard timer fired before the pipeline completed.
    #[error("{}", timed_out_message(*after_secs, created))]
    TimedOut {
        after_secs: u64,
        created: Vec<TargetArtifact>,
    },
}

impl MigrationError {
    /// True for the per-file "not found" outcome the snippet reader may recover from.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MigrationError::NotFound { .. })
    }
}

fn timed_out_message(after_secs: u64, created: &[TargetArtifact]) -> String {
    if created.is_empty() {
        format!("Migration timed out after {after_secs}s; no artifacts were created")
    } else {
        let urls: Vec<&str> = created.iter().map(|a| a.url.as_str()).collect();
        format!(
            "Migration timed out after {after_secs}s; {} artifact(s) were already created: {}",
            created.len(),
            urls.join(", ")
        )
    }
}
