//! Text rendering of migration progress and outcome.
//!
//! Transition lines go to stderr while the migration runs; the final result
//! (one line per created artifact, or one error line) is printed by the CLI.

use std::io::Write;

use snippet_bridge_core::contract::Direction;
use snippet_bridge_core::migrate::{MigrationReport, MigrationState};
use tokio::sync::mpsc::UnboundedReceiver;

/// Progress text for a transition, `None` for states not worth showing.
pub fn transition_line(state: MigrationState) -> Option<&'static str> {
    match state {
        MigrationState::Idle | MigrationState::Finalizing => None,
        MigrationState::Validating => Some("Validating input..."),
        MigrationState::AwaitingRemote => Some("Migrating, waiting for GitHub and GitLab..."),
        MigrationState::TimedOut => {
            Some("Timed out; no further requests will be sent. Check both accounts for partial results.")
        }
        MigrationState::Succeeded => Some("Migration complete."),
        MigrationState::Failed => Some("Migration failed."),
    }
}

/// Writes a line per transition until the orchestrator drops its sender.
pub async fn print_transitions<W: Write>(mut rx: UnboundedReceiver<MigrationState>, mut out: W) {
    while let Some(state) = rx.recv().await {
        if let Some(line) = transition_line(state) {
            let _ = writeln!(out, "{line}");
        }
    }
}

/// One line per created artifact.
pub fn report_lines(report: &MigrationReport) -> Vec<String> {
    report
        .created
        .iter()
        .map(|artifact| match report.direction {
            Direction::GistToSnippet => format!("Snippet {}: {}", artifact.id, artifact.url),
            Direction::SnippetToGist => format!("Gist: {}", artifact.url),
        })
        .collect()
}

/// Warning about files left out of the created gist, if any.
pub fn skipped_line(report: &MigrationReport) -> Option<String> {
    if report.skipped.is_empty() {
        return None;
    }
    Some(format!(
        "Skipped {} file(s) that could not be fetched: {}",
        report.skipped.len(),
        report.skipped.join(", ")
    ))
}

/// Collapses an error (remote bodies may span lines) into a single line.
pub fn error_line(error: &anyhow::Error) -> String {
    let message = error.to_string();
    let flat: Vec<&str> = message.split_whitespace().collect();
    format!("Error: {}", flat.join(" "))
}
