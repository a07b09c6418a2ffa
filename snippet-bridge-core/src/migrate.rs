//! Migration orchestrator: validate → read → normalize (→ chunk) → write.
//!
//! [`MigrationOrchestrator::run`] drives one migration end to end and returns
//! a [`MigrationReport`] or a single [`MigrationError`]. It never renders
//! anything itself: callers that want progress subscribe to
//! [`MigrationState`] transitions through [`MigrationOrchestrator::with_observer`].
//!
//! # Guard timer
//! The remote stage is raced against a guard timer (`guard_timeout_secs`).
//! When the timer wins, `TimedOut` is emitted and the run's
//! [`CancellationToken`] is cancelled. The pipeline then stops at its next
//! checkpoint, so no further request (and in particular no further artifact
//! creation) is issued. A request still in flight after [`CANCEL_GRACE`] is
//! dropped. The run fails with [`MigrationError::TimedOut`] listing whatever
//! was already created.
//!
//! # Transitions
//! `Validating → AwaitingRemote → [TimedOut] → Finalizing → Succeeded | Failed`.
//! A validation failure goes straight from `Validating` to `Failed` without
//! touching the network.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::cancel::CancellationToken;
use crate::chunk::chunk_files;
use crate::config::ServiceConfig;
use crate::contract::{
    Credentials, Direction, SourceArtifact, SourceReader, TargetArtifact, Transport, Visibility,
};
use crate::error::{MigrationError, Result};
use crate::gist::GistClient;
use crate::normalize::normalize_files;
use crate::snippet::SnippetClient;

/// Title for snippets created from a gist without a description.
pub const DEFAULT_SNIPPET_TITLE: &str = "from-gist";
/// How long a cancelled pipeline may take to reach its next checkpoint
/// before the in-flight request is dropped.
pub const CANCEL_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MigrationState {
    Idle,
    Validating,
    AwaitingRemote,
    /// The guard timer fired while remote work was still pending.
    TimedOut,
    Finalizing,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct MigrationRequest {
    pub direction: Direction,
    pub source_id: String,
    pub credentials: Credentials,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub direction: Direction,
    pub source_id: String,
    /// In creation order.
    pub created: Vec<TargetArtifact>,
    /// Snippet file paths left out because no endpoint could serve them.
    pub skipped: Vec<String>,
}

pub struct MigrationOrchestrator<T> {
    transport: T,
    config: ServiceConfig,
    observer: Option<UnboundedSender<MigrationState>>,
}

impl<T: Transport> MigrationOrchestrator<T> {
    pub fn new(transport: T, config: ServiceConfig) -> Self {
        Self {
            transport,
            config,
            observer: None,
        }
    }

    /// Sends every state transition of subsequent runs to `observer`.
    pub fn with_observer(mut self, observer: UnboundedSender<MigrationState>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub async fn run(&self, request: MigrationRequest) -> Result<MigrationReport> {
        self.emit(MigrationState::Idle);
        info!(
            direction = %request.direction,
            source_id = %request.source_id.trim(),
            visibility = %request.visibility,
            "[MIGRATE] Starting migration"
        );

        self.emit(MigrationState::Validating);
        let request = match validate(request) {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, "[MIGRATE] Validation failed, no remote call made");
                self.emit(MigrationState::Failed);
                return Err(e);
            }
        };

        self.emit(MigrationState::AwaitingRemote);
        let guard = Duration::from_secs(self.config.guard_timeout_secs);
        let cancel = CancellationToken::new();
        let mut created = Vec::new();

        let outcome = {
            let pipeline = self.pipeline(&request, &cancel, &mut created);
            tokio::pin!(pipeline);
            tokio::select! {
                biased;
                result = &mut pipeline => Some(result),
                _ = tokio::time::sleep(guard) => {
                    warn!(
                        after_secs = self.config.guard_timeout_secs,
                        "[MIGRATE] Guard timer fired, cancelling remaining work"
                    );
                    self.emit(MigrationState::TimedOut);
                    cancel.cancel();
                    match tokio::time::timeout(CANCEL_GRACE, &mut pipeline).await {
                        Ok(Err(e)) => debug!(error = %e, "[MIGRATE] Pipeline stopped after timeout"),
                        Ok(Ok(_)) => debug!("[MIGRATE] Pipeline finished after timeout"),
                        Err(_) => warn!(
                            grace_secs = CANCEL_GRACE.as_secs(),
                            "[MIGRATE] In-flight request still pending, abandoning it"
                        ),
                    }
                    None
                }
            }
        };

        self.emit(MigrationState::Finalizing);
        let result = match outcome {
            Some(Ok(skipped)) => Ok(MigrationReport {
                direction: request.direction,
                source_id: request.source_id,
                created,
                skipped,
            }),
            Some(Err(e)) => Err(e),
            None => Err(MigrationError::TimedOut {
                after_secs: self.config.guard_timeout_secs,
                created,
            }),
        };

        match &result {
            Ok(report) => {
                info!(
                    created = report.created.len(),
                    skipped = report.skipped.len(),
                    "[MIGRATE] Migration succeeded"
                );
                self.emit(MigrationState::Succeeded);
            }
            Err(e) => {
                error!(error = %e, "[MIGRATE] Migration failed");
                self.emit(MigrationState::Failed);
            }
        }
        result
    }

    /// Remote stage. Returns the skipped paths; created artifacts are pushed
    /// to `created` as soon as each one exists.
    async fn pipeline(
        &self,
        request: &MigrationRequest,
        cancel: &CancellationToken,
        created: &mut Vec<TargetArtifact>,
    ) -> Result<Vec<String>> {
        let gists = GistClient::new(
            &self.transport,
            self.config.github_base(),
            &request.credentials.github_token,
        );
        let snippets = SnippetClient::new(
            &self.transport,
            self.config.gitlab_base(),
            &request.credentials.gitlab_token,
        );

        match request.direction {
            Direction::GistToSnippet => {
                let source = gists.read(&request.source_id, cancel).await?;
                let base_title = source
                    .title
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SNIPPET_TITLE.to_string());
                let batches = chunk_files(normalized(source), self.config.snippet_file_limit);
                info!(batches = batches.len(), "[MIGRATE] Gist split into snippet batches");

                for batch in &batches {
                    cancel.check()?;
                    let artifact = snippets
                        .create(&batch.title(&base_title), request.visibility, batch)
                        .await?;
                    created.push(artifact);
                }
                Ok(Vec::new())
            }
            Direction::SnippetToGist => {
                let source = snippets.read(&request.source_id, cancel).await?;
                for path in &source.skipped {
                    warn!(file = %path, "[MIGRATE] Snippet file left out of the gist");
                }
                let description = source
                    .title
                    .clone()
                    .unwrap_or_else(|| format!("Imported from GitLab Snippet #{}", source.id));
                let skipped = source.skipped.clone();
                let files = normalized(source);

                cancel.check()?;
                let artifact = gists
                    .create(&description, request.visibility.is_public(), &files)
                    .await?;
                created.push(artifact);
                Ok(skipped)
            }
        }
    }

    fn emit(&self, state: MigrationState) {
        debug!(?state, "[MIGRATE] Transition");
        if let Some(observer) = &self.observer {
            // A dropped receiver only means nobody is watching.
            let _ = observer.send(state);
        }
    }
}

fn normalized(source: SourceArtifact) -> Vec<crate::contract::NormalizedFile> {
    normalize_files(
        source
            .files
            .into_iter()
            .map(|f| (f.path, f.content.unwrap_or_default())),
    )
}

fn validate(request: MigrationRequest) -> Result<MigrationRequest> {
    let source_id = request.source_id.trim().to_string();
    let github_token = request.credentials.github_token.trim().to_string();
    let gitlab_token = request.credentials.gitlab_token.trim().to_string();

    if source_id.is_empty() {
        let what = match request.direction {
            Direction::GistToSnippet => "Gist ID",
            Direction::SnippetToGist => "Snippet ID",
        };
        return Err(MigrationError::Validation(format!("{what} is required")));
    }
    if github_token.is_empty() || gitlab_token.is_empty() {
        return Err(MigrationError::Validation(
            "Both GitHub and GitLab tokens are required".to_string(),
        ));
    }

    Ok(MigrationRequest {
        source_id,
        credentials: Credentials {
            github_token,
            gitlab_token,
        },
        ..request
    })
}
