///
/// This module implements the CLI interface for snippet-bridge: command
/// parsing, argument exposure, and the async entrypoint.
///
/// All migration logic (clients, fallback search, orchestrator) lives in the
/// [`snippet-bridge-core`] crate. This module only wires arguments and
/// configuration into a [`MigrationOrchestrator`] and renders its output.
///
/// ## How To Use
/// - Command line: `snippet-bridge migrate gist-to-snippet <GIST_ID>` with
///   `GITHUB_TOKEN` and `GITLAB_TOKEN` in the environment (or `.env`).
/// - Programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`snippet-bridge-core`]: ../../snippet-bridge-core/
use crate::load_config::resolve_config;
use crate::render;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use snippet_bridge_core::contract::{Credentials, Direction, Visibility};
use snippet_bridge_core::http::ReqwestTransport;
use snippet_bridge_core::migrate::{MigrationOrchestrator, MigrationRequest};
use std::path::PathBuf;
use tokio::sync::mpsc::unbounded_channel;

/// CLI for snippet-bridge: move files between GitHub gists and GitLab snippets.
#[derive(Parser)]
#[clap(
    name = "snippet-bridge",
    version,
    about = "Migrate a GitHub gist to GitLab snippets, or a GitLab snippet to a GitHub gist"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy one gist or snippet to the other service
    Migrate {
        /// Which way to migrate
        #[clap(value_enum)]
        direction: DirectionArg,
        /// Gist ID or numeric snippet ID of the source
        source_id: String,
        /// Visibility of the created artifact(s): private, internal or public
        #[clap(long, default_value = "private")]
        visibility: Visibility,
        /// GitHub token with gist scope
        #[clap(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,
        /// GitLab token with api scope
        #[clap(long, env = "GITLAB_TOKEN", hide_env_values = true)]
        gitlab_token: Option<String>,
        /// Optional YAML file overriding service endpoints and limits
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    GistToSnippet,
    SnippetToGist,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::GistToSnippet => Direction::GistToSnippet,
            DirectionArg::SnippetToGist => Direction::SnippetToGist,
        }
    }
}

/// Async CLI entrypoint for main() and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Migrate {
            direction,
            source_id,
            visibility,
            github_token,
            gitlab_token,
            config,
        } => {
            let config = resolve_config(config.as_deref())?;
            config.trace_loaded();
            let transport =
                ReqwestTransport::new(&config).context("Failed to construct HTTP client")?;

            let (tx, rx) = unbounded_channel();
            let printer = tokio::spawn(render::print_transitions(rx, std::io::stderr()));
            let orchestrator = MigrationOrchestrator::new(transport, config).with_observer(tx);

            let direction = Direction::from(direction);
            tracing::info!(command = "migrate", %direction, "Starting migration");
            let result = orchestrator
                .run(MigrationRequest {
                    direction,
                    source_id,
                    credentials: Credentials {
                        github_token: github_token.unwrap_or_default(),
                        gitlab_token: gitlab_token.unwrap_or_default(),
                    },
                    visibility,
                })
                .await;
            drop(orchestrator);
            if let Err(e) = printer.await {
                tracing::warn!(error = %e, "Transition printer task failed");
            }

            match result {
                Ok(report) => {
                    tracing::info!(command = "migrate", created = report.created.len(), "Migration complete");
                    for line in render::report_lines(&report) {
                        println!("{line}");
                    }
                    if let Some(line) = render::skipped_line(&report) {
                        eprintln!("{line}");
                    }
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "migrate", error = %e, "Migration failed");
                    Err(e.into())
                }
            }
        }
    }
}
