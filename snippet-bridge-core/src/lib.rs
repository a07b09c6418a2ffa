#![doc = "snippet-bridge-core: migration pipeline between GitHub gists and GitLab snippets."]

//! All pipeline logic lives here; the `snippet-bridge` crate is only the
//! command-line surface.
//!
//! # Layout
//! - [`contract`]: data model plus the [`contract::Transport`] and
//!   [`contract::SourceReader`] seams.
//! - [`gist`] / [`snippet`]: service clients, each both reader and writer.
//! - [`fallback`]: raw snippet file search across endpoint shapes.
//! - [`normalize`] / [`chunk`]: flat unique names and file-count batches.
//! - [`migrate`]: the orchestrator and its state transitions.
//!
//! # Usage
//! ```no_run
//! use snippet_bridge_core::config::ServiceConfig;
//! use snippet_bridge_core::contract::{Credentials, Direction, Visibility};
//! use snippet_bridge_core::http::ReqwestTransport;
//! use snippet_bridge_core::migrate::{MigrationOrchestrator, MigrationRequest};
//!
//! # async fn demo() -> snippet_bridge_core::error::Result<()> {
//! let config = ServiceConfig::default();
//! let orchestrator = MigrationOrchestrator::new(ReqwestTransport::new(&config)?, config);
//! let report = orchestrator
//!     .run(MigrationRequest {
//!         direction: Direction::GistToSnippet,
//!         source_id: "aa5a315d61ae9438b18d".into(),
//!         credentials: Credentials {
//!             github_token: "ghp_...".into(),
//!             gitlab_token: "glpat-...".into(),
//!         },
//!         visibility: Visibility::Private,
//!     })
//!     .await?;
//! println!("{} snippet(s) created", report.created.len());
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod chunk;
pub mod config;
pub mod contract;
pub mod error;
pub mod fallback;
pub mod gist;
pub mod http;
pub mod migrate;
pub mod normalize;
pub mod snippet;
