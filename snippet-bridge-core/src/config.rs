use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_GITLAB_API_BASE: &str = "https://gitlab.com/api/v4";
/// GitLab personal snippets accept at most this many files.
pub const SNIPPET_FILE_LIMIT: usize = 10;
pub const DEFAULT_GUARD_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

/// Where the services live and how long a migration may take.
///
/// Contains no secrets; tokens are supplied per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub github_api_base: String,
    pub gitlab_api_base: String,
    /// Wall-clock guard for the whole remote phase.
    pub guard_timeout_secs: u64,
    /// Files per created snippet.
    pub snippet_file_limit: usize,
    /// Per-request timeout of the HTTP client; `null` disables it.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            github_api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            gitlab_api_base: DEFAULT_GITLAB_API_BASE.to_string(),
            guard_timeout_secs: DEFAULT_GUARD_TIMEOUT_SECS,
            snippet_file_limit: SNIPPET_FILE_LIMIT,
            request_timeout_secs: Some(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ServiceConfig {
    pub fn github_base(&self) -> &str {
        self.github_api_base.trim_end_matches('/')
    }

    pub fn gitlab_base(&self) -> &str {
        self.gitlab_api_base.trim_end_matches('/')
    }

    pub fn trace_loaded(&self) {
        info!(
            github_api_base = %self.github_api_base,
            gitlab_api_base = %self.gitlab_api_base,
            guard_timeout_secs = self.guard_timeout_secs,
            snippet_file_limit = self.snippet_file_limit,
            "Loaded ServiceConfig"
        );
        debug!(?self, "ServiceConfig loaded (full debug)");
    }
}
