//! # contract: shared data model and trait seams
//!
//! Plain data types flowing through the pipeline (source artifacts, normalized
//! files, created target artifacts) plus the two traits the pipeline is built
//! on:
//!
//! - [`Transport`]: sends one HTTP request and hands back status and body.
//!   Implemented by [`crate::http::ReqwestTransport`] in production and by
//!   `MockTransport` (mockall) or in-memory fakes in tests.
//! - [`SourceReader`]: reads a whole source artifact with every file resolved.
//!   Implemented by the gist and snippet clients.
//!
//! ## Mocking & Testing
//! - `Transport` is annotated for `mockall`; the mock is exported behind the
//!   default `test-export-mocks` feature so integration tests can use it.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::error::Result;

/// Which way files move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Read a GitHub gist, create one or more GitLab snippets.
    GistToSnippet,
    /// Read a GitLab snippet, create one GitHub gist.
    SnippetToGist,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::GistToSnippet => f.write_str("gist-to-snippet"),
            Direction::SnippetToGist => f.write_str("snippet-to-gist"),
        }
    }
}

/// Visibility requested for the created artifact(s).
///
/// GitLab understands all three levels. A gist is public only for
/// [`Visibility::Public`]; anything else creates a secret gist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Internal,
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Internal => "internal",
            Visibility::Public => "public",
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Visibility::Public)
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(Visibility::Private),
            "internal" => Ok(Visibility::Internal),
            "public" => Ok(Visibility::Public),
            other => Err(format!("unknown visibility '{other}'")),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pre-issued tokens for both services. Only ever sent to their owning service.
#[derive(Clone, Default)]
pub struct Credentials {
    pub github_token: String,
    pub gitlab_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("github_token", &redacted(&self.github_token))
            .field("gitlab_token", &redacted(&self.gitlab_token))
            .finish()
    }
}

fn redacted(token: &str) -> &'static str {
    if token.trim().is_empty() {
        "<missing>"
    } else {
        "<redacted>"
    }
}

/// A source artifact as read from the remote service. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArtifact {
    pub id: String,
    /// Gist description or snippet title; `None` when blank.
    pub title: Option<String>,
    pub files: Vec<SourceFile>,
    /// Paths listed by the service but omitted under the partial-failure policy.
    pub skipped: Vec<String>,
}

/// One file of a source artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Hierarchical path (snippets) or file name (gists).
    pub path: String,
    pub content: Option<String>,
    /// Content is only a preview and must be resolved through another path.
    pub truncated: bool,
}

impl SourceFile {
    pub fn resolved(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: Some(content.into()),
            truncated: false,
        }
    }

    /// Content that may be passed downstream: present and not truncated.
    pub fn usable_content(&self) -> Option<&str> {
        match (&self.content, self.truncated) {
            (Some(content), false) => Some(content.as_str()),
            _ => None,
        }
    }
}

/// A file ready to be written: flat, non-empty name unique within its batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedFile {
    pub flat_name: String,
    pub content: String,
}

/// Position of a created artifact when one source maps to several targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartInfo {
    /// 1-based.
    pub index: usize,
    pub total: usize,
}

/// An artifact created on the target service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetArtifact {
    pub id: String,
    pub url: String,
    pub part: Option<PartInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
}

/// Transport-agnostic description of one HTTP request.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub bearer_token: String,
    pub accept: String,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>, bearer_token: &str, accept: &str) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            bearer_token: bearer_token.to_string(),
            accept: accept.to_string(),
            body: RequestBody::Empty,
        }
    }

    pub fn post(url: impl Into<String>, bearer_token: &str, accept: &str, body: RequestBody) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            bearer_token: bearer_token.to_string(),
            accept: accept.to_string(),
            body,
        }
    }

    /// JSON body, if any. Convenient in tests.
    pub fn json_body(&self) -> Option<&serde_json::Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            RequestBody::Empty => None,
        }
    }
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("bearer_token", &redacted(&self.bearer_token))
            .field("accept", &self.accept)
            .field("body", &self.body)
            .finish()
    }
}

/// Status and text body of a completed request, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Error type for the Transport trait (request never produced a response).
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Sends requests to the remote services.
///
/// A non-success status is *not* an error at this level: the caller decides
/// what 404 or 500 means. Errors are reserved for requests that produced no
/// response at all (connection refused, TLS failure, unreadable body).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> std::result::Result<ApiResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        (**self).send(request).await
    }
}

/// Reads a source artifact with every file's content fully resolved.
#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn read(&self, id: &str, cancel: &CancellationToken) -> Result<SourceArtifact>;
}
