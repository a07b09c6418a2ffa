//! GitLab snippet client: the snippet-style source reader and target writer.
//!
//! Reading a multi-file snippet means one metadata call for the file
//! manifest, then one [fallback search](crate::fallback) per file. A file that
//! cannot be found is skipped when the snippet has other files; a
//! single-file snippet falls back to the whole-snippet raw endpoint instead.
//!
//! Writing creates one snippet per [`Batch`], always through the JSON `files`
//! array, even for a single file.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::cancel::CancellationToken;
use crate::chunk::Batch;
use crate::contract::{
    ApiRequest, RequestBody, SourceArtifact, SourceFile, SourceReader, TargetArtifact, Transport,
    Visibility,
};
use crate::error::{MigrationError, Result};
use crate::fallback::{self, RAW_ACCEPT};
use crate::http;
use crate::normalize::DEFAULT_FILE_NAME;

const JSON_ACCEPT: &str = "application/json";
/// Name for a legacy single-file snippet whose metadata carries no file name.
pub const DEFAULT_SNIPPET_FILE_NAME: &str = "snippet.txt";

#[derive(Debug, Deserialize)]
struct SnippetDocument {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    files: Option<Vec<SnippetFileEntry>>,
}

#[derive(Debug, Deserialize)]
struct SnippetFileEntry {
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    file_name: Option<String>,
}

impl SnippetFileEntry {
    fn into_path(self) -> String {
        [self.file_path, self.path, self.file_name]
            .into_iter()
            .flatten()
            .find(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct CreatedSnippet {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    web_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// The metadata of a snippet: title and the manifest of file paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetManifest {
    pub title: Option<String>,
    /// Top-level `file_name` of legacy single-file snippets.
    pub file_name: Option<String>,
    /// `None` when the service did not list files.
    pub files: Option<Vec<String>>,
}

pub struct SnippetClient<'a, T: ?Sized> {
    transport: &'a T,
    api_base: &'a str,
    token: &'a str,
}

impl<'a, T> SnippetClient<'a, T>
where
    T: Transport + ?Sized,
{
    pub fn new(transport: &'a T, api_base: &'a str, token: &'a str) -> Self {
        Self {
            transport,
            api_base: api_base.trim_end_matches('/'),
            token,
        }
    }

    pub async fn fetch_manifest(&self, id: &str) -> Result<SnippetManifest> {
        let url = format!("{}/snippets/{}", self.api_base, urlencoding::encode(id));
        let body = http::send_expecting_success(
            self.transport,
            ApiRequest::get(url, self.token, JSON_ACCEPT),
            "GitLab snippet fetch",
        )
        .await?;
        let document: SnippetDocument = http::decode(&body, "GitLab snippet fetch")?;

        Ok(SnippetManifest {
            title: document.title.filter(|t| !t.trim().is_empty()),
            file_name: document.file_name.filter(|n| !n.is_empty()),
            files: document
                .files
                .map(|entries| entries.into_iter().map(SnippetFileEntry::into_path).collect()),
        })
    }

    /// Whole-snippet raw content; no per-file addressing.
    pub async fn fetch_whole_raw(&self, id: &str) -> Result<String> {
        let url = format!("{}/snippets/{}/raw", self.api_base, urlencoding::encode(id));
        http::send_expecting_success(
            self.transport,
            ApiRequest::get(url, self.token, RAW_ACCEPT),
            "GitLab snippet raw fetch",
        )
        .await
    }

    /// Raw content of one file through the fallback search.
    pub async fn fetch_file(&self, id: &str, path: &str, cancel: &CancellationToken) -> Result<String> {
        let candidates = fallback::candidate_requests(self.api_base, id, path);
        fallback::first_available(self.transport, self.token, path, candidates, cancel).await
    }

    /// Creates one snippet holding every file of `batch`.
    pub async fn create(
        &self,
        title: &str,
        visibility: Visibility,
        batch: &Batch,
    ) -> Result<TargetArtifact> {
        if batch.is_empty() {
            return Err(MigrationError::Precondition(
                "snippet writer invoked with an empty batch".to_string(),
            ));
        }

        let payload = json!({
            "title": title,
            "visibility": visibility.as_str(),
            "files": batch
                .files
                .iter()
                .map(|f| json!({ "file_path": f.flat_name, "content": f.content }))
                .collect::<Vec<_>>(),
        });
        let url = format!("{}/snippets", self.api_base);
        let request = ApiRequest::post(url, self.token, JSON_ACCEPT, RequestBody::Json(payload));
        let context = "GitLab create multi-file snippet";

        info!(
            title,
            files = batch.len(),
            part = batch.index + 1,
            total = batch.total,
            "[WRITE] Creating GitLab snippet"
        );
        let body = http::send_expecting_success(self.transport, request, context).await?;
        let created: CreatedSnippet = http::decode(&body, context)?;

        let artifact = TargetArtifact {
            id: created.id.map(|id| id_to_string(&id)).unwrap_or_default(),
            url: created.web_url.or(created.url).unwrap_or_default(),
            part: (batch.total > 1).then(|| batch.part()),
        };
        info!(snippet_id = %artifact.id, url = %artifact.url, "[WRITE] GitLab snippet created");
        Ok(artifact)
    }

    async fn read_listed(
        &self,
        id: &str,
        title: Option<String>,
        paths: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<SourceArtifact> {
        let single_file = paths.len() == 1;
        let mut files = Vec::with_capacity(paths.len());
        let mut skipped = Vec::new();

        for path in &paths {
            match self.fetch_file(id, path, cancel).await {
                Ok(content) => files.push(SourceFile::resolved(path, content)),
                Err(e) if e.is_not_found() && single_file => {
                    warn!(file = %path, error = %e, "[READ] Single-file snippet: falling back to whole-snippet raw");
                    cancel.check()?;
                    let content = self.fetch_whole_raw(id).await?;
                    files.push(SourceFile::resolved(path, content));
                }
                Err(e) if e.is_not_found() => {
                    warn!(file = %path, error = %e, "[READ] Skipping missing file in GitLab snippet");
                    skipped.push(path.clone());
                }
                Err(e) => {
                    error!(file = %path, error = %e, "[READ] Snippet file fetch failed");
                    return Err(e);
                }
            }
        }

        if files.is_empty() {
            error!(snippet_id = id, listed = paths.len(), "[READ] No snippet file could be retrieved");
            return Err(MigrationError::NoFilesRetrieved { id: id.to_string() });
        }

        Ok(SourceArtifact {
            id: id.to_string(),
            title,
            files,
            skipped,
        })
    }
}

fn id_to_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl<'a, T> SourceReader for SnippetClient<'a, T>
where
    T: Transport + ?Sized,
{
    async fn read(&self, id: &str, cancel: &CancellationToken) -> Result<SourceArtifact> {
        cancel.check()?;
        let manifest = self.fetch_manifest(id).await?;

        match manifest.files {
            Some(paths) if !paths.is_empty() => {
                info!(snippet_id = id, files = paths.len(), "[READ] Fetched snippet manifest");
                self.read_listed(id, manifest.title, paths, cancel).await
            }
            _ => {
                info!(snippet_id = id, "[READ] Snippet lists no files, reading whole-snippet raw");
                cancel.check()?;
                let content = self.fetch_whole_raw(id).await?;
                let path = manifest
                    .file_name
                    .unwrap_or_else(|| DEFAULT_SNIPPET_FILE_NAME.to_string());
                Ok(SourceArtifact {
                    id: id.to_string(),
                    title: manifest.title,
                    files: vec![SourceFile::resolved(path, content)],
                    skipped: Vec::new(),
                })
            }
        }
    }
}
