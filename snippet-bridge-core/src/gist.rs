//! GitHub gist client: the gist-style source reader and target writer.
//!
//! Gist files come back inline in the metadata response. Large files only
//! carry a truncated preview; the full text is behind a raw URL this client
//! deliberately does not follow, so a file that stays truncated after one
//! more metadata fetch fails the whole migration.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use crate::cancel::CancellationToken;
use crate::contract::{
    ApiRequest, NormalizedFile, RequestBody, SourceArtifact, SourceFile, SourceReader,
    TargetArtifact, Transport,
};
use crate::error::{MigrationError, Result};
use crate::http;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

#[derive(Debug, Deserialize)]
struct GistDocument {
    #[serde(default)]
    description: Option<String>,
    /// Kept as a JSON map so the service's file order survives.
    #[serde(default)]
    files: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct GistFileDocument {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct CreatedGist {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

pub struct GistClient<'a, T: ?Sized> {
    transport: &'a T,
    api_base: &'a str,
    token: &'a str,
}

impl<'a, T> GistClient<'a, T>
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

    /// One metadata fetch, files as the service reported them.
    pub async fn fetch(&self, id: &str) -> Result<SourceArtifact> {
        let url = format!("{}/gists/{}", self.api_base, urlencoding::encode(id));
        let body = http::send_expecting_success(
            self.transport,
            ApiRequest::get(url, self.token, GITHUB_ACCEPT),
            "GitHub Gist fetch",
        )
        .await?;
        let document: GistDocument = http::decode(&body, "GitHub Gist fetch")?;

        let files = document
            .files
            .into_iter()
            .map(|(name, value)| {
                let file: GistFileDocument =
                    serde_json::from_value(value).map_err(|e| MigrationError::Decode {
                        context: "GitHub Gist fetch".to_string(),
                        message: format!("file '{name}': {e}"),
                    })?;
                Ok(SourceFile {
                    path: name,
                    content: file.content,
                    truncated: file.truncated,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SourceArtifact {
            id: id.to_string(),
            title: document.description.filter(|d| !d.trim().is_empty()),
            files,
            skipped: Vec::new(),
        })
    }

    /// Creates exactly one gist holding every file.
    pub async fn create(
        &self,
        description: &str,
        public: bool,
        files: &[NormalizedFile],
    ) -> Result<TargetArtifact> {
        if files.is_empty() {
            return Err(MigrationError::Precondition(
                "gist writer invoked without files".to_string(),
            ));
        }

        let mut file_map = Map::new();
        for file in files {
            file_map.insert(file.flat_name.clone(), json!({ "content": file.content }));
        }
        let payload = json!({
            "description": description,
            "public": public,
            "files": Value::Object(file_map),
        });

        info!(files = files.len(), public, "[WRITE] Creating GitHub gist");
        let url = format!("{}/gists", self.api_base);
        let body = http::send_expecting_success(
            self.transport,
            ApiRequest::post(url, self.token, GITHUB_ACCEPT, RequestBody::Json(payload)),
            "GitHub create gist",
        )
        .await?;
        let created: CreatedGist = http::decode(&body, "GitHub create gist")?;

        let artifact = TargetArtifact {
            id: created.id.unwrap_or_default(),
            url: created.html_url.or(created.url).unwrap_or_default(),
            part: None,
        };
        info!(gist_id = %artifact.id, url = %artifact.url, "[WRITE] GitHub gist created");
        Ok(artifact)
    }
}

#[async_trait]
impl<'a, T> SourceReader for GistClient<'a, T>
where
    T: Transport + ?Sized,
{
    async fn read(&self, id: &str, cancel: &CancellationToken) -> Result<SourceArtifact> {
        cancel.check()?;
        let listed = self.fetch(id).await?;
        info!(gist_id = id, files = listed.files.len(), "[READ] Fetched gist metadata");
        if listed.files.is_empty() {
            return Err(MigrationError::EmptySource { id: id.to_string() });
        }

        let mut refreshed: Option<SourceArtifact> = None;
        let mut files = Vec::with_capacity(listed.files.len());

        for file in &listed.files {
            if let Some(content) = file.usable_content() {
                files.push(SourceFile::resolved(&file.path, content));
                continue;
            }

            warn!(file = %file.path, "[READ] Gist file truncated, re-fetching gist metadata");
            if refreshed.is_none() {
                cancel.check()?;
                refreshed = Some(self.fetch(id).await?);
            }
            let content = refreshed
                .as_ref()
                .and_then(|gist| gist.files.iter().find(|f| f.path == file.path))
                .and_then(SourceFile::usable_content);

            match content {
                Some(content) => files.push(SourceFile::resolved(&file.path, content)),
                None => {
                    error!(file = %file.path, "[READ] Gist file content unavailable inline");
                    return Err(MigrationError::ContentUnavailable {
                        file: file.path.clone(),
                    });
                }
            }
        }

        Ok(SourceArtifact {
            id: listed.id,
            title: listed.title,
            files,
            skipped: Vec::new(),
        })
    }
}
