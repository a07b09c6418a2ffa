//! Fallback search for raw snippet file content.
//!
//! GitLab exposes a file of a personal snippet through several request
//! shapes, and which one answers depends on the instance, on the default
//! branch name of the snippet repository, and on how the backend decodes the
//! path. [`candidate_requests`] enumerates every shape in a fixed priority
//! order as a lazy, deduplicated sequence; [`first_available`] walks that
//! sequence:
//!
//! - 2xx: return the body, stop;
//! - 404 or 400: try the next candidate;
//! - anything else: abort with [`MigrationError::Remote`].
//!
//! Exhausting the sequence yields [`MigrationError::NotFound`] so the caller
//! can decide between the whole-snippet fallback and skipping the file.

use std::collections::HashSet;

use tracing::{debug, error, info};

use crate::cancel::CancellationToken;
use crate::contract::{ApiRequest, Transport};
use crate::error::{MigrationError, Result};
use crate::http;

pub const RAW_ACCEPT: &str = "text/plain, */*";

/// The two request shapes, tried as two consecutive phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointShape {
    /// `GET /snippets/:id/raw?file_path=<path>[&ref=<ref>]`
    SnippetRaw,
    /// `GET /projects/snippets%2F:id/repository/files/<path>/raw[?ref=<ref>]`
    RepositoryFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEncoding {
    Single,
    /// Some backends decode the path one more time than standard.
    Double,
}

const ENDPOINT_SHAPES: [EndpointShape; 2] = [EndpointShape::SnippetRaw, EndpointShape::RepositoryFile];
const PATH_ENCODINGS: [PathEncoding; 2] = [PathEncoding::Single, PathEncoding::Double];
/// `None` leaves the revision to the server default.
const REVISION_REFS: [Option<&str>; 3] = [Some("main"), Some("master"), None];

/// One request the fallback search may issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub shape: EndpointShape,
    pub encoding: PathEncoding,
    pub reference: Option<&'static str>,
}

/// Lazily yields the candidate requests for one snippet file: endpoint shape
/// outermost, then path encoding, then revision. Candidates whose URL equals
/// an earlier one (paths that encode the same way twice) are dropped.
pub fn candidate_requests(
    api_base: &str,
    snippet_id: &str,
    file_path: &str,
) -> impl Iterator<Item = Candidate> {
    let single = urlencoding::encode(file_path).into_owned();
    let double = urlencoding::encode(&single).into_owned();
    let raw_base = format!("{}/snippets/{}/raw", api_base, urlencoding::encode(snippet_id));
    let repo_base = format!(
        "{}/projects/{}/repository/files",
        api_base,
        urlencoding::encode(&format!("snippets/{snippet_id}"))
    );
    let mut seen = HashSet::new();

    ENDPOINT_SHAPES
        .into_iter()
        .flat_map(|shape| PATH_ENCODINGS.into_iter().map(move |encoding| (shape, encoding)))
        .flat_map(|(shape, encoding)| {
            REVISION_REFS
                .into_iter()
                .map(move |reference| (shape, encoding, reference))
        })
        .map(move |(shape, encoding, reference)| {
            let path = match encoding {
                PathEncoding::Single => &single,
                PathEncoding::Double => &double,
            };
            let url = match (shape, reference) {
                (EndpointShape::SnippetRaw, Some(r)) => {
                    format!("{raw_base}?file_path={path}&ref={}", urlencoding::encode(r))
                }
                (EndpointShape::SnippetRaw, None) => format!("{raw_base}?file_path={path}"),
                (EndpointShape::RepositoryFile, Some(r)) => {
                    format!("{repo_base}/{path}/raw?ref={}", urlencoding::encode(r))
                }
                (EndpointShape::RepositoryFile, None) => format!("{repo_base}/{path}/raw"),
            };
            Candidate {
                url,
                shape,
                encoding,
                reference,
            }
        })
        .filter(move |candidate| seen.insert(candidate.url.clone()))
}

/// Issues `candidates` in order and returns the first successful body.
pub async fn first_available<T, I>(
    transport: &T,
    token: &str,
    file: &str,
    candidates: I,
    cancel: &CancellationToken,
) -> Result<String>
where
    T: Transport + ?Sized,
    I: IntoIterator<Item = Candidate>,
{
    let mut last_status = 404;
    for (attempt, candidate) in candidates.into_iter().enumerate() {
        cancel.check()?;
        let response = http::send(transport, ApiRequest::get(&candidate.url, token, RAW_ACCEPT)).await?;

        if response.is_success() {
            info!(
                file,
                attempt = attempt + 1,
                shape = ?candidate.shape,
                encoding = ?candidate.encoding,
                reference = candidate.reference.unwrap_or("default"),
                "[READ] Raw snippet file retrieved"
            );
            return Ok(response.body);
        }

        match response.status {
            404 | 400 => {
                debug!(
                    file,
                    attempt = attempt + 1,
                    status = response.status,
                    url = %candidate.url,
                    "[READ] Candidate not found, trying next"
                );
                last_status = response.status;
            }
            status => {
                error!(file, status, url = %candidate.url, "[READ] Raw snippet file fetch aborted");
                return Err(MigrationError::Remote {
                    context: format!("GitLab snippet file raw fetch for {file}"),
                    status,
                    body: response.body,
                });
            }
        }
    }

    Err(MigrationError::NotFound {
        file: file.to_string(),
        status: last_status,
    })
}
