use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc::unbounded_channel;

use snippet_bridge_core::config::ServiceConfig;
use snippet_bridge_core::contract::{
    ApiRequest, ApiResponse, Credentials, Direction, HttpMethod, Transport, TransportError,
    Visibility,
};
use snippet_bridge_core::error::MigrationError;
use snippet_bridge_core::migrate::{
    MigrationOrchestrator, MigrationReport, MigrationRequest, MigrationState, CANCEL_GRACE,
};

#[derive(Debug, Clone)]
struct StoredArtifact {
    title: Option<String>,
    files: Vec<(String, String)>,
}

#[derive(Default)]
struct ServiceState {
    gists: HashMap<String, StoredArtifact>,
    snippets: HashMap<String, StoredArtifact>,
    /// Snippet file paths no per-file endpoint will serve.
    unreachable: HashSet<String>,
    requests: Vec<(HttpMethod, String)>,
    next_id: u64,
}

/// In-memory stand-in for both remote services.
#[derive(Default)]
struct FakeServices {
    state: Mutex<ServiceState>,
    /// Artificial latency of every creation call.
    create_delay: Option<Duration>,
    /// Creation calls never complete.
    stall_creates: bool,
}

impl FakeServices {
    fn with_gist(self, id: &str, title: Option<&str>, files: &[(&str, &str)]) -> Self {
        self.state.lock().unwrap().gists.insert(id.to_string(), artifact(title, files));
        self
    }

    fn with_snippet(self, id: &str, title: Option<&str>, files: &[(&str, &str)]) -> Self {
        self.state.lock().unwrap().snippets.insert(id.to_string(), artifact(title, files));
        self
    }

    fn unreachable(self, path: &str) -> Self {
        self.state.lock().unwrap().unreachable.insert(path.to_string());
        self
    }

    fn requests(&self) -> Vec<(HttpMethod, String)> {
        self.state.lock().unwrap().requests.clone()
    }

    fn created_snippets(&self) -> Vec<StoredArtifact> {
        let state = self.state.lock().unwrap();
        let mut ids: Vec<_> = state
            .snippets
            .keys()
            .filter_map(|k| k.strip_prefix("new-").map(|n| n.parse::<u64>().unwrap()))
            .collect();
        ids.sort();
        ids.iter().map(|n| state.snippets[&format!("new-{n}")].clone()).collect()
    }

    fn gist(&self, id: &str) -> StoredArtifact {
        self.state.lock().unwrap().gists[id].clone()
    }

    fn route(&self, request: &ApiRequest) -> ApiResponse {
        let url = Url::parse(&request.url).unwrap();
        let segments: Vec<String> = url
            .path_segments()
            .unwrap()
            .map(|s| urlencoding::decode(s).unwrap().into_owned())
            .collect();
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let mut state = self.state.lock().unwrap();
        state.requests.push((request.method, request.url.clone()));

        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        match (url.host_str().unwrap(), request.method, segments.as_slice()) {
            ("api.github.com", HttpMethod::Get, ["gists", id]) => match state.gists.get(*id) {
                Some(gist) => {
                    let mut files = Map::new();
                    for (name, content) in &gist.files {
                        files.insert(name.clone(), json!({ "content": content, "truncated": false }));
                    }
                    ok(json!({ "id": id, "description": gist.title, "files": files }))
                }
                None => ApiResponse::new(404, "{\"message\":\"Not Found\"}"),
            },
            ("api.github.com", HttpMethod::Post, ["gists"]) => {
                let body = request.json_body().unwrap();
                let files = body["files"]
                    .as_object()
                    .unwrap()
                    .iter()
                    .map(|(name, f)| (name.clone(), f["content"].as_str().unwrap().to_string()))
                    .collect();
                state.next_id += 1;
                let id = format!("new-{}", state.next_id);
                state.gists.insert(
                    id.clone(),
                    StoredArtifact {
                        title: body["description"].as_str().map(str::to_string),
                        files,
                    },
                );
                created(json!({ "id": id, "html_url": format!("https://gist.github.com/{id}") }))
            }
            ("gitlab.com", HttpMethod::Get, ["api", "v4", "snippets", id]) => {
                match state.snippets.get(*id) {
                    Some(snippet) => {
                        let files: Vec<Value> =
                            snippet.files.iter().map(|(p, _)| json!({ "path": p })).collect();
                        ok(json!({ "id": id, "title": snippet.title, "files": files }))
                    }
                    None => ApiResponse::new(404, "{\"message\":\"404 Snippet Not Found\"}"),
                }
            }
            ("gitlab.com", HttpMethod::Get, ["api", "v4", "snippets", id, "raw"]) => {
                let Some(snippet) = state.snippets.get(*id) else {
                    return ApiResponse::new(404, "");
                };
                match query.get("file_path") {
                    None => ApiResponse::new(200, snippet.files[0].1.clone()),
                    Some(path) if state.unreachable.contains(path) => ApiResponse::new(404, ""),
                    Some(path) => snippet
                        .files
                        .iter()
                        .find(|(p, _)| p == path)
                        .map(|(_, c)| ApiResponse::new(200, c.clone()))
                        .unwrap_or_else(|| ApiResponse::new(400, "")),
                }
            }
            ("gitlab.com", HttpMethod::Get, ["api", "v4", "projects", ..]) => ApiResponse::new(404, ""),
            ("gitlab.com", HttpMethod::Post, ["api", "v4", "snippets"]) => {
                let Some(body) = request.json_body() else {
                    return ApiResponse::new(400, "expected a JSON body");
                };
                let stored = StoredArtifact {
                    title: body["title"].as_str().map(str::to_string),
                    files: body["files"]
                        .as_array()
                        .unwrap()
                        .iter()
                        .map(|f| {
                            (
                                f["file_path"].as_str().unwrap().to_string(),
                                f["content"].as_str().unwrap().to_string(),
                            )
                        })
                        .collect(),
                };
                if stored.files.len() > 10 {
                    return ApiResponse::new(400, "{\"message\":\"too many files\"}");
                }
                state.next_id += 1;
                let n = state.next_id;
                state.snippets.insert(format!("new-{n}"), stored);
                created(json!({ "id": format!("new-{n}"), "web_url": format!("https://gitlab.com/-/snippets/{n}") }))
            }
            other => panic!("unexpected request {other:?}"),
        }
    }
}

#[async_trait]
impl Transport for FakeServices {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        if request.method == HttpMethod::Post {
            if self.stall_creates {
                std::future::pending::<()>().await;
            }
            if let Some(delay) = self.create_delay {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(self.route(&request))
    }
}

fn artifact(title: Option<&str>, files: &[(&str, &str)]) -> StoredArtifact {
    StoredArtifact {
        title: title.map(str::to_string),
        files: files.iter().map(|(p, c)| (p.to_string(), c.to_string())).collect(),
    }
}

fn ok(body: Value) -> ApiResponse {
    ApiResponse::new(200, body.to_string())
}

fn created(body: Value) -> ApiResponse {
    ApiResponse::new(201, body.to_string())
}

fn request(direction: Direction, source_id: &str) -> MigrationRequest {
    MigrationRequest {
        direction,
        source_id: source_id.to_string(),
        credentials: Credentials {
            github_token: "ghp_test".into(),
            gitlab_token: "glpat-test".into(),
        },
        visibility: Visibility::Private,
    }
}

async fn run(
    services: &Arc<FakeServices>,
    request: MigrationRequest,
) -> (Result<MigrationReport, MigrationError>, Vec<MigrationState>) {
    let (tx, mut rx) = unbounded_channel();
    let orchestrator =
        MigrationOrchestrator::new(Arc::clone(services), ServiceConfig::default()).with_observer(tx);
    let result = orchestrator.run(request).await;
    drop(orchestrator);

    let mut states = Vec::new();
    while let Some(state) = rx.recv().await {
        states.push(state);
    }
    (result, states)
}

#[tokio::test]
async fn twenty_three_file_gist_becomes_three_snippets() {
    let names: Vec<String> = (1..=23).map(|i| format!("f{i:02}.txt")).collect();
    let files: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), "x")).collect();
    let services = Arc::new(FakeServices::default().with_gist("big", Some("dotfiles"), &files));

    let (result, states) = run(&services, request(Direction::GistToSnippet, "big")).await;
    let report = result.expect("migration succeeds");

    assert_eq!(report.created.len(), 3);
    let parts: Vec<_> = report.created.iter().map(|a| a.part.map(|p| (p.index, p.total))).collect();
    assert_eq!(parts, vec![Some((1, 3)), Some((2, 3)), Some((3, 3))]);

    let snippets = services.created_snippets();
    let sizes: Vec<_> = snippets.iter().map(|s| s.files.len()).collect();
    assert_eq!(sizes, vec![10, 10, 3]);
    assert_eq!(snippets[0].title.as_deref(), Some("dotfiles (part 1/3)"));
    assert_eq!(snippets[2].title.as_deref(), Some("dotfiles (part 3/3)"));
    assert_eq!(snippets[2].files[2].0, "f23.txt");

    assert_eq!(
        states,
        vec![
            MigrationState::Idle,
            MigrationState::Validating,
            MigrationState::AwaitingRemote,
            MigrationState::Finalizing,
            MigrationState::Succeeded,
        ]
    );
}

#[tokio::test]
async fn unreachable_file_is_skipped_from_multi_file_snippet() {
    let services = Arc::new(
        FakeServices::default()
            .with_snippet(
                "5",
                Some("scripts"),
                &[
                    ("a.txt", "A"),
                    ("src/main.rs", "fn main() {}"),
                    ("c.txt", "C"),
                    ("d.txt", "D"),
                    ("e.txt", "E"),
                ],
            )
            .unreachable("c.txt"),
    );

    let (result, _) = run(&services, request(Direction::SnippetToGist, "5")).await;
    let report = result.expect("migration succeeds");

    assert_eq!(report.skipped, vec!["c.txt".to_string()]);
    assert_eq!(report.created.len(), 1);
    let gist = services.gist(&report.created[0].id);
    assert_eq!(gist.title.as_deref(), Some("scripts"));
    let names: Vec<_> = gist.files.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "src__main.rs", "d.txt", "e.txt"]);
}

#[tokio::test]
async fn single_file_snippet_falls_back_to_whole_raw() {
    let services = Arc::new(
        FakeServices::default()
            .with_snippet("9", None, &[("only.sh", "echo hi")])
            .unreachable("only.sh"),
    );

    let (result, _) = run(&services, request(Direction::SnippetToGist, "9")).await;
    let report = result.expect("migration succeeds");

    assert!(report.skipped.is_empty());
    let gist = services.gist(&report.created[0].id);
    assert_eq!(gist.title.as_deref(), Some("Imported from GitLab Snippet #9"));
    assert_eq!(gist.files, vec![("only.sh".to_string(), "echo hi".to_string())]);

    let requests = services.requests();
    assert!(requests
        .iter()
        .any(|(_, url)| url == "https://gitlab.com/api/v4/snippets/9/raw"));
}

#[tokio::test]
async fn gist_round_trips_through_a_snippet() {
    let services = Arc::new(FakeServices::default().with_gist("g1", None, &[("hello.txt", "hi")]));

    let (to_snippet, _) = run(&services, request(Direction::GistToSnippet, "g1")).await;
    let to_snippet = to_snippet.expect("gist to snippet succeeds");
    assert_eq!(to_snippet.created[0].part, None);
    let snippet = services.created_snippets().remove(0);
    assert_eq!(snippet.title.as_deref(), Some("from-gist"));

    let (back, _) = run(&services, request(Direction::SnippetToGist, &to_snippet.created[0].id)).await;
    let back = back.expect("snippet to gist succeeds");

    let gist = services.gist(&back.created[0].id);
    assert_eq!(gist.files, vec![("hello.txt".to_string(), "hi".to_string())]);
}

#[tokio::test]
async fn missing_credentials_make_no_remote_calls() {
    let services = Arc::new(FakeServices::default().with_gist("g1", None, &[("a", "b")]));
    let mut req = request(Direction::GistToSnippet, "g1");
    req.credentials.gitlab_token = "   ".into();

    let (result, states) = run(&services, req).await;

    let err = result.unwrap_err();
    assert!(matches!(err, MigrationError::Validation(_)));
    assert_eq!(err.to_string(), "Both GitHub and GitLab tokens are required");
    assert!(services.requests().is_empty());
    assert_eq!(states.last(), Some(&MigrationState::Failed));
}

#[tokio::test]
async fn remote_failure_is_reported_as_failed() {
    let services = Arc::new(FakeServices::default());

    let (result, states) = run(&services, request(Direction::GistToSnippet, "nope")).await;

    let err = result.unwrap_err();
    assert_eq!(
        err.to_string(),
        "GitHub Gist fetch failed: 404 {\"message\":\"Not Found\"}"
    );
    assert_eq!(
        &states[states.len() - 2..],
        &[MigrationState::Finalizing, MigrationState::Failed]
    );
}

#[tokio::test(start_paused = true)]
async fn guard_timeout_stops_before_the_next_creation() {
    let names: Vec<String> = (0..23).map(|i| format!("f{i}.txt")).collect();
    let files: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), "x")).collect();
    let services = Arc::new(FakeServices {
        create_delay: Some(Duration::from_secs(16)),
        ..FakeServices::default()
    }
    .with_gist("slow", None, &files));

    let (result, states) = run(&services, request(Direction::GistToSnippet, "slow")).await;

    // First creation lands at 16s, the guard fires at 30s while the second is
    // in flight. It lands at 32s, inside the grace period; the third is never
    // sent.
    match result.unwrap_err() {
        MigrationError::TimedOut { after_secs, created } => {
            assert_eq!(after_secs, 30);
            assert_eq!(created.len(), 2);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    let posts = services
        .requests()
        .into_iter()
        .filter(|(method, _)| *method == HttpMethod::Post)
        .count();
    assert_eq!(posts, 2);
    assert_eq!(
        states,
        vec![
            MigrationState::Idle,
            MigrationState::Validating,
            MigrationState::AwaitingRemote,
            MigrationState::TimedOut,
            MigrationState::Finalizing,
            MigrationState::Failed,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn stalled_creation_still_ends_in_failed() {
    let services = Arc::new(FakeServices {
        stall_creates: true,
        ..FakeServices::default()
    }
    .with_gist("stuck", None, &[("a.txt", "A")]));

    let started = tokio::time::Instant::now();
    let (result, states) = run(&services, request(Direction::GistToSnippet, "stuck")).await;

    match result.unwrap_err() {
        MigrationError::TimedOut { after_secs, created } => {
            assert_eq!(after_secs, 30);
            assert!(created.is_empty());
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(started.elapsed() <= Duration::from_secs(30) + CANCEL_GRACE);
    assert_eq!(
        &states[states.len() - 3..],
        &[MigrationState::TimedOut, MigrationState::Finalizing, MigrationState::Failed]
    );
}
