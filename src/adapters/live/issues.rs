//! Live adapter for the `IssueTracker` port using the GitHub REST API.

use std::time::Duration;

use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::IssueError;
use crate::ports::issues::{Issue, IssueEdit, IssueFuture, IssueState, IssueTracker, RepoRef};

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const MEDIA_TYPE: &str = "application/vnd.github+json";
const PAGE_SIZE: usize = 100;

/// Live tracker that talks to GitHub (or a GitHub Enterprise API root).
pub struct GithubIssueTracker {
    client: Client,
    api_url: String,
    token: String,
}

impl GithubIssueTracker {
    /// Creates a tracker authenticating with a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`IssueError::Permanent`] if the HTTP client cannot be built.
    pub fn new(
        api_url: &str,
        token: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, IssueError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| IssueError::permanent(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, api_url: api_url.trim_end_matches('/').to_string(), token: token.into() })
    }

    fn issues_url(&self, repo: &RepoRef) -> String {
        format!("{}/repos/{}/{}/issues", self.api_url, repo.owner, repo.name)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, MEDIA_TYPE)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(USER_AGENT, concat!("github-issuer/", env!("CARGO_PKG_VERSION")))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, IssueError> {
        self.authorized(request)
            .send()
            .await
            .map_err(|e| IssueError::transient(format!("GitHub request failed: {e}")))
    }
}

/// Issue payload as returned by the GitHub API.
#[derive(Deserialize)]
struct GithubIssue {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    state: String,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

impl From<GithubIssue> for Issue {
    fn from(raw: GithubIssue) -> Self {
        Self {
            number: raw.number,
            title: raw.title,
            body: raw.body.unwrap_or_default(),
            state: if raw.state == "closed" { IssueState::Closed } else { IssueState::Open },
            is_pull_request: raw.pull_request.is_some(),
        }
    }
}

/// Request body for issue creation.
#[derive(Serialize)]
struct CreateIssueRequest<'a> {
    title: &'a str,
    body: &'a str,
}

/// Error body returned by the GitHub API.
#[derive(Deserialize)]
struct GithubErrorBody {
    message: String,
}

/// What a 404 means for the call that received it.
#[derive(Clone, Copy)]
enum Missing<'a> {
    /// The repository itself is unreachable; not a lookup miss.
    Repo,
    /// A specific issue number is absent.
    Issue(u64, &'a RepoRef),
}

/// Reads the retry hint from `retry-after` or the rate-limit reset header.
fn retry_hint(headers: &HeaderMap) -> Option<Duration> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    if let Some(secs) = header("retry-after").and_then(|v| v.trim().parse::<u64>().ok()) {
        return Some(Duration::from_secs(secs));
    }
    if header("x-ratelimit-remaining") == Some("0") {
        let reset = header("x-ratelimit-reset").and_then(|v| v.trim().parse::<i64>().ok())?;
        let wait = reset.saturating_sub(chrono::Utc::now().timestamp()).max(1);
        return u64::try_from(wait).ok().map(Duration::from_secs);
    }
    None
}

/// Maps a non-success response onto the error taxonomy.
async fn classify(response: Response, missing: Missing<'_>) -> IssueError {
    let status = response.status();
    let hint = retry_hint(response.headers());
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GithubErrorBody>(&text).map(|b| b.message).unwrap_or(text);
    classify_status(status, hint, &message, missing)
}

/// GitHub answers 410 for an issue that was deleted, so both 404 and 410
/// on a single issue mean it no longer exists.
fn classify_status(
    status: StatusCode,
    hint: Option<Duration>,
    message: &str,
    missing: Missing<'_>,
) -> IssueError {
    let reason = format!("GitHub API error ({}): {message}", status.as_u16());
    match (status, missing) {
        (StatusCode::NOT_FOUND | StatusCode::GONE, Missing::Issue(number, repo)) => {
            IssueError::not_found(repo.to_string(), format!("#{number}"))
        }
        (StatusCode::TOO_MANY_REQUESTS, _) => IssueError::Transient { reason, retry_after: hint },
        (StatusCode::FORBIDDEN, _) if hint.is_some() => {
            IssueError::Transient { reason, retry_after: hint }
        }
        (s, _) if s.is_server_error() => IssueError::Transient { reason, retry_after: hint },
        _ => IssueError::permanent(reason),
    }
}

async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, IssueError> {
    response
        .json::<T>()
        .await
        .map_err(|e| IssueError::transient(format!("failed to decode GitHub response: {e}")))
}

impl IssueTracker for GithubIssueTracker {
    fn list_issues<'a>(&'a self, repo: &'a RepoRef) -> IssueFuture<'a, Vec<Issue>> {
        Box::pin(async move {
            let url = self.issues_url(repo);
            let mut issues = Vec::new();
            let mut page = 1_u32;
            loop {
                let request = self.client.get(&url).query(&[
                    ("state", "all".to_string()),
                    ("per_page", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                ]);
                let response = self.send(request).await?;
                if !response.status().is_success() {
                    return Err(classify(response, Missing::Repo).await);
                }
                let batch: Vec<GithubIssue> = decode(response).await?;
                let count = batch.len();
                issues.extend(batch.into_iter().map(Issue::from));
                if count < PAGE_SIZE {
                    break;
                }
                page = page.saturating_add(1);
            }
            debug!(repo = %repo, count = issues.len(), "listed issues");
            Ok(issues)
        })
    }

    fn get_issue<'a>(&'a self, repo: &'a RepoRef, number: u64) -> IssueFuture<'a, Issue> {
        Box::pin(async move {
            let url = format!("{}/{number}", self.issues_url(repo));
            let response = self.send(self.client.get(&url)).await?;
            if !response.status().is_success() {
                return Err(classify(response, Missing::Issue(number, repo)).await);
            }
            decode::<GithubIssue>(response).await.map(Issue::from)
        })
    }

    fn create_issue<'a>(
        &'a self,
        repo: &'a RepoRef,
        title: &'a str,
        body: &'a str,
    ) -> IssueFuture<'a, Issue> {
        Box::pin(async move {
            let request =
                self.client.post(self.issues_url(repo)).json(&CreateIssueRequest { title, body });
            let response = self.send(request).await?;
            if !response.status().is_success() {
                return Err(classify(response, Missing::Repo).await);
            }
            decode::<GithubIssue>(response).await.map(Issue::from)
        })
    }

    fn edit_issue<'a>(
        &'a self,
        repo: &'a RepoRef,
        number: u64,
        edit: &'a IssueEdit,
    ) -> IssueFuture<'a, Issue> {
        Box::pin(async move {
            let url = format!("{}/{number}", self.issues_url(repo));
            let response = self.send(self.client.patch(&url).json(edit)).await?;
            if !response.status().is_success() {
                return Err(classify(response, Missing::Issue(number, repo)).await);
            }
            decode::<GithubIssue>(response).await.map(Issue::from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn converts_closed_pull_request_payload() {
        let raw: GithubIssue = serde_json::from_value(serde_json::json!({
            "number": 12,
            "title": "Add widget",
            "body": null,
            "state": "closed",
            "pull_request": { "url": "https://api.github.com/repos/o/r/pulls/12" }
        }))
        .unwrap();
        let issue = Issue::from(raw);
        assert_eq!(issue.number, 12);
        assert_eq!(issue.body, "");
        assert_eq!(issue.state, IssueState::Closed);
        assert!(issue.is_pull_request);
    }

    #[test]
    fn plain_issue_has_no_pull_request_link() {
        let raw: GithubIssue = serde_json::from_value(serde_json::json!({
            "number": 3,
            "title": "Bug",
            "body": "steps",
            "state": "open"
        }))
        .unwrap();
        let issue = Issue::from(raw);
        assert!(issue.is_open());
        assert!(!issue.is_pull_request);
    }

    #[test]
    fn retry_after_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("30"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        assert_eq!(retry_hint(&headers), Some(Duration::from_secs(30)));
    }

    #[test]
    fn exhausted_rate_limit_waits_until_reset() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        let reset = (chrono::Utc::now().timestamp() + 120).to_string();
        headers.insert("x-ratelimit-reset", HeaderValue::from_str(&reset).unwrap());
        let hint = retry_hint(&headers).unwrap();
        assert!(hint >= Duration::from_secs(100) && hint <= Duration::from_secs(120));
    }

    #[test]
    fn no_hint_without_rate_limit_headers() {
        assert_eq!(retry_hint(&HeaderMap::new()), None);
    }

    #[test]
    fn deleted_issue_reads_as_not_found() {
        let repo = RepoRef { owner: "o".into(), name: "r".into() };
        for status in [StatusCode::NOT_FOUND, StatusCode::GONE] {
            let missing = Missing::Issue(1, &repo);
            let err = classify_status(status, None, "This issue was deleted", missing);
            assert!(err.is_not_found(), "{status}: {err}");
        }
    }

    #[test]
    fn missing_repo_is_permanent() {
        for status in [StatusCode::NOT_FOUND, StatusCode::GONE, StatusCode::UNAUTHORIZED] {
            let err = classify_status(status, None, "Not Found", Missing::Repo);
            assert!(matches!(err, IssueError::Permanent { .. }), "{status}: {err}");
        }
    }

    #[test]
    fn throttling_and_server_errors_are_transient() {
        let hint = Some(Duration::from_secs(9));
        let throttled = classify_status(StatusCode::FORBIDDEN, hint, "rate limit", Missing::Repo);
        assert_eq!(throttled.retry_after(), hint);
        let plain_forbidden = classify_status(StatusCode::FORBIDDEN, None, "no", Missing::Repo);
        assert!(matches!(plain_forbidden, IssueError::Permanent { .. }));
        let bad_gateway = classify_status(StatusCode::BAD_GATEWAY, None, "", Missing::Repo);
        assert!(matches!(bad_gateway, IssueError::Transient { .. }));
    }

    #[test]
    fn edit_serializes_only_set_fields() {
        let edit = IssueEdit { state: Some(IssueState::Closed), ..IssueEdit::default() };
        assert_eq!(serde_json::to_value(&edit).unwrap(), serde_json::json!({ "state": "closed" }));
    }

    #[test]
    fn trims_trailing_slash_from_api_url() {
        let tracker =
            GithubIssueTracker::new("https://ghe.example.com/api/v3/", "t", Duration::from_secs(5))
                .unwrap();
        let repo = RepoRef { owner: "o".into(), name: "r".into() };
        assert_eq!(tracker.issues_url(&repo), "https://ghe.example.com/api/v3/repos/o/r/issues");
    }
}
