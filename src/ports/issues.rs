//! Issue tracker port: transport-level operations against a repository.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::IssueError;

/// Boxed future returned by [`IssueTracker`] methods; keeps the trait dyn-compatible.
pub type IssueFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, IssueError>> + Send + 'a>>;

/// Repository coordinates on the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    /// Owning user or organisation.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoRef {
    /// Derives `(owner, name)` from the last two non-empty `/` segments.
    ///
    /// Accepts both `owner/repo` and `https://github.com/owner/repo` forms.
    /// A trailing `.git` on the name is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`IssueError::Permanent`] when fewer than two segments remain.
    pub fn parse(raw: &str) -> Result<Self, IssueError> {
        let segments: Vec<&str> =
            raw.trim().split('/').map(str::trim).filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [.., owner, name] => {
                let name = name.strip_suffix(".git").unwrap_or(*name);
                if name.is_empty() {
                    return Err(IssueError::permanent(format!(
                        "malformed repo '{raw}', expected owner/name"
                    )));
                }
                Ok(Self { owner: (*owner).to_string(), name: name.to_string() })
            }
            _ => Err(IssueError::permanent(format!("malformed repo '{raw}', expected owner/name"))),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Open/closed state of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    /// Issue is open.
    Open,
    /// Issue is closed.
    Closed,
}

/// An issue as observed on the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Remote-assigned number, unique per repository.
    pub number: u64,
    /// The issue title.
    pub title: String,
    /// The issue body; empty when the tracker reports none.
    pub body: String,
    /// Current state.
    pub state: IssueState,
    /// Whether the tracker links this issue to a pull request.
    pub is_pull_request: bool,
}

impl Issue {
    /// Whether the issue is not closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state != IssueState::Closed
    }
}

/// Fields to change on an existing issue. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEdit {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// New state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<IssueState>,
}

/// Transport-level access to a remote issue tracker.
///
/// No business rules live here: lookups by title, diffing, and idempotence
/// are layered on top by [`crate::github::IssueClient`].
pub trait IssueTracker: Send + Sync {
    /// Lists open and closed issues of a repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be listed.
    fn list_issues<'a>(&'a self, repo: &'a RepoRef) -> IssueFuture<'a, Vec<Issue>>;

    /// Fetches a single issue by number.
    ///
    /// # Errors
    ///
    /// Returns [`IssueError::NotFound`] if no such issue exists.
    fn get_issue<'a>(&'a self, repo: &'a RepoRef, number: u64) -> IssueFuture<'a, Issue>;

    /// Creates a new issue and returns it with its assigned number.
    ///
    /// # Errors
    ///
    /// Returns an error if the issue cannot be created.
    fn create_issue<'a>(
        &'a self,
        repo: &'a RepoRef,
        title: &'a str,
        body: &'a str,
    ) -> IssueFuture<'a, Issue>;

    /// Applies an edit to an existing issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the issue cannot be found or edited.
    fn edit_issue<'a>(
        &'a self,
        repo: &'a RepoRef,
        number: u64,
        edit: &'a IssueEdit,
    ) -> IssueFuture<'a, Issue>;
}

/// Lets a tracker be shared between a context and the code inspecting it.
impl<T: IssueTracker + ?Sized> IssueTracker for std::sync::Arc<T> {
    fn list_issues<'a>(&'a self, repo: &'a RepoRef) -> IssueFuture<'a, Vec<Issue>> {
        (**self).list_issues(repo)
    }

    fn get_issue<'a>(&'a self, repo: &'a RepoRef, number: u64) -> IssueFuture<'a, Issue> {
        (**self).get_issue(repo, number)
    }

    fn create_issue<'a>(
        &'a self,
        repo: &'a RepoRef,
        title: &'a str,
        body: &'a str,
    ) -> IssueFuture<'a, Issue> {
        (**self).create_issue(repo, title, body)
    }

    fn edit_issue<'a>(
        &'a self,
        repo: &'a RepoRef,
        number: u64,
        edit: &'a IssueEdit,
    ) -> IssueFuture<'a, Issue> {
        (**self).edit_issue(repo, number, edit)
    }
}
