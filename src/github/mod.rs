//! Remote Issue Client: title-keyed issue operations for one repository.
//!
//! Sits on top of the transport-level [`IssueTracker`] port and adds the
//! lookup and diff rules the reconciler relies on. It never retries; every
//! failure is handed back to the caller.

use tracing::debug;

use crate::error::IssueError;
use crate::ports::issues::{Issue, IssueEdit, IssueState, IssueTracker, RepoRef};

/// Issue operations bound to a single repository.
pub struct IssueClient<'a> {
    tracker: &'a dyn IssueTracker,
    repo: RepoRef,
    known_number: Option<u64>,
}

impl<'a> IssueClient<'a> {
    /// Binds a client to the repository named by `repo`.
    ///
    /// # Errors
    ///
    /// Returns [`IssueError::Permanent`] if `repo` does not name an owner and a repository.
    pub fn for_repo(tracker: &'a dyn IssueTracker, repo: &str) -> Result<Self, IssueError> {
        Ok(Self { tracker, repo: RepoRef::parse(repo)?, known_number: None })
    }

    /// Supplies an issue number learned on an earlier pass. Lookups try it
    /// first and fall back to a title search.
    #[must_use]
    pub fn with_known_number(mut self, number: Option<u64>) -> Self {
        self.known_number = number;
        self
    }

    /// The repository this client targets.
    #[must_use]
    pub const fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// Finds the issue whose title equals `title` exactly.
    ///
    /// # Errors
    ///
    /// Returns [`IssueError::NotFound`] when no issue carries that title, or
    /// whatever the tracker reports for the underlying calls.
    pub async fn fetch(&self, title: &str) -> Result<Issue, IssueError> {
        if let Some(number) = self.known_number {
            match self.tracker.get_issue(&self.repo, number).await {
                Ok(issue) if issue.title == title => return Ok(issue),
                Ok(issue) => {
                    debug!(repo = %self.repo, number, found = %issue.title, "known issue was retitled");
                }
                Err(e) if e.is_not_found() => {
                    debug!(repo = %self.repo, number, "known issue is gone");
                }
                Err(e) => return Err(e),
            }
        }
        self.tracker
            .list_issues(&self.repo)
            .await?
            .into_iter()
            .find(|issue| issue.title == title)
            .ok_or_else(|| IssueError::not_found(self.repo.to_string(), title))
    }

    /// Opens a new issue. The caller must already know none exists.
    ///
    /// # Errors
    ///
    /// Returns the tracker's error if creation fails.
    pub async fn create(&self, title: &str, body: &str) -> Result<Issue, IssueError> {
        let issue = self.tracker.create_issue(&self.repo, title, body).await?;
        debug!(repo = %self.repo, number = issue.number, "created issue");
        Ok(issue)
    }

    /// Brings the body of the issue titled `title` in line with `body`.
    ///
    /// Edits only when the bodies differ byte for byte. Returns the issue as
    /// it stands afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`IssueError::NotFound`] if the issue vanished, or the
    /// tracker's error if the edit fails.
    pub async fn update(&self, title: &str, body: &str) -> Result<Issue, IssueError> {
        let issue = self.fetch(title).await?;
        if issue.body == body {
            return Ok(issue);
        }
        let edit = IssueEdit { body: Some(body.to_string()), ..IssueEdit::default() };
        let edited = self.tracker.edit_issue(&self.repo, issue.number, &edit).await?;
        debug!(repo = %self.repo, number = edited.number, "updated issue body");
        Ok(edited)
    }

    /// Closes the issue titled `title`, keeping its title and body.
    ///
    /// An issue that is already closed is returned untouched.
    ///
    /// # Errors
    ///
    /// Returns [`IssueError::NotFound`] if no such issue exists, or the
    /// tracker's error if the edit fails.
    pub async fn close(&self, title: &str) -> Result<Issue, IssueError> {
        let issue = self.fetch(title).await?;
        if !issue.is_open() {
            return Ok(issue);
        }
        let edit = IssueEdit {
            title: Some(issue.title.clone()),
            body: Some(issue.body.clone()),
            state: Some(IssueState::Closed),
        };
        let closed = self.tracker.edit_issue(&self.repo, issue.number, &edit).await?;
        debug!(repo = %self.repo, number = closed.number, "closed issue");
        Ok(closed)
    }
}
