//! In-memory issue tracker with call accounting and failure injection.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::IssueError;
use crate::ports::issues::{Issue, IssueEdit, IssueFuture, IssueState, IssueTracker, RepoRef};

/// Tracker operation, used to count calls and target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerMethod {
    /// `list_issues`
    List,
    /// `get_issue`
    Get,
    /// `create_issue`
    Create,
    /// `edit_issue`
    Edit,
}

#[derive(Default)]
struct TrackerState {
    repos: BTreeMap<String, Vec<Issue>>,
    next_number: u64,
    calls: HashMap<TrackerMethod, usize>,
    failures: HashMap<TrackerMethod, VecDeque<IssueError>>,
    edits: Vec<(u64, IssueEdit)>,
}

impl TrackerState {
    /// Counts the call and pops a queued failure for it, if any.
    fn enter(&mut self, method: TrackerMethod) -> Result<(), IssueError> {
        *self.calls.entry(method).or_default() += 1;
        match self.failures.get_mut(&method).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn issue_mut(&mut self, repo: &RepoRef, number: u64) -> Result<&mut Issue, IssueError> {
        self.repos
            .get_mut(&repo.to_string())
            .and_then(|issues| issues.iter_mut().find(|i| i.number == number))
            .ok_or_else(|| IssueError::not_found(repo.to_string(), format!("#{number}")))
    }
}

/// Issue tracker held entirely in memory.
///
/// Issues are listed in creation order. Numbers are assigned per tracker,
/// starting at 1, so they are unique across all repositories it holds.
#[derive(Default)]
pub struct MemoryIssueTracker {
    state: Mutex<TrackerState>,
}

impl MemoryIssueTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an issue directly, bypassing call accounting.
    pub fn seed(&self, repo: &RepoRef, title: &str, body: &str, state: IssueState) -> Issue {
        let mut inner = self.lock();
        inner.next_number += 1;
        let issue = Issue {
            number: inner.next_number,
            title: title.to_string(),
            body: body.to_string(),
            state,
            is_pull_request: false,
        };
        inner.repos.entry(repo.to_string()).or_default().push(issue.clone());
        issue
    }

    /// Marks an existing issue as linked to a pull request.
    pub fn link_pull_request(&self, repo: &RepoRef, number: u64) {
        if let Ok(issue) = self.lock().issue_mut(repo, number) {
            issue.is_pull_request = true;
        }
    }

    /// Deletes an issue outright, as a repository admin can on GitHub.
    pub fn remove(&self, repo: &RepoRef, number: u64) {
        if let Some(issues) = self.lock().repos.get_mut(&repo.to_string()) {
            issues.retain(|i| i.number != number);
        }
    }

    /// Snapshot of the issues in a repository.
    #[must_use]
    pub fn issues(&self, repo: &RepoRef) -> Vec<Issue> {
        self.lock().repos.get(&repo.to_string()).cloned().unwrap_or_default()
    }

    /// Number of calls made to `method` so far.
    #[must_use]
    pub fn calls(&self, method: TrackerMethod) -> usize {
        self.lock().calls.get(&method).copied().unwrap_or(0)
    }

    /// Number of mutating calls (create and edit) made so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.calls(TrackerMethod::Create) + self.calls(TrackerMethod::Edit)
    }

    /// Every edit applied, in order, with the issue number it targeted.
    #[must_use]
    pub fn edits(&self) -> Vec<(u64, IssueEdit)> {
        self.lock().edits.clone()
    }

    /// Makes the next call to `method` fail with `error`. Queued failures
    /// are consumed one per call.
    pub fn fail_next(&self, method: TrackerMethod, error: IssueError) {
        self.lock().failures.entry(method).or_default().push_back(error);
    }
}

impl IssueTracker for MemoryIssueTracker {
    fn list_issues<'a>(&'a self, repo: &'a RepoRef) -> IssueFuture<'a, Vec<Issue>> {
        Box::pin(async move {
            let mut inner = self.lock();
            inner.enter(TrackerMethod::List)?;
            Ok(inner.repos.get(&repo.to_string()).cloned().unwrap_or_default())
        })
    }

    fn get_issue<'a>(&'a self, repo: &'a RepoRef, number: u64) -> IssueFuture<'a, Issue> {
        Box::pin(async move {
            let mut inner = self.lock();
            inner.enter(TrackerMethod::Get)?;
            inner.issue_mut(repo, number).map(|issue| issue.clone())
        })
    }

    fn create_issue<'a>(
        &'a self,
        repo: &'a RepoRef,
        title: &'a str,
        body: &'a str,
    ) -> IssueFuture<'a, Issue> {
        Box::pin(async move {
            self.lock().enter(TrackerMethod::Create)?;
            Ok(self.seed(repo, title, body, IssueState::Open))
        })
    }

    fn edit_issue<'a>(
        &'a self,
        repo: &'a RepoRef,
        number: u64,
        edit: &'a IssueEdit,
    ) -> IssueFuture<'a, Issue> {
        Box::pin(async move {
            let mut inner = self.lock();
            inner.enter(TrackerMethod::Edit)?;
            inner.edits.push((number, edit.clone()));
            let issue = inner.issue_mut(repo, number)?;
            if let Some(title) = &edit.title {
                issue.title.clone_from(title);
            }
            if let Some(body) = &edit.body {
                issue.body.clone_from(body);
            }
            if let Some(state) = edit.state {
                issue.state = state;
            }
            Ok(issue.clone())
        })
    }
}
