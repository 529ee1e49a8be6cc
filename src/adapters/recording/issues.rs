//! Recording adapter for the `IssueTracker` port.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::issues::{Issue, IssueEdit, IssueFuture, IssueTracker, RepoRef};

/// Port name under which tracker calls are recorded.
pub const PORT: &str = "issues";

/// Records tracker calls while delegating to an inner tracker.
pub struct RecordingIssueTracker {
    inner: Box<dyn IssueTracker>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingIssueTracker {
    /// Wraps `inner`, appending every call to `recorder`.
    pub fn new(inner: Box<dyn IssueTracker>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
pub(crate) struct ListInput<'a> {
    pub(crate) repo: &'a RepoRef,
}

#[derive(Serialize)]
pub(crate) struct GetInput<'a> {
    pub(crate) repo: &'a RepoRef,
    pub(crate) number: u64,
}

#[derive(Serialize)]
pub(crate) struct CreateInput<'a> {
    pub(crate) repo: &'a RepoRef,
    pub(crate) title: &'a str,
    pub(crate) body: &'a str,
}

#[derive(Serialize)]
pub(crate) struct EditInput<'a> {
    pub(crate) repo: &'a RepoRef,
    pub(crate) number: u64,
    pub(crate) edit: &'a IssueEdit,
}

impl IssueTracker for RecordingIssueTracker {
    fn list_issues<'a>(&'a self, repo: &'a RepoRef) -> IssueFuture<'a, Vec<Issue>> {
        Box::pin(async move {
            let result = self.inner.list_issues(repo).await;
            record_result(&self.recorder, PORT, "list_issues", &ListInput { repo }, &result);
            result
        })
    }

    fn get_issue<'a>(&'a self, repo: &'a RepoRef, number: u64) -> IssueFuture<'a, Issue> {
        Box::pin(async move {
            let result = self.inner.get_issue(repo, number).await;
            record_result(&self.recorder, PORT, "get_issue", &GetInput { repo, number }, &result);
            result
        })
    }

    fn create_issue<'a>(
        &'a self,
        repo: &'a RepoRef,
        title: &'a str,
        body: &'a str,
    ) -> IssueFuture<'a, Issue> {
        Box::pin(async move {
            let result = self.inner.create_issue(repo, title, body).await;
            let input = CreateInput { repo, title, body };
            record_result(&self.recorder, PORT, "create_issue", &input, &result);
            result
        })
    }

    fn edit_issue<'a>(
        &'a self,
        repo: &'a RepoRef,
        number: u64,
        edit: &'a IssueEdit,
    ) -> IssueFuture<'a, Issue> {
        Box::pin(async move {
            let result = self.inner.edit_issue(repo, number, edit).await;
            let input = EditInput { repo, number, edit };
            record_result(&self.recorder, PORT, "edit_issue", &input, &result);
            result
        })
    }
}
