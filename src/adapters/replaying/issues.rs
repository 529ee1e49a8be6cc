//! Replaying adapter for the `IssueTracker` port.

use std::sync::{Arc, Mutex};

use super::replay_result;
use crate::adapters::recording::issues::{CreateInput, EditInput, GetInput, ListInput, PORT};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::issues::{Issue, IssueEdit, IssueFuture, IssueTracker, RepoRef};

/// Serves tracker outcomes from a cassette instead of the network.
pub struct ReplayingIssueTracker {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingIssueTracker {
    /// Creates a tracker backed by the given replayer.
    #[must_use]
    pub const fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }
}

impl IssueTracker for ReplayingIssueTracker {
    fn list_issues<'a>(&'a self, repo: &'a RepoRef) -> IssueFuture<'a, Vec<Issue>> {
        let result = replay_result(&self.replayer, PORT, "list_issues", &ListInput { repo });
        Box::pin(async move { result })
    }

    fn get_issue<'a>(&'a self, repo: &'a RepoRef, number: u64) -> IssueFuture<'a, Issue> {
        let result = replay_result(&self.replayer, PORT, "get_issue", &GetInput { repo, number });
        Box::pin(async move { result })
    }

    fn create_issue<'a>(
        &'a self,
        repo: &'a RepoRef,
        title: &'a str,
        body: &'a str,
    ) -> IssueFuture<'a, Issue> {
        let input = CreateInput { repo, title, body };
        let result = replay_result(&self.replayer, PORT, "create_issue", &input);
        Box::pin(async move { result })
    }

    fn edit_issue<'a>(
        &'a self,
        repo: &'a RepoRef,
        number: u64,
        edit: &'a IssueEdit,
    ) -> IssueFuture<'a, Issue> {
        let input = EditInput { repo, number, edit };
        let result = replay_result(&self.replayer, PORT, "edit_issue", &input);
        Box::pin(async move { result })
    }
}
