//! Lifecycle guard: close the remote issue before a record may be purged.

use tracing::{info, warn};

use super::reconciler::{Outcome, Reconciler};
use crate::error::ReconcileError;
use crate::github::IssueClient;
use crate::model::GithubIssuer;

/// Finalizer the controller places on every record it manages.
pub const FINALIZER: &str = "github.benda.io/finalizer";

impl Reconciler<'_> {
    /// Runs the deletion protocol for a record whose deletion was requested.
    ///
    /// The finalizer is released only after the remote issue is confirmed
    /// closed, or confirmed never to have existed: no issue carries the
    /// title, or the repo cannot be parsed and no issue number was ever
    /// recorded. Any other failure keeps the finalizer so the next pass
    /// repeats the protocol.
    pub(super) async fn finalize(
        &self,
        mut record: GithubIssuer,
    ) -> Result<Outcome, ReconcileError> {
        if !record.has_finalizer(FINALIZER) {
            return Ok(Outcome::Skipped);
        }

        let spec = &record.spec;
        match IssueClient::for_repo(self.tracker, &spec.repo) {
            Ok(client) => {
                match client.with_known_number(record.status.issue_number).close(&spec.title).await
                {
                    Ok(issue) => info!(repo = %spec.repo, number = issue.number, "issue closed"),
                    Err(e) if e.is_not_found() => {
                        info!(repo = %spec.repo, title = %spec.title, "no issue to close");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => match record.status.issue_number {
                Some(number) => {
                    warn!(error = %e, number, "repo is malformed but issue exists; finalizer kept");
                    return Err(e.into());
                }
                None => warn!(error = %e, "repo is malformed; no issue can exist"),
            },
        }

        record.remove_finalizer(FINALIZER);
        self.store.update(&record).await?;
        info!("finalizer released");
        Ok(Outcome::Released)
    }
}
