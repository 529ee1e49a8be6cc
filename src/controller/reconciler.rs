//! Reconciler core: one pass of the create/update state machine.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use super::finalizer::FINALIZER;
use crate::context::ServiceContext;
use crate::error::{IssueError, ReconcileError};
use crate::github::IssueClient;
use crate::model::condition::{HAS_PR, ISSUE_CREATED, ISSUE_UPDATED, IS_OPEN};
use crate::model::{set_condition, Condition, GithubIssuer, ResourceKey};
use crate::ports::clock::Clock;
use crate::ports::issues::{Issue, IssueTracker};
use crate::ports::store::RecordStore;

/// What a successful pass did.
///
/// Failures come back as [`ReconcileError`]; the runner turns those into a
/// delayed retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The record no longer exists.
    Gone,
    /// A new remote issue was opened.
    Created {
        /// Remote issue number.
        number: u64,
    },
    /// The remote issue was found and its body now matches the spec.
    Synced {
        /// Remote issue number.
        number: u64,
        /// Whether an edit was needed.
        edited: bool,
    },
    /// Deletion finished: the finalizer was released.
    Released,
    /// Deletion is pending on finalizers this controller does not own.
    Skipped,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gone => f.write_str("record is gone"),
            Self::Created { number } => write!(f, "created issue #{number}"),
            Self::Synced { number, edited: true } => write!(f, "updated issue #{number}"),
            Self::Synced { number, edited: false } => write!(f, "issue #{number} is in sync"),
            Self::Released => f.write_str("issue closed and finalizer released"),
            Self::Skipped => f.write_str("deletion pending on other finalizers"),
        }
    }
}

/// Drives a single record toward its desired state.
///
/// Holds no state of its own between passes; everything it knows comes from
/// the store and the tracker on each call.
pub struct Reconciler<'a> {
    pub(super) store: &'a dyn RecordStore,
    pub(super) tracker: &'a dyn IssueTracker,
    clock: &'a dyn Clock,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler over the given ports.
    #[must_use]
    pub fn new(
        store: &'a dyn RecordStore,
        tracker: &'a dyn IssueTracker,
        clock: &'a dyn Clock,
    ) -> Self {
        Self { store, tracker, clock }
    }

    /// Creates a reconciler over the ports of a service context.
    #[must_use]
    pub fn from_context(ctx: &'a ServiceContext) -> Self {
        Self::new(ctx.store.as_ref(), ctx.issues.as_ref(), ctx.clock.as_ref())
    }

    /// Runs one pass for `key`.
    ///
    /// # Errors
    ///
    /// Returns the first remote or store failure of the pass. A status write
    /// failure is returned only when the remote side effect succeeded.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn reconcile(&self, key: &ResourceKey) -> Result<Outcome, ReconcileError> {
        let Some(mut record) = self.store.get(key).await? else {
            debug!("record not found");
            return Ok(Outcome::Gone);
        };

        if record.is_deleting() {
            return self.finalize(record).await;
        }

        if record.add_finalizer(FINALIZER) {
            match self.store.update(&record).await? {
                Some(stored) => record = stored,
                None => return Ok(Outcome::Gone),
            }
            debug!("finalizer added");
        }

        let before = record.status.clone();
        let result = self.sync(&mut record).await;
        record.status.observed_generation = Some(record.metadata.generation);

        if record.status != before {
            if let Err(e) = self.store.update_status(&record).await {
                return match result {
                    Ok(_) => Err(ReconcileError::StatusWrite(e)),
                    Err(remote) => {
                        error!(error = %e, "status write failed");
                        Err(remote.into())
                    }
                };
            }
        }

        match &result {
            Ok(outcome) => info!(%outcome, "reconciled"),
            Err(e) => warn!(error = %e, "reconcile failed"),
        }
        result.map_err(ReconcileError::from)
    }

    /// Diffs the spec against the tracker and applies at most one mutation.
    ///
    /// Conditions are recorded on `record` for every create or update
    /// attempt; a failed lookup leaves them untouched.
    async fn sync(&self, record: &mut GithubIssuer) -> Result<Outcome, IssueError> {
        let spec = record.spec.clone();
        let client = IssueClient::for_repo(self.tracker, &spec.repo)?
            .with_known_number(record.status.issue_number);

        let found = match client.fetch(&spec.title).await {
            Ok(issue) => issue,
            Err(e) if e.is_not_found() => {
                let created = client.create(&spec.title, &spec.description).await;
                let now = self.clock.now();
                let condition = match &created {
                    Ok(_) => {
                        Condition::new(ISSUE_CREATED, true, "IssueCreated", "Issue was created", now)
                    }
                    Err(e) => {
                        Condition::new(ISSUE_CREATED, false, "IssueNotCreated", e.to_string(), now)
                    }
                };
                set_condition(&mut record.status.conditions, condition);
                let issue = created?;
                record.status.issue_number = Some(issue.number);
                return Ok(Outcome::Created { number: issue.number });
            }
            Err(e) => return Err(e),
        };

        record.status.issue_number = Some(found.number);
        let edited = found.body != spec.description;
        let client = client.with_known_number(Some(found.number));
        let updated = client.update(&spec.title, &spec.description).await;
        let now = self.clock.now();
        let conditions = &mut record.status.conditions;
        match updated {
            Ok(issue) => {
                let message = if edited { "Issue was updated" } else { "Issue is up to date" };
                set_condition(
                    conditions,
                    Condition::new(ISSUE_UPDATED, true, "IssueUpdated", message, now),
                );
                observe(conditions, &issue, now);
                Ok(Outcome::Synced { number: issue.number, edited })
            }
            Err(e) => {
                let message = e.to_string();
                set_condition(
                    conditions,
                    Condition::new(ISSUE_UPDATED, false, "IssueNotUpdated", message, now),
                );
                Err(e)
            }
        }
    }
}

/// Records the derived `hasPR` and `isOpen` conditions for an observed issue.
fn observe(conditions: &mut Vec<Condition>, issue: &Issue, now: DateTime<Utc>) {
    let (reason, message) = if issue.is_pull_request {
        ("PullRequestLinked", "Issue is linked to a pull request")
    } else {
        ("NoPullRequest", "Issue has no linked pull request")
    };
    set_condition(conditions, Condition::new(HAS_PR, issue.is_pull_request, reason, message, now));

    let (reason, message) = if issue.is_open() {
        ("IssueOpen", "Issue is open")
    } else {
        ("IssueClosed", "Issue is closed")
    };
    set_condition(conditions, Condition::new(IS_OPEN, issue.is_open(), reason, message, now));
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::test_support::Harness;
    use super::*;
    use crate::adapters::memory::TrackerMethod;
    use crate::error::StoreError;
    use crate::model::find_condition;
    use crate::model::ConditionStatus;
    use crate::ports::issues::IssueState;
    use crate::ports::store::{RecordRef, StoreFuture};
    use crate::store::FileRecordStore;
    use chrono::Duration as ChronoDuration;

    /// Delegates to a file store but rejects the next `failing` status writes.
    struct StatusWriteFails<'a> {
        inner: &'a FileRecordStore,
        failing: AtomicUsize,
    }

    impl<'a> StatusWriteFails<'a> {
        fn new(inner: &'a FileRecordStore, failing: usize) -> Self {
            Self { inner, failing: AtomicUsize::new(failing) }
        }
    }

    impl RecordStore for StatusWriteFails<'_> {
        fn get<'a>(&'a self, key: &'a ResourceKey) -> StoreFuture<'a, Option<GithubIssuer>> {
            self.inner.get(key)
        }

        fn list(&self) -> StoreFuture<'_, Vec<RecordRef>> {
            self.inner.list()
        }

        fn update<'a>(&'a self, record: &'a GithubIssuer) -> StoreFuture<'a, Option<GithubIssuer>> {
            self.inner.update(record)
        }

        fn update_status<'a>(&'a self, record: &'a GithubIssuer) -> StoreFuture<'a, GithubIssuer> {
            let armed =
                self.failing.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            if armed.is_ok() {
                return Box::pin(async { Err(StoreError::io("disk full")) });
            }
            self.inner.update_status(record)
        }

        fn apply<'a>(&'a self, record: &'a GithubIssuer) -> StoreFuture<'a, GithubIssuer> {
            self.inner.apply(record)
        }

        fn delete<'a>(&'a self, key: &'a ResourceKey) -> StoreFuture<'a, ()> {
            self.inner.delete(key)
        }
    }

    fn status_of(record: &GithubIssuer, condition_type: &str) -> Option<ConditionStatus> {
        find_condition(&record.status.conditions, condition_type).map(|c| c.status)
    }

    #[tokio::test]
    async fn creates_issue_when_absent() {
        let h = Harness::new();
        let key = h.apply("o/r", "t", "d").await;

        let outcome = h.reconciler().reconcile(&key).await.unwrap();
        assert_eq!(outcome, Outcome::Created { number: 1 });
        assert_eq!(h.tracker.calls(TrackerMethod::Create), 1);
        let issues = h.tracker.issues(&h.repo());
        assert_eq!((issues[0].title.as_str(), issues[0].body.as_str()), ("t", "d"));

        let record = h.record(&key).await.unwrap();
        assert!(record.has_finalizer(FINALIZER));
        assert_eq!(status_of(&record, ISSUE_CREATED), Some(ConditionStatus::True));
        assert_eq!(record.status.issue_number, Some(1));
        assert_eq!(record.status.observed_generation, Some(1));
    }

    #[tokio::test]
    async fn second_pass_is_idempotent() {
        let h = Harness::new();
        let key = h.apply("o/r", "t", "d").await;
        h.reconciler().reconcile(&key).await.unwrap();
        let writes = h.tracker.writes();

        let outcome = h.reconciler().reconcile(&key).await.unwrap();
        assert_eq!(outcome, Outcome::Synced { number: 1, edited: false });
        assert_eq!(h.tracker.writes(), writes);
    }

    #[tokio::test]
    async fn drift_produces_exactly_one_edit() {
        let h = Harness::new();
        let key = h.apply("o/r", "t", "d").await;
        h.reconciler().reconcile(&key).await.unwrap();
        h.apply("o/r", "t", "d2").await;

        let outcome = h.reconciler().reconcile(&key).await.unwrap();
        assert_eq!(outcome, Outcome::Synced { number: 1, edited: true });
        let edits = h.tracker.edits();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].1.body.as_deref(), Some("d2"));

        let record = h.record(&key).await.unwrap();
        assert_eq!(status_of(&record, ISSUE_UPDATED), Some(ConditionStatus::True));
        assert_eq!(status_of(&record, IS_OPEN), Some(ConditionStatus::True));
        assert_eq!(status_of(&record, HAS_PR), Some(ConditionStatus::False));
        assert_eq!(record.status.observed_generation, Some(2));
    }

    #[tokio::test]
    async fn matching_issue_needs_no_edit() {
        let h = Harness::new();
        h.tracker.seed(&h.repo(), "t", "d", IssueState::Open);
        let key = h.apply("o/r", "t", "d").await;

        h.reconciler().reconcile(&key).await.unwrap();
        assert_eq!(h.tracker.writes(), 0);
        let record = h.record(&key).await.unwrap();
        assert_eq!(status_of(&record, ISSUE_UPDATED), Some(ConditionStatus::True));
        assert_eq!(status_of(&record, ISSUE_CREATED), None);
    }

    #[tokio::test]
    async fn failed_create_reports_false_and_surfaces_error() {
        let h = Harness::new();
        let key = h.apply("o/r", "t", "d").await;
        h.tracker.fail_next(TrackerMethod::Create, IssueError::transient("503"));

        let err = h.reconciler().reconcile(&key).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Issue(IssueError::Transient { .. })));
        assert_eq!(h.tracker.calls(TrackerMethod::Create), 1);
        let record = h.record(&key).await.unwrap();
        let condition = find_condition(&record.status.conditions, ISSUE_CREATED).unwrap();
        assert_eq!(condition.status, ConditionStatus::False);
        assert_eq!(condition.reason, "IssueNotCreated");
    }

    #[tokio::test]
    async fn failed_lookup_leaves_conditions_alone() {
        let h = Harness::new();
        let key = h.apply("o/r", "t", "d").await;
        h.reconciler().reconcile(&key).await.unwrap();
        let before = h.record(&key).await.unwrap().status.conditions;

        h.tracker.fail_next(TrackerMethod::Get, IssueError::transient("timeout"));
        assert!(h.reconciler().reconcile(&key).await.is_err());
        assert_eq!(h.record(&key).await.unwrap().status.conditions, before);
        assert_eq!(h.tracker.writes(), 1);
    }

    #[tokio::test]
    async fn failed_update_reports_false() {
        let h = Harness::new();
        let key = h.apply("o/r", "t", "d").await;
        h.reconciler().reconcile(&key).await.unwrap();
        h.apply("o/r", "t", "d2").await;
        h.tracker.fail_next(TrackerMethod::Edit, IssueError::permanent("422"));

        assert!(h.reconciler().reconcile(&key).await.is_err());
        let record = h.record(&key).await.unwrap();
        assert_eq!(status_of(&record, ISSUE_UPDATED), Some(ConditionStatus::False));
    }

    #[tokio::test]
    async fn conditions_upsert_and_keep_transition_time() {
        let h = Harness::new();
        let key = h.apply("o/r", "t", "d").await;
        h.reconciler().reconcile(&key).await.unwrap();
        h.reconciler().reconcile(&key).await.unwrap();
        let first = h.record(&key).await.unwrap();
        let stamped = find_condition(&first.status.conditions, IS_OPEN).unwrap().last_transition_time;

        h.clock.advance(ChronoDuration::minutes(5));
        h.apply("o/r", "t", "d2").await;
        h.reconciler().reconcile(&key).await.unwrap();
        h.reconciler().reconcile(&key).await.unwrap();

        let record = h.record(&key).await.unwrap();
        let mut types: Vec<&str> =
            record.status.conditions.iter().map(|c| c.condition_type.as_str()).collect();
        types.sort_unstable();
        assert_eq!(types, vec![ISSUE_CREATED, ISSUE_UPDATED, HAS_PR, IS_OPEN]);
        let open = find_condition(&record.status.conditions, IS_OPEN).unwrap();
        assert_eq!(open.last_transition_time, stamped);
    }

    #[tokio::test]
    async fn closed_remote_issue_is_reported_not_reopened() {
        let h = Harness::new();
        let key = h.apply("o/r", "t", "d").await;
        h.reconciler().reconcile(&key).await.unwrap();
        h.close_remote(1).await;

        h.reconciler().reconcile(&key).await.unwrap();
        let record = h.record(&key).await.unwrap();
        assert_eq!(status_of(&record, IS_OPEN), Some(ConditionStatus::False));
        assert_eq!(h.tracker.issues(&h.repo())[0].state, IssueState::Closed);
    }

    #[tokio::test]
    async fn linked_pull_request_sets_has_pr() {
        let h = Harness::new();
        let issue = h.tracker.seed(&h.repo(), "t", "d", IssueState::Open);
        h.tracker.link_pull_request(&h.repo(), issue.number);
        let key = h.apply("o/r", "t", "d").await;

        h.reconciler().reconcile(&key).await.unwrap();
        let record = h.record(&key).await.unwrap();
        assert_eq!(status_of(&record, HAS_PR), Some(ConditionStatus::True));
    }

    #[tokio::test]
    async fn known_number_skips_listing() {
        let h = Harness::new();
        let key = h.apply("o/r", "t", "d").await;
        h.reconciler().reconcile(&key).await.unwrap();
        let lists = h.tracker.calls(TrackerMethod::List);

        h.reconciler().reconcile(&key).await.unwrap();
        assert_eq!(h.tracker.calls(TrackerMethod::List), lists);
    }

    #[tokio::test]
    async fn unchanged_status_is_not_rewritten() {
        let h = Harness::new();
        let key = h.apply("o/r", "t", "d").await;
        h.reconciler().reconcile(&key).await.unwrap();
        h.reconciler().reconcile(&key).await.unwrap();
        let version = h.record(&key).await.unwrap().metadata.resource_version;

        h.reconciler().reconcile(&key).await.unwrap();
        assert_eq!(h.record(&key).await.unwrap().metadata.resource_version, version);
    }

    #[tokio::test]
    async fn missing_record_is_done() {
        let h = Harness::new();
        let outcome = h.reconciler().reconcile(&ResourceKey::new("default", "nope")).await.unwrap();
        assert_eq!(outcome, Outcome::Gone);
        assert_eq!(h.tracker.calls(TrackerMethod::List), 0);
    }

    #[tokio::test]
    async fn malformed_repo_surfaces_permanent_error() {
        let h = Harness::new();
        let key = h.apply("just-a-name", "t", "d").await;
        let err = h.reconciler().reconcile(&key).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Issue(IssueError::Permanent { .. })));
        assert!(h.record(&key).await.unwrap().status.conditions.is_empty());
    }

    #[tokio::test]
    async fn status_write_failure_after_create_is_reported_once() {
        let h = Harness::new();
        let key = h.apply("o/r", "t", "d").await;
        let store = StatusWriteFails::new(&h.store, 1);
        let reconciler = Reconciler::new(&store, &h.tracker, &h.clock);

        let err = reconciler.reconcile(&key).await.unwrap_err();
        assert!(matches!(err, ReconcileError::StatusWrite(StoreError::Io { .. })), "{err}");
        assert_eq!(h.tracker.calls(TrackerMethod::Create), 1);
        assert!(h.record(&key).await.unwrap().status.conditions.is_empty());

        // The lost status only costs a title lookup; the issue is not duplicated.
        let outcome = reconciler.reconcile(&key).await.unwrap();
        assert_eq!(outcome, Outcome::Synced { number: 1, edited: false });
        assert_eq!(h.tracker.calls(TrackerMethod::Create), 1);
        assert_eq!(h.tracker.calls(TrackerMethod::Edit), 0);
        assert_eq!(h.record(&key).await.unwrap().status.issue_number, Some(1));
    }

    #[tokio::test]
    async fn remote_failure_wins_over_status_write_failure() {
        let h = Harness::new();
        let key = h.apply("o/r", "t", "d").await;
        let store = StatusWriteFails::new(&h.store, 1);
        h.tracker.fail_next(TrackerMethod::Create, IssueError::transient("503"));

        let err = Reconciler::new(&store, &h.tracker, &h.clock).reconcile(&key).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Issue(IssueError::Transient { .. })), "{err}");
        assert_eq!(h.tracker.calls(TrackerMethod::Create), 1);
    }

    #[tokio::test]
    async fn deleted_remote_issue_is_created_again() {
        let h = Harness::new();
        let key = h.apply("o/r", "t", "d").await;
        h.reconciler().reconcile(&key).await.unwrap();
        h.tracker.remove(&h.repo(), 1);

        let outcome = h.reconciler().reconcile(&key).await.unwrap();
        assert_eq!(outcome, Outcome::Created { number: 2 });
        assert_eq!(h.record(&key).await.unwrap().status.issue_number, Some(2));
    }
}
