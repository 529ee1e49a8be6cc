//! Service context bundling the port trait objects a command needs.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::adapters::live::{GithubIssueTracker, LiveFileSystem, SystemClock};
use crate::adapters::recording::RecordingIssueTracker;
use crate::adapters::replaying::ReplayingIssueTracker;
use crate::cassette::format::Cassette;
use crate::cassette::recorder::CassetteRecorder;
use crate::cassette::replayer::CassetteReplayer;
use crate::config::ControllerConfig;
use crate::error::IssueError;
use crate::ports::clock::Clock;
use crate::ports::issues::{Issue, IssueEdit, IssueFuture, IssueTracker, RepoRef};
use crate::ports::store::RecordStore;
use crate::store::FileRecordStore;

/// Bundles all port trait objects into a single context.
///
/// Constructors wire up different adapter sets (live, offline, recording,
/// replaying). When recording, the cassette is written on drop.
pub struct ServiceContext {
    /// Clock used to stamp condition transitions.
    pub clock: Box<dyn Clock>,
    /// Remote issue tracker.
    pub issues: Box<dyn IssueTracker>,
    /// Desired-state record store.
    pub store: Box<dyn RecordStore>,
    recorder: Option<Arc<Mutex<CassetteRecorder>>>,
}

impl ServiceContext {
    /// Assembles a context from explicit adapters.
    #[must_use]
    pub fn new(
        clock: Box<dyn Clock>,
        issues: Box<dyn IssueTracker>,
        store: Box<dyn RecordStore>,
    ) -> Self {
        Self { clock, issues, store, recorder: None }
    }

    fn file_store(config: &ControllerConfig) -> Box<dyn RecordStore> {
        Box::new(FileRecordStore::new(
            Box::new(LiveFileSystem),
            Box::new(SystemClock),
            &config.records_dir,
        ))
    }

    /// Creates a context for commands that only touch the record store.
    ///
    /// The tracker rejects every call with a permanent error.
    #[must_use]
    pub fn offline(config: &ControllerConfig) -> Self {
        Self::new(Box::new(SystemClock), Box::new(OfflineIssueTracker), Self::file_store(config))
    }

    /// Creates a live context talking to GitHub.
    ///
    /// When `config.record` is set, tracker traffic is also captured to that
    /// cassette.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is configured or the HTTP client cannot be built.
    pub fn live(config: &ControllerConfig) -> Result<Self, String> {
        let token = config.token().map_err(|e| e.to_string())?;
        let github =
            GithubIssueTracker::new(&config.github_api_url, token, config.request_timeout)
                .map_err(|e| e.to_string())?;
        let ctx = Self::new(Box::new(SystemClock), Box::new(github), Self::file_store(config));
        Ok(match &config.record {
            Some(path) => ctx.recording(path),
            None => ctx,
        })
    }

    /// Wraps this context's tracker so every call is recorded to `path`.
    #[must_use]
    pub fn recording(mut self, path: &Path) -> Self {
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(path, "github-issuer-session")));
        let inner = std::mem::replace(&mut self.issues, Box::new(OfflineIssueTracker));
        self.issues = Box::new(RecordingIssueTracker::new(inner, Arc::clone(&recorder)));
        self.recorder = Some(recorder);
        info!(cassette = %path.display(), "recording tracker traffic");
        self
    }

    /// Creates a context whose tracker replays a cassette, over the given store.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette cannot be read or parsed.
    pub fn replaying(cassette: &Path, store: Box<dyn RecordStore>) -> Result<Self, String> {
        let cassette = Cassette::load(cassette).map_err(|e| e.to_string())?;
        let replayer = Arc::new(Mutex::new(CassetteReplayer::new(&cassette)));
        Ok(Self::new(Box::new(SystemClock), Box::new(ReplayingIssueTracker::new(replayer)), store))
    }

    /// Writes the cassette now, if recording.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette cannot be written.
    pub fn flush_recording(&self) -> Result<(), String> {
        let Some(recorder) = &self.recorder else { return Ok(()) };
        let recorder = recorder.lock().unwrap_or_else(PoisonError::into_inner);
        let path = recorder.flush().map_err(|e| e.to_string())?;
        info!(cassette = %path.display(), interactions = recorder.len(), "cassette written");
        Ok(())
    }
}

impl Drop for ServiceContext {
    fn drop(&mut self) {
        if let Err(e) = self.flush_recording() {
            warn!(error = %e, "failed to write cassette");
        }
    }
}

/// Tracker for store-only sessions; every call fails permanently.
struct OfflineIssueTracker;

impl OfflineIssueTracker {
    fn refuse<'a, T: Send + 'a>() -> IssueFuture<'a, T> {
        Box::pin(async {
            Err(IssueError::permanent("no GitHub tracker configured for this command"))
        })
    }
}

impl IssueTracker for OfflineIssueTracker {
    fn list_issues<'a>(&'a self, _repo: &'a RepoRef) -> IssueFuture<'a, Vec<Issue>> {
        Self::refuse()
    }

    fn get_issue<'a>(&'a self, _repo: &'a RepoRef, _number: u64) -> IssueFuture<'a, Issue> {
        Self::refuse()
    }

    fn create_issue<'a>(
        &'a self,
        _repo: &'a RepoRef,
        _title: &'a str,
        _body: &'a str,
    ) -> IssueFuture<'a, Issue> {
        Self::refuse()
    }

    fn edit_issue<'a>(
        &'a self,
        _repo: &'a RepoRef,
        _number: u64,
        _edit: &'a IssueEdit,
    ) -> IssueFuture<'a, Issue> {
        Self::refuse()
    }
}
