//! Recording adapters that capture tracker traffic into a cassette.

pub mod issues;

pub use issues::RecordingIssueTracker;

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::warn;

use crate::cassette::recorder::CassetteRecorder;
use crate::error::IssueError;

/// Records a call and its outcome.
///
/// `Ok(v)` is stored as `{"Ok": v}` and `Err(e)` as `{"Err": e}`, with the
/// error kept typed so replay can hand back the same variant.
pub(crate) fn record_result<I, T>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, IssueError>,
) where
    I: Serialize,
    T: Serialize,
{
    let output = match result {
        Ok(v) => serde_json::to_value(v).map(|v| serde_json::json!({ "Ok": v })),
        Err(e) => serde_json::to_value(e).map(|e| serde_json::json!({ "Err": e })),
    };
    match (serde_json::to_value(input), output) {
        (Ok(input), Ok(output)) => {
            let mut guard = recorder.lock().unwrap_or_else(PoisonError::into_inner);
            guard.record(port, method, input, output);
        }
        (Err(e), _) | (_, Err(e)) => {
            warn!(port, method, error = %e, "interaction could not be recorded");
        }
    }
}
