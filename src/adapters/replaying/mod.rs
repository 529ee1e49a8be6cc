//! Replaying adapters that serve recorded tracker traffic.

pub mod issues;

pub use issues::ReplayingIssueTracker;

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::CassetteError;
use crate::error::IssueError;

/// Replays the next recorded outcome for `port::method`.
///
/// Mirror of `recording::record_result`. Cassette problems (nothing left,
/// diverging input, undecodable output) surface as permanent tracker
/// errors so the pass fails loudly instead of drifting from the recording.
pub(crate) fn replay_result<I, T>(
    replayer: &Arc<Mutex<CassetteReplayer>>,
    port: &str,
    method: &str,
    input: &I,
) -> Result<T, IssueError>
where
    I: Serialize,
    T: DeserializeOwned,
{
    let cassette_err = |e: CassetteError| IssueError::permanent(format!("cassette replay: {e}"));
    let input = serde_json::to_value(input)
        .map_err(|e| IssueError::permanent(format!("cassette replay: unserializable input: {e}")))?;

    let mut guard = replayer.lock().unwrap_or_else(PoisonError::into_inner);
    let interaction = guard.next_interaction(port, method, &input).map_err(cassette_err)?;
    let decode = |reason: String| cassette_err(CassetteError::Decode { seq: interaction.seq, reason });

    if let Some(ok) = interaction.output.get("Ok") {
        return serde_json::from_value(ok.clone()).map_err(|e| decode(e.to_string()));
    }
    if let Some(err) = interaction.output.get("Err") {
        let err: IssueError =
            serde_json::from_value(err.clone()).map_err(|e| decode(e.to_string()))?;
        return Err(err);
    }
    Err(decode("output is neither Ok nor Err".to_string()))
}
