//! Serves recorded interactions back in order.

use std::collections::HashMap;

use super::format::{Cassette, Interaction};
use super::CassetteError;

/// Replays a cassette with an independent cursor per port/method pair.
///
/// Calls to different methods may interleave differently than they did
/// while recording; calls to the same method must come in the same order
/// and with the same input.
pub struct CassetteReplayer {
    queues: HashMap<(String, String), Vec<Interaction>>,
    cursors: HashMap<(String, String), usize>,
}

impl CassetteReplayer {
    /// Indexes a loaded cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<(String, String), Vec<Interaction>> = HashMap::new();
        for interaction in &cassette.interactions {
            let key = (interaction.port.clone(), interaction.method.clone());
            queues.entry(key).or_default().push(interaction.clone());
        }
        Self { queues, cursors: HashMap::new() }
    }

    /// Returns the next recorded interaction for `port::method`, checking
    /// that it was recorded with the same `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing (or nothing more) was recorded for the
    /// pair, or if the recorded input differs.
    pub fn next_interaction(
        &mut self,
        port: &str,
        method: &str,
        input: &serde_json::Value,
    ) -> Result<&Interaction, CassetteError> {
        let key = (port.to_string(), method.to_string());
        let Some(queue) = self.queues.get(&key) else {
            let mut available: Vec<String> =
                self.queues.keys().map(|(p, m)| format!("{p}::{m}")).collect();
            available.sort();
            return Err(CassetteError::Unrecorded {
                port: port.to_string(),
                method: method.to_string(),
                available: available.join(", "),
            });
        };

        let cursor = self.cursors.entry(key).or_insert(0);
        let interaction = queue.get(*cursor).ok_or_else(|| CassetteError::Exhausted {
            port: port.to_string(),
            method: method.to_string(),
            count: queue.len(),
        })?;
        if interaction.input != *input {
            return Err(CassetteError::InputMismatch {
                seq: interaction.seq,
                port: port.to_string(),
                method: method.to_string(),
                recorded: interaction.input.to_string(),
                actual: input.to_string(),
            });
        }
        *cursor += 1;
        Ok(interaction)
    }

    /// Interactions not yet served.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queues
            .iter()
            .map(|(key, queue)| queue.len() - self.cursors.get(key).copied().unwrap_or(0))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn interaction(seq: u64, method: &str, input: serde_json::Value) -> Interaction {
        Interaction {
            seq,
            port: "issues".into(),
            method: method.into(),
            input,
            output: json!({ "Ok": seq }),
        }
    }

    fn cassette(interactions: Vec<Interaction>) -> Cassette {
        Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            controller_version: String::new(),
            interactions,
        }
    }

    #[test]
    fn cursors_are_independent_per_method() {
        let mut replayer = CassetteReplayer::new(&cassette(vec![
            interaction(0, "list_issues", json!({"n": 0})),
            interaction(1, "create_issue", json!({"n": 1})),
            interaction(2, "list_issues", json!({"n": 2})),
        ]));
        assert_eq!(replayer.remaining(), 3);

        assert_eq!(replayer.next_interaction("issues", "create_issue", &json!({"n": 1})).unwrap().seq, 1);
        assert_eq!(replayer.next_interaction("issues", "list_issues", &json!({"n": 0})).unwrap().seq, 0);
        assert_eq!(replayer.next_interaction("issues", "list_issues", &json!({"n": 2})).unwrap().seq, 2);
        assert_eq!(replayer.remaining(), 0);
    }

    #[test]
    fn exhausted_pair_is_an_error() {
        let mut replayer =
            CassetteReplayer::new(&cassette(vec![interaction(0, "get_issue", json!({}))]));
        replayer.next_interaction("issues", "get_issue", &json!({})).unwrap();
        let err = replayer.next_interaction("issues", "get_issue", &json!({})).unwrap_err();
        assert!(matches!(err, CassetteError::Exhausted { count: 1, .. }));
    }

    #[test]
    fn unknown_pair_lists_what_was_recorded() {
        let mut replayer =
            CassetteReplayer::new(&cassette(vec![interaction(0, "get_issue", json!({}))]));
        let err = replayer.next_interaction("issues", "edit_issue", &json!({})).unwrap_err();
        assert!(err.to_string().contains("issues::get_issue"));
    }

    #[test]
    fn diverging_input_is_rejected_without_advancing() {
        let mut replayer =
            CassetteReplayer::new(&cassette(vec![interaction(0, "edit_issue", json!({"body": "a"}))]));
        let err = replayer.next_interaction("issues", "edit_issue", &json!({"body": "b"})).unwrap_err();
        assert!(matches!(err, CassetteError::InputMismatch { seq: 0, .. }));
        assert_eq!(replayer.remaining(), 1);
    }
}
