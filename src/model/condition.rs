//! Status conditions reported back onto a `GithubIssuer` record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Condition type set after a create attempt.
pub const ISSUE_CREATED: &str = "IssueCreated";
/// Condition type set after an update attempt.
pub const ISSUE_UPDATED: &str = "IssueUpdated";
/// Derived condition: the remote issue is linked to a pull request.
pub const HAS_PR: &str = "hasPR";
/// Derived condition: the remote issue is not closed.
pub const IS_OPEN: &str = "isOpen";

/// Tri-state condition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    /// The condition holds.
    True,
    /// The condition does not hold.
    False,
    /// The outcome could not be determined.
    Unknown,
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// A typed status fact. At most one condition per `type` lives on a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type, the upsert key.
    #[serde(rename = "type")]
    pub condition_type: String,
    /// Current status.
    pub status: ConditionStatus,
    /// Machine-readable reason in `CamelCase`.
    pub reason: String,
    /// Human-readable detail.
    pub message: String,
    /// When `status` last changed.
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Builds a condition stamped with `now`.
    pub fn new(
        condition_type: impl Into<String>,
        status: impl Into<ConditionStatus>,
        reason: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            condition_type: condition_type.into(),
            status: status.into(),
            reason: reason.into(),
            message: message.into(),
            last_transition_time: now,
        }
    }
}

/// Upserts `condition` by type.
///
/// An existing entry of the same type is replaced in place, so ordering is
/// stable across passes. When the status does not change, the previous
/// `last_transition_time` is kept and only reason/message are refreshed.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) {
    match conditions.iter_mut().find(|c| c.condition_type == condition.condition_type) {
        Some(existing) => {
            let transition_time = if existing.status == condition.status {
                existing.last_transition_time
            } else {
                condition.last_transition_time
            };
            *existing = Condition { last_transition_time: transition_time, ..condition };
        }
        None => conditions.push(condition),
    }
}

/// Returns the live condition of the given type, if any.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.condition_type == condition_type)
}
