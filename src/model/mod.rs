//! Desired-state record types and status conditions.

pub mod condition;
pub mod record;

pub use condition::{find_condition, set_condition, Condition, ConditionStatus};
pub use record::{
    GithubIssuer, GithubIssuerSpec, GithubIssuerStatus, ObjectMeta, ResourceKey, API_VERSION,
    DEFAULT_NAMESPACE, KIND,
};
