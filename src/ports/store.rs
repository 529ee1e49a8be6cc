//! Record store port: the control plane's persistence primitives.

use std::future::Future;
use std::pin::Pin;

use crate::error::StoreError;
use crate::model::{GithubIssuer, ResourceKey};

/// Boxed future returned by [`RecordStore`] methods; keeps the trait dyn-compatible.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// A key plus the generation it currently has, as seen by a list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRef {
    /// Record identity.
    pub key: ResourceKey,
    /// Current `metadata.generation`.
    pub generation: u64,
}

/// Persistent storage for desired-state records.
///
/// Implementations own optimistic concurrency: every write carries the
/// `resource_version` the caller read, and a stale version fails with
/// [`StoreError::Conflict`].
pub trait RecordStore: Send + Sync {
    /// Loads a record; `None` when it does not exist (or was purged).
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read.
    fn get<'a>(&'a self, key: &'a ResourceKey) -> StoreFuture<'a, Option<GithubIssuer>>;

    /// Lists every stored record with its generation.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be enumerated.
    fn list(&self) -> StoreFuture<'_, Vec<RecordRef>>;

    /// Writes metadata (including finalizers) and spec; status is left as stored.
    ///
    /// Returns `None` when the write released the last finalizer of a record
    /// under deletion and the store purged it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] on a stale resource version.
    fn update<'a>(&'a self, record: &'a GithubIssuer) -> StoreFuture<'a, Option<GithubIssuer>>;

    /// Writes only the status subresource.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] on a stale resource version.
    fn update_status<'a>(&'a self, record: &'a GithubIssuer) -> StoreFuture<'a, GithubIssuer>;

    /// Creates a record or replaces the spec of an existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is being deleted or cannot be written.
    fn apply<'a>(&'a self, record: &'a GithubIssuer) -> StoreFuture<'a, GithubIssuer>;

    /// Requests deletion: purges immediately without finalizers, otherwise
    /// stamps the deletion timestamp and leaves the record in place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the record does not exist.
    fn delete<'a>(&'a self, key: &'a ResourceKey) -> StoreFuture<'a, ()>;
}
