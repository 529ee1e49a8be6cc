//! File-backed record store: the stand-in control plane.
//!
//! Records are YAML manifests kept under a root directory and accessed
//! through the `FileSystem` port. Directory layout:
//!
//! ```text
//! <root>/
//!   └── <namespace>/
//!         └── <name>.yaml
//! ```
//!
//! Metadata follows Kubernetes conventions: `resourceVersion` moves on every
//! write, `generation` moves when the spec changes or deletion begins, and a
//! record under deletion is purged once its last finalizer is released.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::model::{GithubIssuer, ResourceKey};
use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;
use crate::ports::store::{RecordRef, RecordStore, StoreFuture};

const EXTENSION: &str = ".yaml";

/// Record store persisting manifests through a [`FileSystem`].
pub struct FileRecordStore {
    fs: Box<dyn FileSystem>,
    clock: Box<dyn Clock>,
    root: PathBuf,
}

impl FileRecordStore {
    /// Creates a store rooted at the given path.
    #[must_use]
    pub fn new(fs: Box<dyn FileSystem>, clock: Box<dyn Clock>, root: &Path) -> Self {
        Self { fs, clock, root: root.to_path_buf() }
    }

    fn path_for(&self, key: &ResourceKey) -> Result<PathBuf, StoreError> {
        let valid = |part: &str| {
            !part.is_empty() && part != "." && part != ".." && !part.contains(['/', '\\'])
        };
        if !valid(&key.namespace) || !valid(&key.name) {
            return Err(StoreError::malformed(key, "namespace and name must be plain path segments"));
        }
        Ok(self.root.join(&key.namespace).join(format!("{}{EXTENSION}", key.name)))
    }

    fn load(&self, key: &ResourceKey) -> Result<Option<GithubIssuer>, StoreError> {
        let path = self.path_for(key)?;
        if !self.fs.exists(&path) {
            return Ok(None);
        }
        let contents = self
            .fs
            .read_to_string(&path)
            .map_err(|e| StoreError::io(format!("failed to read {}: {e}", path.display())))?;
        let record: GithubIssuer =
            serde_yaml::from_str(&contents).map_err(|e| StoreError::malformed(key, e.to_string()))?;
        if record.key() != *key {
            return Err(StoreError::malformed(
                key,
                format!("manifest declares {} but is stored as {key}", record.key()),
            ));
        }
        Ok(Some(record))
    }

    /// Loads a record that the caller expects to exist at `resource_version`.
    fn load_current(&self, record: &GithubIssuer) -> Result<GithubIssuer, StoreError> {
        let key = record.key();
        let current = self.load(&key)?.ok_or_else(|| StoreError::not_found(&key))?;
        if current.metadata.resource_version != record.metadata.resource_version {
            return Err(StoreError::Conflict {
                key: key.to_string(),
                expected: record.metadata.resource_version,
                found: current.metadata.resource_version,
            });
        }
        Ok(current)
    }

    fn save(&self, record: &GithubIssuer) -> Result<(), StoreError> {
        let key = record.key();
        let path = self.path_for(&key)?;
        let yaml =
            serde_yaml::to_string(record).map_err(|e| StoreError::malformed(&key, e.to_string()))?;
        self.fs
            .write(&path, &yaml)
            .map_err(|e| StoreError::io(format!("failed to write {}: {e}", path.display())))
    }

    fn purge(&self, key: &ResourceKey) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        self.fs
            .remove_file(&path)
            .map_err(|e| StoreError::io(format!("failed to remove {}: {e}", path.display())))?;
        debug!(key = %key, "purged record");
        Ok(())
    }

    fn list_names(&self, dir: &Path) -> Result<Vec<String>, StoreError> {
        if !self.fs.exists(dir) {
            return Ok(Vec::new());
        }
        self.fs
            .list_dir(dir)
            .map_err(|e| StoreError::io(format!("failed to list {}: {e}", dir.display())))
    }

    fn list_sync(&self) -> Result<Vec<RecordRef>, StoreError> {
        let mut refs = Vec::new();
        for namespace in self.list_names(&self.root)? {
            let dir = self.root.join(&namespace);
            for file in self.list_names(&dir)? {
                let Some(name) = file.strip_suffix(EXTENSION) else { continue };
                let key = ResourceKey::new(&namespace, name);
                match self.load(&key) {
                    Ok(Some(record)) => {
                        refs.push(RecordRef { key, generation: record.metadata.generation });
                    }
                    Ok(None) => {}
                    Err(e @ StoreError::Malformed { .. }) => warn!(error = %e, "skipping record"),
                    Err(e) => return Err(e),
                }
            }
        }
        refs.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(refs)
    }

    fn update_sync(&self, record: &GithubIssuer) -> Result<Option<GithubIssuer>, StoreError> {
        let mut next = self.load_current(record)?;
        if next.spec != record.spec {
            next.spec = record.spec.clone();
            next.metadata.generation += 1;
        }
        next.metadata.finalizers.clone_from(&record.metadata.finalizers);
        next.metadata.resource_version += 1;

        if next.is_deleting() && next.metadata.finalizers.is_empty() {
            self.purge(&next.key())?;
            return Ok(None);
        }
        self.save(&next)?;
        Ok(Some(next))
    }

    fn update_status_sync(&self, record: &GithubIssuer) -> Result<GithubIssuer, StoreError> {
        let mut next = self.load_current(record)?;
        next.status = record.status.clone();
        next.metadata.resource_version += 1;
        self.save(&next)?;
        Ok(next)
    }

    fn apply_sync(&self, record: &GithubIssuer) -> Result<GithubIssuer, StoreError> {
        let key = record.key();
        let next = match self.load(&key)? {
            Some(current) if current.is_deleting() => {
                return Err(StoreError::Terminating { key: key.to_string() });
            }
            Some(current) if current.spec == record.spec => return Ok(current),
            Some(mut current) => {
                current.spec = record.spec.clone();
                current.metadata.generation += 1;
                current.metadata.resource_version += 1;
                current
            }
            None => {
                let mut fresh = GithubIssuer::new(&key, record.spec.clone());
                fresh.metadata.generation = 1;
                fresh.metadata.resource_version = 1;
                fresh
            }
        };
        self.save(&next)?;
        debug!(key = %key, generation = next.metadata.generation, "applied record");
        Ok(next)
    }

    fn delete_sync(&self, key: &ResourceKey) -> Result<(), StoreError> {
        let mut record = self.load(key)?.ok_or_else(|| StoreError::not_found(key))?;
        if record.metadata.finalizers.is_empty() {
            return self.purge(key);
        }
        if record.is_deleting() {
            return Ok(());
        }
        record.metadata.deletion_timestamp = Some(self.clock.now());
        record.metadata.generation += 1;
        record.metadata.resource_version += 1;
        self.save(&record)
    }
}

impl RecordStore for FileRecordStore {
    fn get<'a>(&'a self, key: &'a ResourceKey) -> StoreFuture<'a, Option<GithubIssuer>> {
        Box::pin(async move { self.load(key) })
    }

    fn list(&self) -> StoreFuture<'_, Vec<RecordRef>> {
        Box::pin(async move { self.list_sync() })
    }

    fn update<'a>(&'a self, record: &'a GithubIssuer) -> StoreFuture<'a, Option<GithubIssuer>> {
        Box::pin(async move { self.update_sync(record) })
    }

    fn update_status<'a>(&'a self, record: &'a GithubIssuer) -> StoreFuture<'a, GithubIssuer> {
        Box::pin(async move { self.update_status_sync(record) })
    }

    fn apply<'a>(&'a self, record: &'a GithubIssuer) -> StoreFuture<'a, GithubIssuer> {
        Box::pin(async move { self.apply_sync(record) })
    }

    fn delete<'a>(&'a self, key: &'a ResourceKey) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.delete_sync(key) })
    }
}
