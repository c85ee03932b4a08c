//! A record store backed by plain files.
//!
//! Each record of one kind lives under `<root>/<namespace>/`:
//!
//! - `<name>.toml` is the user-owned declaration: a `delete` flag and a `[spec]` table
//! - `<name>.state.json` is engine-owned: the deletion guard and the last observed status
//!
//! The engine never rewrites a declaration, so hand edits and engine writes do not race.

use std::{
    io::ErrorKind,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use hub_steward_core::{
    DeletionGuard, DesiredStateRecord, RecordKey, RecordStore, ResourceKind, ResourceStatus,
    StoreError,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

#[cfg(test)]
#[path = "file_store_tests.rs"]
mod tests;

const DECLARATION_EXTENSION: &str = "toml";
const STATE_SUFFIX: &str = ".state.json";

#[derive(Serialize, Deserialize)]
struct Declaration<S> {
    #[serde(default)]
    delete: bool,
    spec: S,
}

#[derive(Serialize, Deserialize)]
#[serde(bound(deserialize = "O: DeserializeOwned"))]
struct RecordState<O> {
    #[serde(default)]
    guard: DeletionGuard,
    #[serde(default)]
    status: ResourceStatus<O>,
}

impl<O> Default for RecordState<O> {
    fn default() -> Self {
        Self {
            guard: DeletionGuard::Absent,
            status: ResourceStatus::default(),
        }
    }
}

/// File-backed [`RecordStore`] for the records of one resource kind.
pub struct FileRecordStore<S, O> {
    root: PathBuf,
    _marker: PhantomData<fn() -> (S, O)>,
}

impl<S, O> FileRecordStore<S, O> {
    /// Opens the store for `kind` below `records_dir`. Nothing is created until written.
    pub fn new(records_dir: &Path, kind: ResourceKind) -> Self {
        Self {
            root: records_dir.join(kind.plural()),
            _marker: PhantomData,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn declaration_path(&self, key: &RecordKey) -> PathBuf {
        self.root
            .join(&key.namespace)
            .join(format!("{}.{}", key.name, DECLARATION_EXTENSION))
    }

    fn state_path(&self, key: &RecordKey) -> PathBuf {
        self.root
            .join(&key.namespace)
            .join(format!("{}{}", key.name, STATE_SUFFIX))
    }

    async fn ensure_declared(&self, key: &RecordKey) -> Result<(), StoreError> {
        match tokio::fs::metadata(self.declaration_path(key)).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(key.clone())),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

impl<S, O> FileRecordStore<S, O>
where
    S: Serialize,
{
    /// Writes the declaration of `key`, leaving its engine-owned state alone.
    pub async fn declare(&self, key: &RecordKey, spec: &S, delete: bool) -> Result<(), StoreError> {
        let content = toml::to_string_pretty(&Declaration { delete, spec })
            .map_err(|e| serialization_error(key, e))?;
        write_file(&self.declaration_path(key), content.as_bytes()).await?;
        debug!(key = %key, delete, "Wrote record declaration");
        Ok(())
    }
}

impl<S, O> FileRecordStore<S, O>
where
    O: Serialize + DeserializeOwned,
{
    async fn read_state(&self, key: &RecordKey) -> Result<RecordState<O>, StoreError> {
        match tokio::fs::read(self.state_path(key)).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| serialization_error(key, e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(RecordState::default()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn write_state(&self, key: &RecordKey, state: &RecordState<O>) -> Result<(), StoreError> {
        let content =
            serde_json::to_vec_pretty(state).map_err(|e| serialization_error(key, e))?;
        write_file(&self.state_path(key), &content).await
    }
}

#[async_trait]
impl<S, O> RecordStore<S, O> for FileRecordStore<S, O>
where
    S: DeserializeOwned + Send + Sync,
    O: Serialize + DeserializeOwned + Send + Sync,
{
    async fn keys(&self) -> Result<Vec<RecordKey>, StoreError> {
        let mut keys = Vec::new();
        let mut namespaces = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(StoreError::Io(e)),
        };

        while let Some(namespace) = namespaces.next_entry().await? {
            if !namespace.file_type().await?.is_dir() {
                continue;
            }
            let Some(namespace_name) = namespace.file_name().to_str().map(str::to_string) else {
                warn!(path = ?namespace.path(), "Skipping namespace with a non UTF-8 name");
                continue;
            };

            let mut files = tokio::fs::read_dir(namespace.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some(DECLARATION_EXTENSION) {
                    continue;
                }
                if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(RecordKey::new(namespace_name.clone(), name));
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn get(&self, key: &RecordKey) -> Result<DesiredStateRecord<S, O>, StoreError> {
        let content = match tokio::fs::read_to_string(self.declaration_path(key)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.clone()))
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        let declaration: Declaration<S> =
            toml::from_str(&content).map_err(|e| serialization_error(key, e))?;
        let state = self.read_state(key).await?;

        Ok(DesiredStateRecord {
            key: key.clone(),
            spec: declaration.spec,
            status: state.status,
            guard: state.guard,
            deletion_requested: declaration.delete,
        })
    }

    async fn set_guard(&self, key: &RecordKey, guard: DeletionGuard) -> Result<(), StoreError> {
        self.ensure_declared(key).await?;
        let mut state = self.read_state(key).await?;
        state.guard = guard;
        self.write_state(key, &state).await
    }

    async fn write_status(
        &self,
        key: &RecordKey,
        status: ResourceStatus<O>,
    ) -> Result<(), StoreError> {
        self.ensure_declared(key).await?;
        let mut state = self.read_state(key).await?;
        state.status = status;
        self.write_state(key, &state).await
    }

    async fn remove(&self, key: &RecordKey) -> Result<(), StoreError> {
        for path in [self.declaration_path(key), self.state_path(key)] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::Io(e)),
            }
        }
        debug!(key = %key, "Removed record files");
        Ok(())
    }
}

fn serialization_error(key: &RecordKey, e: impl std::fmt::Display) -> StoreError {
    StoreError::Serialization {
        key: key.clone(),
        message: e.to_string(),
    }
}

/// Replaces `path` through a temporary sibling so readers never observe a partial file.
async fn write_file(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut temporary = path.as_os_str().to_owned();
    temporary.push(".tmp");
    let temporary = PathBuf::from(temporary);
    tokio::fs::write(&temporary, content).await?;
    tokio::fs::rename(&temporary, path).await?;
    Ok(())
}
