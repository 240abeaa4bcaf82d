//! Snapshot persistence for the in-memory engine.
//!
//! A snapshot captures containers, path bindings and object contents. Open
//! handles are process-local and are never captured; a loaded engine starts
//! with no open handles.

use crate::memory::{ContainerData, InMemoryEngine, KeySpace};
use crate::types::ObjectId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur while saving or loading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The snapshot could not be encoded or decoded.
    #[error("snapshot format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Serializable image of an [`InMemoryEngine`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Containers with their objects.
    pub containers: Vec<ContainerImage>,
    /// Namespace path bindings.
    pub paths: Vec<PathBinding>,
}

/// One container in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerImage {
    /// Pool UUID.
    pub pool: Uuid,
    /// Container UUID.
    pub container: Uuid,
    /// Last generated object `lo`.
    pub last_lo: u64,
    /// Objects holding at least one key.
    pub objects: Vec<ObjectImage>,
}

/// One object in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectImage {
    /// Object identifier.
    pub oid: ObjectId,
    /// Key-value pairs in key order.
    pub entries: Vec<(Vec<u8>, Vec<u8>)>,
}

/// A path bound to a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathBinding {
    /// Namespace path.
    pub path: PathBuf,
    /// Pool UUID.
    pub pool: Uuid,
    /// Container UUID.
    pub container: Uuid,
}

impl InMemoryEngine {
    /// Captures the engine contents.
    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        let state = self.state.read();

        let mut containers: Vec<ContainerImage> = state
            .containers
            .iter()
            .map(|(&(pool, container), data)| {
                let mut objects: Vec<ObjectImage> = data
                    .objects
                    .iter()
                    .filter(|(_, space)| !space.is_empty())
                    .map(|(oid, space)| ObjectImage {
                        oid: *oid,
                        entries: space
                            .iter()
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect(),
                    })
                    .collect();
                objects.sort_by_key(|object| object.oid);
                ContainerImage {
                    pool,
                    container,
                    last_lo: data.last_lo,
                    objects,
                }
            })
            .collect();
        containers.sort_by_key(|image| (image.pool, image.container));

        let mut paths: Vec<PathBinding> = state
            .paths
            .iter()
            .map(|(path, &(pool, container))| PathBinding {
                path: path.clone(),
                pool,
                container,
            })
            .collect();
        paths.sort_by(|a, b| a.path.cmp(&b.path));

        EngineSnapshot { containers, paths }
    }

    /// Builds an engine from a snapshot, exporting the default class table.
    #[must_use]
    pub fn from_snapshot(snapshot: EngineSnapshot) -> Self {
        let engine = Self::new();
        {
            let mut state = engine.state.write();
            for image in snapshot.containers {
                let data = ContainerData {
                    last_lo: image.last_lo,
                    objects: image
                        .objects
                        .into_iter()
                        .map(|object| (object.oid, object.entries.into_iter().collect::<KeySpace>()))
                        .collect(),
                };
                state.containers.insert((image.pool, image.container), data);
            }
            for binding in snapshot.paths {
                state
                    .paths
                    .insert(binding.path, (binding.pool, binding.container));
            }
        }
        engine
    }

    /// Writes a snapshot of the engine to `path` as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save(&self, path: &Path) -> SnapshotResult<()> {
        let encoded = serde_json::to_vec_pretty(&self.snapshot())?;
        fs::write(path, encoded)?;
        Ok(())
    }

    /// Loads an engine from a JSON snapshot at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or decoding fails.
    pub fn load(path: &Path) -> SnapshotResult<Self> {
        let bytes = fs::read(path)?;
        let snapshot: EngineSnapshot = serde_json::from_slice(&bytes)?;
        Ok(Self::from_snapshot(snapshot))
    }
}
