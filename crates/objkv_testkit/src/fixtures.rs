//! Test fixtures and container helpers.
//!
//! Provides ready-to-use containers over the in-memory engine, optionally
//! wrapped in an [`InstrumentedEngine`], and temporary snapshot files.

use crate::instrumented::InstrumentedEngine;
use objkv_core::{Config, Container, ContainerLocator};
use objkv_engine::{Engine, InMemoryEngine, SnapshotResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// A container opened over a fresh engine.
///
/// The engine is kept alongside so tests can inspect it.
pub struct TestContainer<E = InMemoryEngine> {
    /// The engine the container was opened on.
    pub engine: Arc<E>,
    /// The open container.
    pub container: Container,
    /// Pool UUID.
    pub pool: Uuid,
    /// Container UUID.
    pub cont: Uuid,
}

impl TestContainer<InMemoryEngine> {
    /// Opens a container over a fresh in-memory engine.
    pub fn memory() -> Self {
        Self::memory_with(Config::default())
    }

    /// Opens a container over a fresh in-memory engine with `config`.
    pub fn memory_with(config: Config) -> Self {
        let engine = Arc::new(InMemoryEngine::new());
        let (pool, cont) = create(&engine);
        Self::open(engine, pool, cont, config)
    }
}

impl TestContainer<InstrumentedEngine> {
    /// Opens a container over an instrumented in-memory engine.
    pub fn instrumented() -> Self {
        Self::instrumented_with(Config::default())
    }

    /// Opens a container over an instrumented in-memory engine with `config`.
    pub fn instrumented_with(config: Config) -> Self {
        let engine = Arc::new(InstrumentedEngine::new());
        let (pool, cont) = create(engine.inner());
        Self::open(engine, pool, cont, config)
    }
}

impl<E: Engine + 'static> TestContainer<E> {
    fn open(engine: Arc<E>, pool: Uuid, cont: Uuid, config: Config) -> Self {
        let dyn_engine: Arc<dyn Engine> = engine.clone();
        let container = Container::open_with(dyn_engine, &ContainerLocator::ids(pool, cont), config)
            .expect("Failed to open test container");
        Self {
            engine,
            container,
            pool,
            cont,
        }
    }
}

fn create(engine: &InMemoryEngine) -> (Uuid, Uuid) {
    let (pool, cont) = (Uuid::new_v4(), Uuid::new_v4());
    engine.create_container(pool, cont);
    (pool, cont)
}

impl<E> std::ops::Deref for TestContainer<E> {
    type Target = Container;

    fn deref(&self) -> &Self::Target {
        &self.container
    }
}

/// Runs a test with a container over a fresh in-memory engine.
///
/// # Example
///
/// ```rust
/// use objkv_testkit::with_container;
///
/// with_container(|container| {
///     let kv = container.newkv().unwrap();
///     kv.put("k", "v").unwrap();
///     assert_eq!(kv.len().unwrap(), 1);
/// });
/// ```
pub fn with_container<F, R>(f: F) -> R
where
    F: FnOnce(&Container) -> R,
{
    let fixture = TestContainer::memory();
    f(&fixture.container)
}

/// A snapshot file in a temporary directory, removed on drop.
pub struct TempStore {
    dir: TempDir,
    path: PathBuf,
}

impl TempStore {
    /// Creates an empty temporary directory for a snapshot file.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("store.json");
        Self { dir, path }
    }

    /// Returns the snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the temporary directory.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `engine` to the snapshot file.
    pub fn save(&self, engine: &InMemoryEngine) -> SnapshotResult<()> {
        engine.save(&self.path)
    }

    /// Reads a new engine from the snapshot file.
    pub fn load(&self) -> SnapshotResult<InMemoryEngine> {
        InMemoryEngine::load(&self.path)
    }
}

impl Default for TempStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fixture_opens_container() {
        let fixture = TestContainer::memory();
        assert!(fixture.is_open());
        assert_eq!(fixture.pool_id(), Some(fixture.pool));
        assert_eq!(fixture.engine.open_handle_count(), 2);
    }

    #[test]
    fn instrumented_fixture_counts_calls() {
        let fixture = TestContainer::instrumented();
        let kv = fixture.newkv().unwrap();
        kv.put("k", "v").unwrap();
        assert_eq!(fixture.engine.calls(crate::EngineOp::KvPut), 1);
    }

    #[test]
    fn temp_store_round_trips() {
        let fixture = TestContainer::memory();
        let kv = fixture.rootkv().unwrap();
        kv.put("k", "v").unwrap();
        kv.close().unwrap();

        let store = TempStore::new();
        store.save(&fixture.engine).unwrap();
        assert!(store.path().starts_with(store.dir()));

        let loaded = store.load().unwrap();
        assert_eq!(loaded.containers(), vec![(fixture.pool, fixture.cont)]);
    }
}
