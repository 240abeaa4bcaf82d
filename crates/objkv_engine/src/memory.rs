//! In-memory reference engine.

use crate::engine::Engine;
use crate::status::{EngineResult, Status};
use crate::types::{
    Anchor, ContainerHandle, KeyPage, ObjectClass, ObjectHandle, ObjectId, PoolHandle,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Object classes exported by [`InMemoryEngine::new`].
pub const DEFAULT_CLASSES: &[(&str, u16)] = &[
    ("OC_S1", 200),
    ("OC_S2", 201),
    ("OC_S4", 202),
    ("OC_SX", 214),
    ("OC_RP_2G1", 220),
    ("OC_RP_2GX", 224),
    ("OC_RP_3G1", 230),
    ("OC_EC_2P1G1", 240),
];

pub(crate) type ContainerKey = (Uuid, Uuid);
pub(crate) type KeySpace = BTreeMap<Vec<u8>, Vec<u8>>;

#[derive(Debug, Default)]
pub(crate) struct ContainerData {
    /// Last `lo` handed out by `object_generate_id`. Zero is reserved for
    /// root objects.
    pub(crate) last_lo: u64,
    pub(crate) objects: HashMap<ObjectId, KeySpace>,
}

#[derive(Debug, Clone, Copy)]
struct OpenContainer {
    key: ContainerKey,
    pool_handle: u64,
}

#[derive(Debug, Clone, Copy)]
struct OpenObject {
    key: ContainerKey,
    container_handle: u64,
    oid: ObjectId,
}

#[derive(Debug, Default)]
pub(crate) struct EngineState {
    pub(crate) containers: HashMap<ContainerKey, ContainerData>,
    pub(crate) paths: HashMap<PathBuf, ContainerKey>,
    open_pools: HashMap<u64, Uuid>,
    open_containers: HashMap<u64, OpenContainer>,
    open_objects: HashMap<u64, OpenObject>,
}

impl EngineState {
    fn container(&self, coh: ContainerHandle) -> EngineResult<OpenContainer> {
        self.open_containers
            .get(&coh.as_raw())
            .copied()
            .ok_or(Status::NO_HDL)
    }

    fn object(&self, oh: ObjectHandle) -> EngineResult<OpenObject> {
        self.open_objects
            .get(&oh.as_raw())
            .copied()
            .ok_or(Status::NO_HDL)
    }

    fn key_space(&self, object: &OpenObject) -> Option<&KeySpace> {
        self.containers
            .get(&object.key)
            .and_then(|data| data.objects.get(&object.oid))
    }
}

/// An in-memory storage engine.
///
/// This engine keeps every pool, container and object in process memory and
/// is suitable for:
/// - Unit and integration tests
/// - The `objkv` command-line tool (via snapshots)
/// - Ephemeral stores that don't need a cluster
///
/// Pools and containers must be created with [`InMemoryEngine::create_container`]
/// before they can be opened. Objects come into existence implicitly on
/// first write, the way objects in a real cluster do.
///
/// # Thread Safety
///
/// This engine is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use objkv_engine::{Engine, InMemoryEngine};
/// use uuid::Uuid;
///
/// let engine = InMemoryEngine::new();
/// let (pool, cont) = (Uuid::new_v4(), Uuid::new_v4());
/// engine.create_container(pool, cont);
///
/// let (poh, coh) = engine.pool_container_open(pool, cont).unwrap();
/// engine.container_close(poh, coh).unwrap();
/// ```
#[derive(Debug)]
pub struct InMemoryEngine {
    pub(crate) state: RwLock<EngineState>,
    classes: Vec<(String, ObjectClass)>,
    next_handle: AtomicU64,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEngine {
    /// Creates an empty engine exporting [`DEFAULT_CLASSES`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_classes(
            DEFAULT_CLASSES
                .iter()
                .map(|(name, tag)| ((*name).to_string(), ObjectClass::new(*tag))),
        )
    }

    /// Creates an empty engine exporting a custom class table.
    pub fn with_classes<I>(classes: I) -> Self
    where
        I: IntoIterator<Item = (String, ObjectClass)>,
    {
        Self {
            state: RwLock::new(EngineState::default()),
            classes: classes.into_iter().collect(),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Creates a container (and implicitly its pool).
    ///
    /// Returns `false` if the container already existed.
    pub fn create_container(&self, pool: Uuid, container: Uuid) -> bool {
        let mut state = self.state.write();
        if state.containers.contains_key(&(pool, container)) {
            return false;
        }
        state
            .containers
            .insert((pool, container), ContainerData::default());
        true
    }

    /// Binds a namespace path to an existing container.
    ///
    /// # Errors
    ///
    /// Returns [`Status::NONEXIST`] if the container has not been created
    /// and [`Status::EXIST`] if the path is bound to a different container.
    pub fn register_path(&self, path: &Path, pool: Uuid, container: Uuid) -> EngineResult<()> {
        let mut state = self.state.write();
        if !state.containers.contains_key(&(pool, container)) {
            return Err(Status::NONEXIST);
        }
        match state.paths.get(path) {
            Some(existing) if *existing != (pool, container) => Err(Status::EXIST),
            _ => {
                state.paths.insert(path.to_path_buf(), (pool, container));
                Ok(())
            }
        }
    }

    /// Returns the pool/container pair a path is bound to.
    #[must_use]
    pub fn resolve_path(&self, path: &Path) -> Option<(Uuid, Uuid)> {
        self.state.read().paths.get(path).copied()
    }

    /// Returns all containers known to the engine, sorted.
    #[must_use]
    pub fn containers(&self) -> Vec<(Uuid, Uuid)> {
        let mut keys: Vec<_> = self.state.read().containers.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Returns the number of handles (pool, container, object) currently open.
    ///
    /// Useful for asserting that teardown released everything.
    #[must_use]
    pub fn open_handle_count(&self) -> usize {
        let state = self.state.read();
        state.open_pools.len() + state.open_containers.len() + state.open_objects.len()
    }

    fn is_known_class(&self, class: ObjectClass) -> bool {
        self.classes.iter().any(|(_, known)| *known == class)
    }

    fn allocate_handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    fn open_container_key(&self, key: ContainerKey) -> EngineResult<(PoolHandle, ContainerHandle)> {
        let mut state = self.state.write();
        if !state.containers.contains_key(&key) {
            return Err(Status::NONEXIST);
        }
        let poh = self.allocate_handle();
        let coh = self.allocate_handle();
        state.open_pools.insert(poh, key.0);
        state.open_containers.insert(
            coh,
            OpenContainer {
                key,
                pool_handle: poh,
            },
        );
        Ok((PoolHandle::from_raw(poh), ContainerHandle::from_raw(coh)))
    }
}

impl Engine for InMemoryEngine {
    fn pool_container_open(
        &self,
        pool: Uuid,
        container: Uuid,
    ) -> EngineResult<(PoolHandle, ContainerHandle)> {
        self.open_container_key((pool, container))
    }

    fn pool_container_open_by_path(
        &self,
        path: &Path,
    ) -> EngineResult<(PoolHandle, ContainerHandle)> {
        let key = self.resolve_path(path).ok_or(Status::NONEXIST)?;
        self.open_container_key(key)
    }

    fn container_close(&self, poh: PoolHandle, coh: ContainerHandle) -> EngineResult<()> {
        let mut state = self.state.write();
        let open = state.container(coh)?;
        if open.pool_handle != poh.as_raw() {
            return Err(Status::NO_HDL);
        }
        if state
            .open_objects
            .values()
            .any(|object| object.container_handle == coh.as_raw())
        {
            return Err(Status::BUSY);
        }
        state.open_containers.remove(&coh.as_raw());
        state.open_pools.remove(&poh.as_raw());
        Ok(())
    }

    fn object_classes(&self) -> Vec<(String, ObjectClass)> {
        self.classes.clone()
    }

    fn object_generate_id(
        &self,
        coh: ContainerHandle,
        class: ObjectClass,
    ) -> EngineResult<ObjectId> {
        if !self.is_known_class(class) {
            return Err(Status::INVAL);
        }
        let mut state = self.state.write();
        let open = state.container(coh)?;
        let data = state.containers.get_mut(&open.key).ok_or(Status::NONEXIST)?;
        data.last_lo += 1;
        Ok(ObjectId::new(u64::from(class.as_u16()) << 32, data.last_lo))
    }

    fn object_root_id(&self, class: ObjectClass) -> EngineResult<ObjectId> {
        if !self.is_known_class(class) {
            return Err(Status::INVAL);
        }
        Ok(ObjectId::new(u64::from(class.as_u16()) << 32, 0))
    }

    fn object_open(&self, coh: ContainerHandle, oid: ObjectId) -> EngineResult<ObjectHandle> {
        let mut state = self.state.write();
        let open = state.container(coh)?;
        let oh = self.allocate_handle();
        state.open_objects.insert(
            oh,
            OpenObject {
                key: open.key,
                container_handle: coh.as_raw(),
                oid,
            },
        );
        Ok(ObjectHandle::from_raw(oh))
    }

    fn object_close(&self, oh: ObjectHandle) -> EngineResult<()> {
        self.state
            .write()
            .open_objects
            .remove(&oh.as_raw())
            .map(|_| ())
            .ok_or(Status::NO_HDL)
    }

    fn kv_get(&self, oh: ObjectHandle, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        if key.is_empty() {
            return Err(Status::INVAL);
        }
        let state = self.state.read();
        let object = state.object(oh)?;
        Ok(state
            .key_space(&object)
            .and_then(|space| space.get(key))
            .cloned())
    }

    fn kv_put(&self, oh: ObjectHandle, key: &[u8], value: &[u8]) -> EngineResult<()> {
        if key.is_empty() || value.is_empty() {
            return Err(Status::INVAL);
        }
        let mut state = self.state.write();
        let object = state.object(oh)?;
        let data = state
            .containers
            .get_mut(&object.key)
            .ok_or(Status::NONEXIST)?;
        data.objects
            .entry(object.oid)
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn kv_remove(&self, oh: ObjectHandle, key: &[u8]) -> EngineResult<()> {
        if key.is_empty() {
            return Err(Status::INVAL);
        }
        let mut state = self.state.write();
        let object = state.object(oh)?;
        if let Some(space) = state
            .containers
            .get_mut(&object.key)
            .and_then(|data| data.objects.get_mut(&object.oid))
        {
            space.remove(key);
        }
        Ok(())
    }

    fn kv_enumerate(
        &self,
        oh: ObjectHandle,
        count: u32,
        bytes: usize,
        anchor: Option<&Anchor>,
    ) -> EngineResult<KeyPage> {
        if count == 0 {
            return Err(Status::INVAL);
        }
        let state = self.state.read();
        let object = state.object(oh)?;
        let mut page = KeyPage {
            keys: Vec::new(),
            count,
            bytes,
            anchor: None,
        };
        let Some(space) = state.key_space(&object) else {
            return Ok(page);
        };

        let lower = match anchor {
            Some(anchor) => Bound::Excluded(anchor.as_bytes()),
            None => Bound::Unbounded,
        };
        let mut remaining = space
            .range::<[u8], _>((lower, Bound::Unbounded))
            .map(|(key, _)| key)
            .peekable();

        let mut used = 0usize;
        while page.keys.len() < count as usize {
            let Some(key) = remaining.peek() else {
                break;
            };
            if used + key.len() > page.bytes {
                if !page.keys.is_empty() {
                    break;
                }
                // A single key larger than the buffer: grow the hint so the
                // walk can make progress.
                page.bytes = key.len();
            }
            used += key.len();
            page.keys.push((*key).clone());
            remaining.next();
        }

        if remaining.peek().is_some() {
            page.anchor = page.keys.last().map(|last| Anchor::new(last.clone()));
        }
        Ok(page)
    }
}
