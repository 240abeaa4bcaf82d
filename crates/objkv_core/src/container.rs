//! Container handles and the pool → container → object ownership chain.

use crate::config::Config;
use crate::error::{EngineResultExt, KvError, KvResult};
use crate::id::{self, ClassTable};
use crate::kv::KvObject;
use crate::stats::{ClientStats, StatsSnapshot};
use objkv_engine::{ContainerHandle, Engine, ObjectClass, ObjectId, PoolHandle, Status};
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifies the container to open.
///
/// Exactly one of a path or a complete pool/container pair must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerLocator {
    /// Pool UUID.
    pub pool: Option<Uuid>,
    /// Container UUID.
    pub container: Option<Uuid>,
    /// Namespace path resolving to a pool/container pair.
    pub path: Option<PathBuf>,
}

impl ContainerLocator {
    /// Locates a container by pool and container UUID.
    #[must_use]
    pub fn ids(pool: Uuid, container: Uuid) -> Self {
        Self {
            pool: Some(pool),
            container: Some(container),
            path: None,
        }
    }

    /// Locates a container by namespace path.
    #[must_use]
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self {
            pool: None,
            container: None,
            path: Some(path.into()),
        }
    }

    fn target(&self) -> KvResult<Target> {
        match (&self.path, self.pool, self.container) {
            (Some(path), None, None) => Ok(Target::Path(path.clone())),
            (Some(_), _, _) => Err(KvError::invalid_argument(
                "supply either a path or a pool/container pair, not both",
            )),
            (None, Some(pool), Some(container)) => Ok(Target::Ids { pool, container }),
            (None, _, _) => Err(KvError::invalid_argument(
                "invalid pool or container UUID",
            )),
        }
    }
}

#[derive(Debug, Clone)]
enum Target {
    Ids { pool: Uuid, container: Uuid },
    Path(PathBuf),
}

/// Outcome of [`Container::close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseStatus {
    /// The engine-level container close completed.
    Closed,
    /// KV objects are still open; the engine-level close runs when the last
    /// of them is closed.
    Deferred {
        /// KV objects still open at the time of the request.
        live_objects: usize,
    },
}

#[derive(Debug, Default)]
struct Lifecycle {
    live_objects: usize,
    close_requested: bool,
    closed: bool,
}

/// State shared between a container and every KV object opened from it.
///
/// KV objects hold an `Arc` to this, which keeps the engine handles alive
/// after the owning [`Container`] has requested close.
pub(crate) struct ContainerShared {
    engine: Arc<dyn Engine>,
    target: Target,
    poh: PoolHandle,
    coh: ContainerHandle,
    config: Config,
    classes: ClassTable,
    stats: ClientStats,
    lifecycle: Mutex<Lifecycle>,
}

impl ContainerShared {
    pub(crate) fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn stats(&self) -> &ClientStats {
        &self.stats
    }

    /// Returns the container handle if close has not been requested.
    pub(crate) fn ensure_open(&self) -> KvResult<ContainerHandle> {
        if self.lifecycle.lock().close_requested {
            Err(KvError::protocol_violation(format!(
                "container {self} is closed"
            )))
        } else {
            Ok(self.coh)
        }
    }

    /// Registers a KV object that is about to be opened.
    pub(crate) fn acquire(&self) -> KvResult<ContainerHandle> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.close_requested {
            return Err(KvError::protocol_violation(format!(
                "cannot open a KV object: container {self} is closed"
            )));
        }
        lifecycle.live_objects += 1;
        Ok(self.coh)
    }

    /// Unregisters a KV object, running a deferred container close if it was
    /// the last one.
    pub(crate) fn release(&self) -> KvResult<()> {
        let run_close = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.live_objects = lifecycle.live_objects.saturating_sub(1);
            let run_close =
                lifecycle.close_requested && lifecycle.live_objects == 0 && !lifecycle.closed;
            if run_close {
                lifecycle.closed = true;
            }
            run_close
        };
        if run_close {
            debug!(container = %self, "running deferred container close");
            self.engine_close()
        } else {
            Ok(())
        }
    }

    /// Unregisters a KV object whose engine open failed and builds the
    /// error to return.
    ///
    /// A failed deferred container close outranks the open failure, since
    /// the caller has no other way to observe it.
    fn abandon_open(&self, oid: ObjectId, status: Status) -> KvError {
        self.stats.record_error();
        let open_error = KvError::engine("failed to open object", status);
        match self.release() {
            Ok(()) => open_error,
            Err(close_error) => {
                warn!(container = %self, %oid, error = %open_error, "object open failed");
                close_error
            }
        }
    }

    fn request_close(&self) -> KvResult<CloseStatus> {
        let live_objects = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.close_requested {
                return Err(KvError::protocol_violation(format!(
                    "container {self} is already closed"
                )));
            }
            lifecycle.close_requested = true;
            if lifecycle.live_objects == 0 {
                lifecycle.closed = true;
            }
            lifecycle.live_objects
        };

        if live_objects > 0 {
            debug!(container = %self, live_objects, "container close deferred");
            return Ok(CloseStatus::Deferred { live_objects });
        }
        self.engine_close()?;
        Ok(CloseStatus::Closed)
    }

    fn engine_close(&self) -> KvResult<()> {
        let result = self
            .engine
            .container_close(self.poh, self.coh)
            .or_fail("failed to close container");
        match &result {
            Ok(()) => debug!(container = %self, "container closed"),
            Err(_) => self.stats.record_error(),
        }
        result
    }
}

impl fmt::Display for ContainerShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Ids { pool, container } => write!(f, "{container}@{pool}"),
            Target::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// An open container.
///
/// `Container` owns the pool and container bindings. KV objects opened from
/// it share its interior, so the engine-level close is deferred until the
/// last of them is closed:
///
/// ```rust
/// use objkv_core::{CloseStatus, Container};
/// use objkv_engine::InMemoryEngine;
/// use std::sync::Arc;
/// use uuid::Uuid;
///
/// let engine = Arc::new(InMemoryEngine::new());
/// let (pool, cont) = (Uuid::new_v4(), Uuid::new_v4());
/// engine.create_container(pool, cont);
///
/// let container = Container::open(engine.clone(), pool, cont).unwrap();
/// let kv = container.newkv().unwrap();
/// kv.put("a", "1").unwrap();
///
/// assert_eq!(
///     container.close().unwrap(),
///     CloseStatus::Deferred { live_objects: 1 }
/// );
/// kv.close().unwrap(); // the container is released here
/// assert_eq!(engine.open_handle_count(), 0);
/// ```
///
/// # Drop
///
/// Dropping a container that was never closed requests close. Failures are
/// logged, since they cannot be returned from `drop`; call
/// [`Container::close`] to observe them.
pub struct Container {
    shared: Arc<ContainerShared>,
}

impl Container {
    /// Opens a container by pool and container UUID with default configuration.
    ///
    /// # Errors
    ///
    /// Returns `Engine` if the engine cannot open the pool or container.
    pub fn open(engine: Arc<dyn Engine>, pool: Uuid, container: Uuid) -> KvResult<Self> {
        Self::open_with(engine, &ContainerLocator::ids(pool, container), Config::default())
    }

    /// Opens a container by namespace path with default configuration.
    ///
    /// # Errors
    ///
    /// Returns `Engine` if the path does not resolve or cannot be opened.
    pub fn open_by_path(engine: Arc<dyn Engine>, path: impl AsRef<Path>) -> KvResult<Self> {
        Self::open_with(
            engine,
            &ContainerLocator::path(path.as_ref()),
            Config::default(),
        )
    }

    /// Opens a container with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `InvalidArgument` if the locator does not name exactly one of a
    ///   path or a complete pool/container pair, or if `config` is invalid
    ///   (no engine call is made)
    /// - `Engine` if the engine cannot open the container
    pub fn open_with(
        engine: Arc<dyn Engine>,
        locator: &ContainerLocator,
        config: Config,
    ) -> KvResult<Self> {
        let target = locator.target()?;
        config.validate()?;
        let (poh, coh) = match &target {
            Target::Ids { pool, container } => engine.pool_container_open(*pool, *container),
            Target::Path(path) => engine.pool_container_open_by_path(path),
        }
        .or_fail("failed to access container")?;

        let classes = ClassTable::from_engine(engine.as_ref());
        let shared = ContainerShared {
            engine,
            target,
            poh,
            coh,
            config,
            classes,
            stats: ClientStats::new(),
            lifecycle: Mutex::new(Lifecycle::default()),
        };
        debug!(container = %shared, "container opened");
        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    pub(crate) fn shared(&self) -> &Arc<ContainerShared> {
        &self.shared
    }

    /// Requests close of the container.
    ///
    /// If no KV object opened from this container is still open, the pool
    /// and container bindings are released now. Otherwise the release is
    /// deferred until the last KV object is closed, and any failure is
    /// reported by that object's `close`.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `ProtocolViolation` if close was already requested
    /// - `Engine` if the engine reports a failed close; the container must
    ///   not be used afterwards
    pub fn close(&self) -> KvResult<CloseStatus> {
        self.shared.request_close()
    }

    /// Returns true until close has been requested.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.shared.lifecycle.lock().close_requested
    }

    /// Returns the number of KV objects currently open from this container.
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.shared.lifecycle.lock().live_objects
    }

    /// Returns the pool UUID, if the container was opened by id.
    #[must_use]
    pub fn pool_id(&self) -> Option<Uuid> {
        match self.shared.target {
            Target::Ids { pool, .. } => Some(pool),
            Target::Path(_) => None,
        }
    }

    /// Returns the container UUID, if the container was opened by id.
    #[must_use]
    pub fn container_id(&self) -> Option<Uuid> {
        match self.shared.target {
            Target::Ids { container, .. } => Some(container),
            Target::Path(_) => None,
        }
    }

    /// Returns the namespace path, if the container was opened by path.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.shared.target {
            Target::Path(path) => Some(path),
            Target::Ids { .. } => None,
        }
    }

    /// Returns the object classes exported by the engine.
    #[must_use]
    pub fn classes(&self) -> &ClassTable {
        &self.shared.classes
    }

    /// Returns the container configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Returns operation counters for this container and its KV objects.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Generates a new object ID, unique within this container.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolViolation` if the container is closed and `Engine`
    /// if generation fails.
    pub fn genoid(&self, class: ObjectClass) -> KvResult<ObjectId> {
        id::generate(self, class)
    }

    /// Allocates a new KV object of the default class and opens it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the engine does not export the default
    /// class, plus the errors of [`Container::newkv_with_class`].
    pub fn newkv(&self) -> KvResult<KvObject> {
        let class = self.default_class()?;
        self.newkv_with_class(class)
    }

    /// Allocates a new KV object of `class` and opens it.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolViolation` if the container is closed and `Engine`
    /// if generation or open fails.
    pub fn newkv_with_class(&self, class: ObjectClass) -> KvResult<KvObject> {
        let oid = self.genoid(class)?;
        self.kv(oid)
    }

    /// Opens an already allocated KV object.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolViolation` if the container is closed and `Engine`
    /// if the open fails. If close was requested meanwhile and this was the
    /// last reference, a failed container close is returned instead.
    pub fn kv(&self, oid: ObjectId) -> KvResult<KvObject> {
        let coh = self.shared.acquire()?;
        match self.shared.engine.object_open(coh, oid) {
            Ok(oh) => {
                self.shared.stats.record_open();
                debug!(container = %self.shared, %oid, "KV object opened");
                Ok(KvObject::new(oid, oh, Arc::clone(&self.shared)))
            }
            Err(status) => Err(self.shared.abandon_open(oid, status)),
        }
    }

    /// Opens the container's root KV object of the default class.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the engine does not export the default
    /// class, plus the errors of [`Container::rootkv_with_class`].
    pub fn rootkv(&self) -> KvResult<KvObject> {
        let class = self.default_class()?;
        self.rootkv_with_class(class)
    }

    /// Opens the container's root KV object of `class`.
    ///
    /// The class should stay the same across runs, since each class has its
    /// own root identifier.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolViolation` if the container is closed and `Engine`
    /// if the root id cannot be derived or opened.
    pub fn rootkv_with_class(&self, class: ObjectClass) -> KvResult<KvObject> {
        self.shared.ensure_open()?;
        let oid = id::root(self.shared.engine(), class)?;
        self.kv(oid)
    }

    fn default_class(&self) -> KvResult<ObjectClass> {
        self.shared.classes.resolve(&self.shared.config.default_class)
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.shared, f)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("target", &self.shared.target)
            .field("is_open", &self.is_open())
            .field("live_objects", &self.live_objects())
            .finish_non_exhaustive()
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if !self.is_open() {
            return;
        }
        if let Err(e) = self.shared.request_close() {
            warn!(container = %self.shared, error = %e, "failed to close container on drop");
        }
    }
}
