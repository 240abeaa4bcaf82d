//! Engine gateway trait definition.

use crate::status::EngineResult;
use crate::types::{
    Anchor, ContainerHandle, KeyPage, ObjectClass, ObjectHandle, ObjectId, PoolHandle,
};
use std::path::Path;
use uuid::Uuid;

/// The synchronous call interface to the storage engine.
///
/// The engine owns everything that happens over the network: pool and
/// container connections, object I/O, and key enumeration. objkv only
/// governs the local view of handles and the access pattern.
///
/// # Invariants
///
/// - Every call blocks until the engine responds
/// - Any failure is reported as a non-success [`crate::Status`], never
///   silently ignored
/// - Handles returned by an `*_open` call stay valid until the matching
///   `*_close` call succeeds
/// - Implementations must be `Send + Sync`: independent point operations
///   are issued concurrently from several threads
///
/// # Implementors
///
/// - [`super::InMemoryEngine`] - Reference engine for tests and local use
pub trait Engine: Send + Sync {
    /// Connects to a pool and opens one of its containers.
    ///
    /// # Errors
    ///
    /// Returns the engine status if either the pool or the container cannot
    /// be opened.
    fn pool_container_open(
        &self,
        pool: Uuid,
        container: Uuid,
    ) -> EngineResult<(PoolHandle, ContainerHandle)>;

    /// Resolves a namespace path to a pool/container pair and opens it.
    ///
    /// # Errors
    ///
    /// Returns the engine status if the path does not resolve or the
    /// container cannot be opened.
    fn pool_container_open_by_path(
        &self,
        path: &Path,
    ) -> EngineResult<(PoolHandle, ContainerHandle)>;

    /// Closes a container and disconnects its pool.
    ///
    /// # Errors
    ///
    /// Returns the engine status if either release fails.
    fn container_close(&self, poh: PoolHandle, coh: ContainerHandle) -> EngineResult<()>;

    /// Returns the object classes this engine supports, by name.
    fn object_classes(&self) -> Vec<(String, ObjectClass)>;

    /// Generates a new object ID, unique within the container.
    ///
    /// # Errors
    ///
    /// Returns the engine status if the handle or class is invalid.
    fn object_generate_id(&self, coh: ContainerHandle, class: ObjectClass)
        -> EngineResult<ObjectId>;

    /// Returns the well-known root object ID for a class.
    ///
    /// # Errors
    ///
    /// Returns the engine status if the class is invalid.
    fn object_root_id(&self, class: ObjectClass) -> EngineResult<ObjectId>;

    /// Opens an object within a container.
    ///
    /// # Errors
    ///
    /// Returns the engine status if the container handle is invalid.
    fn object_open(&self, coh: ContainerHandle, oid: ObjectId) -> EngineResult<ObjectHandle>;

    /// Closes an object handle.
    ///
    /// # Errors
    ///
    /// Returns the engine status if the handle is invalid.
    fn object_close(&self, oh: ObjectHandle) -> EngineResult<()>;

    /// Fetches the value stored under `key`, or `None` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns the engine status if the fetch fails.
    fn kv_get(&self, oh: ObjectHandle, key: &[u8]) -> EngineResult<Option<Vec<u8>>>;

    /// Inserts or replaces the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns the engine status if the update fails.
    fn kv_put(&self, oh: ObjectHandle, key: &[u8], value: &[u8]) -> EngineResult<()>;

    /// Removes `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns the engine status if the punch fails.
    fn kv_remove(&self, oh: ObjectHandle, key: &[u8]) -> EngineResult<()>;

    /// Lists the next page of keys after `anchor`.
    ///
    /// `anchor` is `None` for the first call. The returned page carries the
    /// hints and anchor to use for the next call; its anchor is `None` once
    /// the key space has been fully listed.
    ///
    /// # Arguments
    ///
    /// * `count` - Maximum number of keys wanted in this page
    /// * `bytes` - Maximum total key bytes wanted in this page
    /// * `anchor` - Continuation anchor from the previous page
    ///
    /// # Errors
    ///
    /// Returns the engine status if the listing fails.
    fn kv_enumerate(
        &self,
        oh: ObjectHandle,
        count: u32,
        bytes: usize,
        anchor: Option<&Anchor>,
    ) -> EngineResult<KeyPage>;
}
