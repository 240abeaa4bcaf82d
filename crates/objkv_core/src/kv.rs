//! KV store objects.

use crate::bulk;
use crate::container::ContainerShared;
use crate::cursor::KeyCursor;
use crate::error::{KvError, KvResult};
use objkv_engine::{Anchor, KeyPage, ObjectHandle, ObjectId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Keys mapped to optional values, as used by bulk operations.
///
/// In [`KvObject::bput`] a `None` (or empty) value deletes the key. After
/// [`KvObject::bget`] a `None` value means the key does not exist.
pub type KvMap = HashMap<Vec<u8>, Option<Vec<u8>>>;

/// An open KV object.
///
/// Keys and values are opaque byte strings. A value can never be empty:
/// storing an empty value deletes the key instead.
///
/// A `KvObject` keeps its container's engine bindings alive until it is
/// closed, even if the container itself has already requested close.
pub struct KvObject {
    oid: ObjectId,
    oh: ObjectHandle,
    container: Arc<ContainerShared>,
    open: AtomicBool,
}

impl KvObject {
    pub(crate) fn new(oid: ObjectId, oh: ObjectHandle, container: Arc<ContainerShared>) -> Self {
        Self {
            oid,
            oh,
            container,
            open: AtomicBool::new(true),
        }
    }

    /// Returns the object identifier.
    #[must_use]
    pub fn oid(&self) -> ObjectId {
        self.oid
    }

    /// Returns true until the object has been closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Closes the object.
    ///
    /// The object is unusable afterwards even if the engine reports a failed
    /// close. If this was the last open object of a container whose close
    /// was deferred, the container is closed here too.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `ProtocolViolation` if the object is already closed
    /// - `Engine` if the object close, or the deferred container close, fails;
    ///   when both fail the container close error is returned
    pub fn close(&self) -> KvResult<()> {
        if !self.open.swap(false, Ordering::AcqRel) {
            return Err(KvError::protocol_violation(format!(
                "KV object {} is already closed",
                self.oid
            )));
        }
        self.shutdown()
    }

    fn shutdown(&self) -> KvResult<()> {
        let stats = self.container.stats();
        let closed = self.container.engine().object_close(self.oh);
        stats.record_close();
        let released = self.container.release();

        match closed {
            Ok(()) => {
                debug!(oid = %self.oid, "KV object closed");
                released
            }
            Err(status) => {
                stats.record_error();
                let close_error = KvError::engine("failed to close object", status);
                // A failed deferred container close is the one to report.
                if let Err(container_error) = released {
                    warn!(oid = %self.oid, error = %close_error, "object close failed");
                    return Err(container_error);
                }
                Err(close_error)
            }
        }
    }

    fn ensure_open(&self) -> KvResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(KvError::protocol_violation(format!(
                "KV object {} is closed",
                self.oid
            )))
        }
    }

    fn fetch(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        let stats = self.container.stats();
        stats.record_get();
        self.container.engine().kv_get(self.oh, key).map_err(|status| {
            stats.record_error();
            KvError::engine("failed to retrieve KV value", status)
        })
    }

    fn store(&self, key: &[u8], value: Option<&[u8]>) -> KvResult<()> {
        let stats = self.container.stats();
        let engine = self.container.engine();
        let result = match value {
            Some(value) if !value.is_empty() => {
                stats.record_put();
                engine.kv_put(self.oh, key, value)
            }
            _ => {
                stats.record_delete();
                engine.kv_remove(self.oh, key)
            }
        };
        result.map_err(|status| {
            stats.record_error();
            KvError::engine("failed to store KV value", status)
        })
    }

    /// Returns the value stored under `key`, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolViolation` if the object is closed and `Engine` if
    /// the fetch fails.
    pub fn get(&self, key: impl AsRef<[u8]>) -> KvResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        self.fetch(key.as_ref())
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// An empty value deletes the key.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolViolation` if the object is closed and `Engine` if
    /// the store fails.
    pub fn put(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> KvResult<()> {
        self.ensure_open()?;
        self.store(key.as_ref(), Some(value.as_ref()))
    }

    /// Stores `value` under `key`, or deletes the key if `value` is `None`
    /// or empty.
    ///
    /// # Errors
    ///
    /// Same as [`KvObject::put`].
    pub fn put_opt(&self, key: impl AsRef<[u8]>, value: Option<&[u8]>) -> KvResult<()> {
        self.ensure_open()?;
        self.store(key.as_ref(), value)
    }

    /// Deletes `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Same as [`KvObject::put`].
    pub fn remove(&self, key: impl AsRef<[u8]>) -> KvResult<()> {
        self.ensure_open()?;
        self.store(key.as_ref(), None)
    }

    /// Returns true if `key` exists.
    ///
    /// # Errors
    ///
    /// Same as [`KvObject::get`].
    pub fn contains(&self, key: impl AsRef<[u8]>) -> KvResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Fetches every key in `map` and overwrites its value with the stored
    /// value, or `None` if the key does not exist.
    ///
    /// The fetches run concurrently, at most [`crate::MAX_IN_FLIGHT`] at a
    /// time. The key set of `map` is preserved.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolViolation` if the object is closed and `Engine` if
    /// any fetch fails. On error `map` is left untouched.
    pub fn bget(&self, map: &mut KvMap) -> KvResult<()> {
        self.ensure_open()?;
        self.container.stats().record_bulk();

        let keys: Vec<Vec<u8>> = map.keys().cloned().collect();
        let values = bulk::fan_out(&keys, |key| self.fetch(key))?;

        debug!(oid = %self.oid, keys = keys.len(), "bulk get complete");
        for (key, value) in keys.into_iter().zip(values) {
            map.insert(key, value);
        }
        Ok(())
    }

    /// Applies every entry of `map`: a non-empty value is stored, a `None`
    /// or empty value deletes the key.
    ///
    /// The stores run concurrently, at most [`crate::MAX_IN_FLIGHT`] at a
    /// time, with no ordering between keys.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolViolation` if the object is closed and `Engine` if
    /// any store fails. After an error some entries may have been applied.
    pub fn bput(&self, map: &KvMap) -> KvResult<()> {
        self.ensure_open()?;
        self.container.stats().record_bulk();

        let entries: Vec<(&Vec<u8>, &Option<Vec<u8>>)> = map.iter().collect();
        bulk::fan_out(&entries, |(key, value)| self.store(key, value.as_deref()))?;

        debug!(oid = %self.oid, keys = entries.len(), "bulk put complete");
        Ok(())
    }

    /// Returns a cursor over every key in the object.
    ///
    /// Errors surface from the cursor, the first time it reaches the engine.
    pub fn keys(&self) -> KeyCursor<'_> {
        let config = self.container.config();
        KeyCursor::new(self, config.page_entries, config.page_bytes)
    }

    /// Reads the whole object into a map.
    ///
    /// This walks the key space and then fetches every key with one bulk
    /// get. The two phases are not atomic: a key deleted in between maps to
    /// `None`, and a key inserted in between is missing.
    ///
    /// # Errors
    ///
    /// Returns the first error from the walk or the bulk get.
    pub fn dump(&self) -> KvResult<KvMap> {
        let mut map = KvMap::new();
        for key in self.keys() {
            map.insert(key?, None);
        }
        self.bget(&mut map)?;
        Ok(map)
    }

    /// Returns the number of keys, by walking the key space.
    ///
    /// # Errors
    ///
    /// Returns the first error from the walk.
    pub fn len(&self) -> KvResult<usize> {
        let mut count = 0;
        for key in self.keys() {
            key?;
            count += 1;
        }
        Ok(count)
    }

    /// Returns true if the object holds no keys.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolViolation` if the object is closed and `Engine` if
    /// the first page cannot be fetched.
    pub fn is_empty(&self) -> KvResult<bool> {
        Ok(self.keys().next_key()?.is_none())
    }

    pub(crate) fn enumerate_page(
        &self,
        count: u32,
        bytes: usize,
        anchor: Option<&Anchor>,
    ) -> KvResult<KeyPage> {
        self.ensure_open()?;
        let stats = self.container.stats();
        stats.record_enumerate();
        self.container
            .engine()
            .kv_enumerate(self.oh, count, bytes, anchor)
            .map_err(|status| {
                stats.record_error();
                KvError::engine("failed to enumerate KV pair", status)
            })
    }
}

impl fmt::Display for KvObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.oid, f)
    }
}

impl fmt::Debug for KvObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvObject")
            .field("oid", &self.oid)
            .field("container", &format_args!("{}", self.container))
            .field("is_open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl Drop for KvObject {
    fn drop(&mut self) {
        if !self.open.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.shutdown() {
            warn!(oid = %self.oid, error = %e, "failed to close KV object on drop");
        }
    }
}
