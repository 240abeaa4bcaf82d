//! An engine wrapper that measures concurrency and injects faults.
//!
//! [`InstrumentedEngine`] forwards every call to an inner engine. Along the
//! way it can:
//! - count calls per [`EngineOp`]
//! - track how many KV data calls (get, put, remove) are in flight at once,
//!   and the peak of that number
//! - add latency (with optional random jitter) to KV data calls, so that
//!   concurrent calls actually overlap
//! - fail chosen calls with a chosen [`Status`]
//!
//! A fault on a close call is reported after the inner close has run, so
//! the wrapped engine never keeps a handle the caller considers gone.

use objkv_engine::{
    Anchor, ContainerHandle, Engine, EngineResult, InMemoryEngine, KeyPage, ObjectClass,
    ObjectHandle, ObjectId, PoolHandle, Status,
};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use uuid::Uuid;

/// The engine calls an [`InstrumentedEngine`] distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    /// `pool_container_open` and `pool_container_open_by_path`.
    ContainerOpen,
    /// `container_close`.
    ContainerClose,
    /// `object_generate_id`.
    GenerateId,
    /// `object_open`.
    ObjectOpen,
    /// `object_close`.
    ObjectClose,
    /// `kv_get`.
    KvGet,
    /// `kv_put`.
    KvPut,
    /// `kv_remove`.
    KvRemove,
    /// `kv_enumerate`.
    KvEnumerate,
}

impl EngineOp {
    fn is_data(self) -> bool {
        matches!(self, Self::KvGet | Self::KvPut | Self::KvRemove)
    }
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Nth(usize),
    Always,
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    op: EngineOp,
    trigger: Trigger,
    status: Status,
}

#[derive(Debug, Clone, Copy, Default)]
struct Latency {
    base: Duration,
    jitter: Duration,
}

/// Decrements the in-flight counter when a data call returns.
struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Wraps an engine with call accounting and fault injection.
///
/// # Example
///
/// ```rust
/// use objkv_engine::Status;
/// use objkv_testkit::{EngineOp, InstrumentedEngine};
///
/// let engine = InstrumentedEngine::new();
/// engine.fail_nth(EngineOp::KvGet, 3, Status::IO);
/// assert_eq!(engine.peak_in_flight(), 0);
/// ```
pub struct InstrumentedEngine<E = InMemoryEngine> {
    inner: E,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    calls: Mutex<HashMap<EngineOp, usize>>,
    latency: Mutex<Latency>,
    faults: Mutex<Vec<Fault>>,
}

impl InstrumentedEngine<InMemoryEngine> {
    /// Wraps a fresh [`InMemoryEngine`].
    pub fn new() -> Self {
        Self::wrap(InMemoryEngine::new())
    }
}

impl Default for InstrumentedEngine<InMemoryEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Engine> InstrumentedEngine<E> {
    /// Wraps an existing engine.
    pub fn wrap(inner: E) -> Self {
        Self {
            inner,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            calls: Mutex::new(HashMap::new()),
            latency: Mutex::new(Latency::default()),
            faults: Mutex::new(Vec::new()),
        }
    }

    /// Returns the wrapped engine.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Delays every KV data call by `base` plus a random share of `jitter`.
    pub fn set_latency(&self, base: Duration, jitter: Duration) {
        *self.latency.lock() = Latency { base, jitter };
    }

    /// Fails the `nth` call (1-based, counted from creation) of `op`.
    pub fn fail_nth(&self, op: EngineOp, nth: usize, status: Status) {
        self.faults.lock().push(Fault {
            op,
            trigger: Trigger::Nth(nth),
            status,
        });
    }

    /// Fails every later call of `op`.
    pub fn fail_always(&self, op: EngineOp, status: Status) {
        self.faults.lock().push(Fault {
            op,
            trigger: Trigger::Always,
            status,
        });
    }

    /// Removes all injected faults.
    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    /// Returns how many calls of `op` have been made.
    pub fn calls(&self, op: EngineOp) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    /// Returns the number of KV data calls currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Returns the highest number of KV data calls ever in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Resets the peak and the call counts.
    pub fn reset_counters(&self) {
        self.peak_in_flight.store(0, Ordering::SeqCst);
        self.calls.lock().clear();
    }

    fn enter_data_call(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight {
            counter: &self.in_flight,
        }
    }

    fn delay(&self) {
        let latency = *self.latency.lock();
        let mut pause = latency.base;
        if !latency.jitter.is_zero() {
            let jitter_us = u64::try_from(latency.jitter.as_micros()).unwrap_or(u64::MAX);
            pause += Duration::from_micros(rand::thread_rng().gen_range(0..=jitter_us));
        }
        if !pause.is_zero() {
            thread::sleep(pause);
        }
    }

    /// Counts the call and returns the injected status, if any.
    fn check(&self, op: EngineOp) -> EngineResult<()> {
        let nth = {
            let mut calls = self.calls.lock();
            let count = calls.entry(op).or_insert(0);
            *count += 1;
            *count
        };
        let faults = self.faults.lock();
        let hit = faults.iter().find(|fault| {
            fault.op == op
                && match fault.trigger {
                    Trigger::Nth(n) => n == nth,
                    Trigger::Always => true,
                }
        });
        match hit {
            Some(fault) => Err(fault.status),
            None => Ok(()),
        }
    }

    fn data_call<T>(&self, op: EngineOp, call: impl FnOnce() -> EngineResult<T>) -> EngineResult<T> {
        debug_assert!(op.is_data());
        let _guard = self.enter_data_call();
        self.delay();
        self.check(op)?;
        call()
    }
}

impl<E: Engine> Engine for InstrumentedEngine<E> {
    fn pool_container_open(
        &self,
        pool: Uuid,
        container: Uuid,
    ) -> EngineResult<(PoolHandle, ContainerHandle)> {
        self.check(EngineOp::ContainerOpen)?;
        self.inner.pool_container_open(pool, container)
    }

    fn pool_container_open_by_path(
        &self,
        path: &Path,
    ) -> EngineResult<(PoolHandle, ContainerHandle)> {
        self.check(EngineOp::ContainerOpen)?;
        self.inner.pool_container_open_by_path(path)
    }

    fn container_close(&self, poh: PoolHandle, coh: ContainerHandle) -> EngineResult<()> {
        let closed = self.inner.container_close(poh, coh);
        self.check(EngineOp::ContainerClose)?;
        closed
    }

    fn object_classes(&self) -> Vec<(String, ObjectClass)> {
        self.inner.object_classes()
    }

    fn object_generate_id(&self, coh: ContainerHandle, class: ObjectClass) -> EngineResult<ObjectId> {
        self.check(EngineOp::GenerateId)?;
        self.inner.object_generate_id(coh, class)
    }

    fn object_root_id(&self, class: ObjectClass) -> EngineResult<ObjectId> {
        self.inner.object_root_id(class)
    }

    fn object_open(&self, coh: ContainerHandle, oid: ObjectId) -> EngineResult<ObjectHandle> {
        self.check(EngineOp::ObjectOpen)?;
        self.inner.object_open(coh, oid)
    }

    fn object_close(&self, oh: ObjectHandle) -> EngineResult<()> {
        let closed = self.inner.object_close(oh);
        self.check(EngineOp::ObjectClose)?;
        closed
    }

    fn kv_get(&self, oh: ObjectHandle, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        self.data_call(EngineOp::KvGet, || self.inner.kv_get(oh, key))
    }

    fn kv_put(&self, oh: ObjectHandle, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.data_call(EngineOp::KvPut, || self.inner.kv_put(oh, key, value))
    }

    fn kv_remove(&self, oh: ObjectHandle, key: &[u8]) -> EngineResult<()> {
        self.data_call(EngineOp::KvRemove, || self.inner.kv_remove(oh, key))
    }

    fn kv_enumerate(
        &self,
        oh: ObjectHandle,
        count: u32,
        bytes: usize,
        anchor: Option<&Anchor>,
    ) -> EngineResult<KeyPage> {
        self.check(EngineOp::KvEnumerate)?;
        self.inner.kv_enumerate(oh, count, bytes, anchor)
    }
}

impl<E> std::fmt::Debug for InstrumentedEngine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentedEngine")
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .field("peak_in_flight", &self.peak_in_flight.load(Ordering::SeqCst))
            .field("faults", &self.faults.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_object(engine: &InstrumentedEngine) -> ObjectHandle {
        let (pool, cont) = (Uuid::new_v4(), Uuid::new_v4());
        engine.inner().create_container(pool, cont);
        let (_, coh) = engine.pool_container_open(pool, cont).unwrap();
        let oid = engine.object_generate_id(coh, ObjectClass::new(214)).unwrap();
        engine.object_open(coh, oid).unwrap()
    }

    #[test]
    fn forwards_and_counts() {
        let engine = InstrumentedEngine::new();
        let oh = open_object(&engine);

        engine.kv_put(oh, b"k", b"v").unwrap();
        assert_eq!(engine.kv_get(oh, b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(engine.calls(EngineOp::KvPut), 1);
        assert_eq!(engine.calls(EngineOp::KvGet), 1);
        assert_eq!(engine.calls(EngineOp::ObjectOpen), 1);
        assert_eq!(engine.peak_in_flight(), 1);
        assert_eq!(engine.in_flight(), 0);
    }

    #[test]
    fn nth_fault_fires_once() {
        let engine = InstrumentedEngine::new();
        let oh = open_object(&engine);
        engine.fail_nth(EngineOp::KvGet, 2, Status::IO);

        assert!(engine.kv_get(oh, b"k").is_ok());
        assert_eq!(engine.kv_get(oh, b"k"), Err(Status::IO));
        assert!(engine.kv_get(oh, b"k").is_ok());
        assert_eq!(engine.in_flight(), 0);
    }

    #[test]
    fn always_fault_until_cleared() {
        let engine = InstrumentedEngine::new();
        let oh = open_object(&engine);
        engine.fail_always(EngineOp::KvPut, Status::BUSY);

        assert_eq!(engine.kv_put(oh, b"k", b"v"), Err(Status::BUSY));
        assert_eq!(engine.kv_put(oh, b"k", b"v"), Err(Status::BUSY));
        engine.clear_faults();
        assert!(engine.kv_put(oh, b"k", b"v").is_ok());
    }

    #[test]
    fn close_fault_still_releases_handle() {
        let engine = InstrumentedEngine::new();
        let oh = open_object(&engine);
        engine.fail_nth(EngineOp::ObjectClose, 1, Status::IO);

        assert_eq!(engine.object_close(oh), Err(Status::IO));
        assert_eq!(engine.object_close(oh), Err(Status::NO_HDL));
    }
}
