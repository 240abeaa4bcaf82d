//! Paginated key enumeration.
//!
//! A [`KeyCursor`] walks the key space of one KV object page by page. Each
//! refill is a single engine enumerate call carrying the continuation anchor
//! returned by the previous one; the engine reports the end of the key space
//! by returning no anchor.

use crate::error::{KvError, KvResult};
use crate::kv::KvObject;
use objkv_engine::Anchor;
use std::collections::VecDeque;
use std::iter::FusedIterator;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// More keys may be buffered or fetched.
    Active,
    /// End of sequence has been signalled; terminal.
    Exhausted,
    /// An engine call failed; terminal.
    Failed,
}

/// A forward-only, single-pass iterator over the keys of a KV object.
///
/// # Design
///
/// The cursor is an explicit state machine over:
/// - `buffer`: keys fetched but not yet yielded
/// - `anchor`: continuation token (`None` means "start of key space")
/// - `requested_count` / `requested_bytes`: page-size hints, which the
///   engine may adjust between calls
/// - `done`: set once the engine returns no anchor
///
/// Once end of sequence has been signalled every further call signals it
/// again. There is no restart: a new walk needs a new cursor.
///
/// # Consistency
///
/// The walk is best-effort. Every key present when the walk starts and not
/// deleted before its page is fetched is yielded exactly once; concurrent
/// inserts and deletes may or may not be observed.
///
/// # Example
///
/// ```rust,ignore
/// for key in kv.keys() {
///     let key = key?;
///     println!("{}", String::from_utf8_lossy(&key));
/// }
/// ```
pub struct KeyCursor<'a> {
    object: &'a KvObject,
    buffer: VecDeque<Vec<u8>>,
    anchor: Option<Anchor>,
    requested_count: u32,
    requested_bytes: usize,
    done: bool,
    phase: Phase,
    pages: usize,
}

impl<'a> KeyCursor<'a> {
    pub(crate) fn new(object: &'a KvObject, requested_count: u32, requested_bytes: usize) -> Self {
        Self {
            object,
            buffer: VecDeque::new(),
            anchor: None,
            requested_count,
            requested_bytes,
            done: false,
            phase: Phase::Active,
            pages: 0,
        }
    }

    /// Returns the next key, or `None` at end of sequence.
    ///
    /// # Errors
    ///
    /// Returns `Engine` if an enumerate call fails. After that the cursor is
    /// poisoned and every further call returns `ProtocolViolation`.
    pub fn next_key(&mut self) -> KvResult<Option<Vec<u8>>> {
        match self.phase {
            Phase::Exhausted => return Ok(None),
            Phase::Failed => {
                return Err(KvError::protocol_violation("cursor used after failure"));
            }
            Phase::Active => {}
        }

        if let Some(key) = self.buffer.pop_front() {
            return Ok(Some(key));
        }
        if self.done {
            self.phase = Phase::Exhausted;
            return Ok(None);
        }

        self.refill()?;

        match self.buffer.pop_front() {
            Some(key) => Ok(Some(key)),
            None => {
                // Empty key space, or an empty final page.
                self.phase = Phase::Exhausted;
                Ok(None)
            }
        }
    }

    fn refill(&mut self) -> KvResult<()> {
        let page = match self.object.enumerate_page(
            self.requested_count,
            self.requested_bytes,
            self.anchor.as_ref(),
        ) {
            Ok(page) => page,
            Err(e) => {
                self.phase = Phase::Failed;
                return Err(e);
            }
        };

        self.pages += 1;
        trace!(
            oid = %self.object.oid(),
            keys = page.keys.len(),
            count = page.count,
            bytes = page.bytes,
            last = page.anchor.is_none(),
            "fetched key page"
        );
        self.buffer.extend(page.keys);
        self.requested_count = page.count;
        self.requested_bytes = page.bytes;
        self.anchor = page.anchor;
        self.done = self.anchor.is_none();
        Ok(())
    }

    /// Returns true once end of sequence has been signalled.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.phase == Phase::Exhausted
    }

    /// Returns the number of enumerate calls issued so far.
    #[must_use]
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Returns the page-size hints for the next enumerate call.
    #[must_use]
    pub fn hints(&self) -> (u32, usize) {
        (self.requested_count, self.requested_bytes)
    }
}

impl Iterator for KeyCursor<'_> {
    type Item = KvResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.phase != Phase::Active {
            return None;
        }
        self.next_key().transpose()
    }
}

impl FusedIterator for KeyCursor<'_> {}

impl std::fmt::Debug for KeyCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCursor")
            .field("oid", &self.object.oid())
            .field("buffered", &self.buffer.len())
            .field("requested_count", &self.requested_count)
            .field("requested_bytes", &self.requested_bytes)
            .field("done", &self.done)
            .field("phase", &self.phase)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Config, Container, ContainerLocator, KvError};
    use objkv_engine::InMemoryEngine;
    use std::collections::HashSet;
    use std::sync::Arc;
    use uuid::Uuid;

    fn container_with(config: Config) -> Container {
        let engine = Arc::new(InMemoryEngine::new());
        let (pool, cont) = (Uuid::new_v4(), Uuid::new_v4());
        engine.create_container(pool, cont);
        Container::open_with(engine, &ContainerLocator::ids(pool, cont), config).unwrap()
    }

    #[test]
    fn empty_object_ends_immediately() {
        let container = container_with(Config::default());
        let kv = container.newkv().unwrap();
        let mut cursor = kv.keys();

        assert_eq!(cursor.next_key().unwrap(), None);
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.pages_fetched(), 1);
    }

    #[test]
    fn walks_all_pages() {
        let container = container_with(Config::default().page_entries(3));
        let kv = container.newkv().unwrap();
        for i in 0..10 {
            kv.put(format!("key{i:02}"), "v").unwrap();
        }

        let mut cursor = kv.keys();
        let keys: HashSet<Vec<u8>> = cursor.by_ref().map(Result::unwrap).collect();
        assert_eq!(keys.len(), 10);
        assert_eq!(cursor.pages_fetched(), 4);
    }

    #[test]
    fn exhaustion_is_terminal() {
        let container = container_with(Config::default());
        let kv = container.newkv().unwrap();
        kv.put("only", "v").unwrap();

        let mut cursor = kv.keys();
        assert_eq!(cursor.next_key().unwrap(), Some(b"only".to_vec()));
        assert_eq!(cursor.next_key().unwrap(), None);

        // New data does not resurrect an exhausted cursor.
        kv.put("later", "v").unwrap();
        assert_eq!(cursor.next_key().unwrap(), None);
        assert!(cursor.next().is_none());
        assert_eq!(cursor.pages_fetched(), 1);
    }

    #[test]
    fn failure_poisons_cursor() {
        let container = container_with(Config::default());
        let kv = container.newkv().unwrap();
        kv.put("k", "v").unwrap();

        let mut cursor = kv.keys();
        kv.close().unwrap();

        assert!(cursor.next_key().unwrap_err().is_protocol_violation());
        assert!(matches!(
            cursor.next_key(),
            Err(KvError::ProtocolViolation { .. })
        ));
        assert!(cursor.next().is_none());
    }

    #[test]
    fn engine_may_grow_byte_hint() {
        let container = container_with(Config::default().page_bytes(4));
        let kv = container.newkv().unwrap();
        kv.put("a-rather-long-key", "v").unwrap();

        let mut cursor = kv.keys();
        assert!(cursor.next_key().unwrap().is_some());
        assert_eq!(cursor.hints().1, "a-rather-long-key".len());
    }
}
