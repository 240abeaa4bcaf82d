//! Bounded fan-out for bulk KV operations.
//!
//! Bulk get/put issue one engine call per key. Calls run on a dedicated
//! worker pool of [`MAX_IN_FLIGHT`] threads shared by the whole process, so
//! no more than that many engine calls from bulk operations are ever
//! outstanding at once, however many keys a call carries.

use crate::error::{KvError, KvResult};
use rayon::prelude::*;
use std::sync::OnceLock;

/// Maximum number of engine calls a bulk operation keeps in flight.
///
/// This is a fixed implementation constant, not a tunable: it bounds the
/// load objkv puts on the engine.
pub const MAX_IN_FLIGHT: usize = 16;

fn bulk_pool() -> KvResult<&'static rayon::ThreadPool> {
    static POOL: OnceLock<Result<rayon::ThreadPool, String>> = OnceLock::new();
    POOL.get_or_init(|| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(MAX_IN_FLIGHT)
            .thread_name(|i| format!("objkv-bulk-{i}"))
            .build()
            .map_err(|e| e.to_string())
    })
    .as_ref()
    .map_err(|message| KvError::runtime(format!("bulk worker pool unavailable: {message}")))
}

/// Runs `op` over every item on the bulk pool and collects the results in
/// input order.
///
/// Once a call fails no further calls are started; calls already running
/// are always joined before this returns. The error returned is one of the
/// failures observed.
pub(crate) fn fan_out<T, R, F>(items: &[T], op: F) -> KvResult<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> KvResult<R> + Sync,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let pool = bulk_pool()?;
    pool.install(|| items.par_iter().map(&op).collect())
}
