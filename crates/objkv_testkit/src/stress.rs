//! Stress helpers for objkv.
//!
//! These drive a KV object under heavy load and concurrent access.

use crate::generators::{query_for, random_kv_map};
use objkv_core::KvObject;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// What a stress run did, split by kind of call.
///
/// A bulk call counts once however many keys it carries; `keys_touched`
/// counts the keys.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StressReport {
    /// Single-key get, put and remove calls that succeeded.
    pub point_ok: usize,
    /// Single-key calls that failed.
    pub point_failed: usize,
    /// `bput`/`bget` calls that succeeded and read back what was written.
    pub bulk_ok: usize,
    /// Bulk calls that failed or read back something else.
    pub bulk_failed: usize,
    /// Keys carried by all bulk calls.
    pub keys_touched: usize,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl StressReport {
    /// Returns true if no call failed.
    pub fn is_clean(&self) -> bool {
        self.point_failed == 0 && self.bulk_failed == 0
    }

    /// Keys per second moved by bulk calls.
    pub fn bulk_keys_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.keys_touched as f64 / secs
        } else {
            0.0
        }
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Number of distinct keys touched.
    pub key_space: usize,
    /// Value size in bytes.
    pub value_size: usize,
    /// Seed for the per-thread random generators.
    pub seed: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 2_000,
            threads: 4,
            key_space: 256,
            value_size: 64,
            seed: 0x6f626a6b76,
        }
    }
}

/// Runs random gets, puts and deletes against one object from many threads.
pub fn stress_concurrent_mixed(kv: Arc<KvObject>, config: &StressConfig) -> StressReport {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let kv = Arc::clone(&kv);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let config = config.clone();

            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(t as u64));
                let value = vec![0xABu8; config.value_size.max(1)];

                for _ in 0..config.operations {
                    let key = format!("key-{:05}", rng.gen_range(0..config.key_space.max(1)));
                    let result = match rng.gen_range(0..3) {
                        0 => kv.put(&key, &value),
                        1 => kv.get(&key).map(|_| ()),
                        _ => kv.remove(&key),
                    };
                    match result {
                        Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Stress thread panicked");
    }

    StressReport {
        point_ok: successful.load(Ordering::Relaxed),
        point_failed: failed.load(Ordering::Relaxed),
        elapsed: start.elapsed(),
        ..StressReport::default()
    }
}

/// Writes and reads back `config.key_space` keys with one `bput` and one
/// `bget`, `config.operations` times.
pub fn stress_bulk_round_trips(kv: &KvObject, config: &StressConfig) -> StressReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut report = StressReport::default();
    let start = Instant::now();

    for _ in 0..config.operations {
        let batch = random_kv_map(&mut rng, config.key_space, config.value_size);
        let mut query = query_for(&batch);

        match kv.bput(&batch) {
            Ok(()) => report.bulk_ok += 1,
            Err(_) => {
                report.bulk_failed += 1;
                continue;
            }
        }
        match kv.bget(&mut query) {
            Ok(()) if query == batch => report.bulk_ok += 1,
            _ => report.bulk_failed += 1,
        }
        report.keys_touched += 2 * batch.len();
    }

    report.elapsed = start.elapsed();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestContainer;

    #[test]
    fn mixed_load_has_no_failures() {
        let fixture = TestContainer::memory();
        let kv = Arc::new(fixture.newkv().unwrap());
        let config = StressConfig {
            operations: 200,
            ..StressConfig::default()
        };

        let report = stress_concurrent_mixed(Arc::clone(&kv), &config);
        assert!(report.is_clean());
        assert_eq!(report.point_ok, 200 * config.threads);
        assert_eq!(report.bulk_ok, 0);
    }

    #[test]
    fn bulk_round_trips_agree() {
        let fixture = TestContainer::memory();
        let kv = fixture.newkv().unwrap();
        let config = StressConfig {
            operations: 5,
            key_space: 100,
            ..StressConfig::default()
        };

        let report = stress_bulk_round_trips(&kv, &config);
        assert!(report.is_clean());
        assert_eq!(report.bulk_ok, 10);
        assert_eq!(report.keys_touched, 1000);
        assert!(report.bulk_keys_per_second() > 0.0);
    }
}
