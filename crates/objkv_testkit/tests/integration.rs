//! End-to-end tests for objkv over the instrumented in-memory engine.

use objkv_core::{CloseStatus, Config, Container, ContainerLocator, KvError, KvMap, MAX_IN_FLIGHT};
use objkv_engine::{InMemoryEngine, Status};
use objkv_testkit::prelude::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn slow_fixture() -> TestContainer<InstrumentedEngine> {
    let fixture = TestContainer::instrumented();
    fixture
        .engine
        .set_latency(Duration::from_micros(200), Duration::from_micros(200));
    fixture
}

// ============================================================================
// Bulk concurrency bound
// ============================================================================

#[test]
fn bulk_calls_never_exceed_in_flight_bound() {
    let fixture = slow_fixture();
    let kv = fixture.newkv().unwrap();
    let batch = random_kv_map(&mut StdRng::seed_from_u64(1), 1000, 16);

    kv.bput(&batch).unwrap();
    assert_eq!(fixture.engine.calls(EngineOp::KvPut), 1000);
    let put_peak = fixture.engine.peak_in_flight();

    fixture.engine.reset_counters();
    let mut query = query_for(&batch);
    kv.bget(&mut query).unwrap();
    assert_eq!(fixture.engine.calls(EngineOp::KvGet), 1000);
    let get_peak = fixture.engine.peak_in_flight();

    assert_eq!(query, batch);
    assert!(put_peak <= MAX_IN_FLIGHT, "bput peak {put_peak}");
    assert!(get_peak <= MAX_IN_FLIGHT, "bget peak {get_peak}");
    assert!(put_peak > 1 && get_peak > 1, "bulk calls should overlap");
    assert_eq!(fixture.engine.in_flight(), 0);
}

#[test]
fn concurrent_bulk_callers_share_the_bound() {
    let fixture = slow_fixture();
    let kv = Arc::new(fixture.newkv().unwrap());

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let kv = Arc::clone(&kv);
            thread::spawn(move || {
                let batch = random_kv_map(&mut StdRng::seed_from_u64(t), 200, 8);
                kv.bput(&batch).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(fixture.engine.peak_in_flight() <= MAX_IN_FLIGHT);
}

// ============================================================================
// Failure propagation
// ============================================================================

#[test]
fn bulk_get_failure_surfaces_after_in_flight_calls_finish() {
    let fixture = slow_fixture();
    let kv = fixture.newkv().unwrap();
    let batch = random_kv_map(&mut StdRng::seed_from_u64(2), 1000, 8);
    kv.bput(&batch).unwrap();

    fixture.engine.fail_nth(EngineOp::KvGet, 50, Status::IO);
    let mut query = query_for(&batch);
    let err = kv.bget(&mut query).unwrap_err();

    assert!(matches!(
        err,
        KvError::Engine {
            status: Status::IO,
            ..
        }
    ));
    assert_eq!(fixture.engine.in_flight(), 0);
    assert!(fixture.engine.calls(EngineOp::KvGet) < 1000);
    assert!(query.values().all(Option::is_none), "map must be untouched");
}

#[test]
fn bulk_put_failure_carries_engine_status() {
    let fixture = TestContainer::instrumented();
    let kv = fixture.newkv().unwrap();
    fixture
        .engine
        .fail_always(EngineOp::KvRemove, Status::NOSPACE);

    let mut batch = KvMap::new();
    batch.insert(b"keep".to_vec(), Some(b"v".to_vec()));
    batch.insert(b"drop".to_vec(), None);

    let err = kv.bput(&batch).unwrap_err();
    assert_eq!(err.status(), Some(Status::NOSPACE));
    assert_eq!(fixture.engine.in_flight(), 0);
    assert!(fixture.stats().errors >= 1);
}

#[test]
fn point_failure_is_not_retried() {
    let fixture = TestContainer::instrumented();
    let kv = fixture.newkv().unwrap();
    fixture.engine.fail_nth(EngineOp::KvGet, 1, Status::TIMEDOUT);

    let err = kv.get("k").unwrap_err();
    assert_eq!(err.status(), Some(Status::TIMEDOUT));
    assert_eq!(fixture.engine.calls(EngineOp::KvGet), 1);
    assert_eq!(kv.get("k").unwrap(), None);
}

#[test]
fn enumeration_failure_poisons_cursor() {
    let fixture = TestContainer::instrumented_with(Config::default().page_entries(2));
    let kv = fixture.newkv().unwrap();
    for i in 0..10 {
        kv.put(format!("k{i}"), "v").unwrap();
    }
    fixture
        .engine
        .fail_nth(EngineOp::KvEnumerate, 2, Status::TIMEDOUT);

    let mut cursor = kv.keys();
    assert!(cursor.next().unwrap().is_ok());
    assert!(cursor.next().unwrap().is_ok());
    let err = cursor.next().unwrap().unwrap_err();
    assert_eq!(err.status(), Some(Status::TIMEDOUT));
    assert!(cursor.next().is_none());
    assert!(cursor.next_key().unwrap_err().is_protocol_violation());

    // A fresh cursor walks everything.
    assert_eq!(kv.len().unwrap(), 10);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn deferred_close_failure_surfaces_from_last_object() {
    let fixture = TestContainer::instrumented();
    let kv = fixture.newkv().unwrap();
    fixture
        .engine
        .fail_always(EngineOp::ContainerClose, Status::BUSY);

    assert_eq!(
        fixture.close().unwrap(),
        CloseStatus::Deferred { live_objects: 1 }
    );
    assert!(fixture.newkv().unwrap_err().is_protocol_violation());

    let err = kv.close().unwrap_err();
    assert!(matches!(
        err,
        KvError::Engine {
            op: "failed to close container",
            status: Status::BUSY
        }
    ));
    assert!(!kv.is_open());
}

#[test]
fn failed_container_close_outranks_failed_object_close() {
    let fixture = TestContainer::instrumented();
    let kv = fixture.newkv().unwrap();
    fixture.engine.fail_nth(EngineOp::ObjectClose, 1, Status::IO);
    fixture
        .engine
        .fail_always(EngineOp::ContainerClose, Status::BUSY);
    fixture.close().unwrap();

    let err = kv.close().unwrap_err();
    assert!(matches!(
        err,
        KvError::Engine {
            op: "failed to close container",
            status: Status::BUSY
        }
    ));
    assert_eq!(fixture.stats().errors, 2);
}

#[test]
fn failed_object_close_still_releases_container() {
    let fixture = TestContainer::instrumented();
    let kv = fixture.newkv().unwrap();
    fixture.engine.fail_nth(EngineOp::ObjectClose, 1, Status::IO);

    let err = kv.close().unwrap_err();
    assert_eq!(err.status(), Some(Status::IO));
    assert!(!kv.is_open());
    assert!(kv.get("k").unwrap_err().is_protocol_violation());
    assert_eq!(fixture.live_objects(), 0);
    assert_eq!(fixture.close().unwrap(), CloseStatus::Closed);
}

#[test]
fn failed_object_open_leaves_container_closable() {
    let fixture = TestContainer::instrumented();
    fixture
        .engine
        .fail_nth(EngineOp::ObjectOpen, 1, Status::NOMEM);

    let err = fixture.newkv().unwrap_err();
    assert_eq!(err.status(), Some(Status::NOMEM));
    assert_eq!(fixture.live_objects(), 0);
    assert_eq!(fixture.close().unwrap(), CloseStatus::Closed);
    assert_eq!(fixture.engine.inner().open_handle_count(), 0);
}

#[test]
fn container_open_failure_is_reported() {
    let engine = Arc::new(InstrumentedEngine::new());
    let (pool, cont) = (uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
    engine.inner().create_container(pool, cont);
    engine.fail_nth(EngineOp::ContainerOpen, 1, Status::NO_PERM);

    let err = Container::open(engine.clone(), pool, cont).unwrap_err();
    assert!(matches!(
        err,
        KvError::Engine {
            op: "failed to access container",
            status: Status::NO_PERM
        }
    ));
    assert!(Container::open(engine, pool, cont).is_ok());
}

// ============================================================================
// Scenarios and persistence
// ============================================================================

#[test]
fn root_object_survives_snapshot() {
    let store = TempStore::new();
    let engine = Arc::new(InMemoryEngine::new());
    let (pool, cont) = (uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
    engine.create_container(pool, cont);
    engine
        .register_path(Path::new("/objkv/scenario"), pool, cont)
        .unwrap();

    {
        let container = Container::open_by_path(engine.clone(), "/objkv/scenario").unwrap();
        let root = container.rootkv().unwrap();
        root.put("a", "1").unwrap();
        root.put("b", "2").unwrap();
        root.put("a", "").unwrap();
    }
    assert_eq!(engine.open_handle_count(), 0);
    store.save(&engine).unwrap();

    let reloaded = Arc::new(store.load().unwrap());
    let container = Container::open_with(
        reloaded,
        &ContainerLocator::path("/objkv/scenario"),
        Config::default(),
    )
    .unwrap();
    let root = container.rootkv().unwrap();
    let dump = root.dump().unwrap();

    assert_eq!(dump.len(), 1);
    assert_eq!(dump.get(b"b".as_slice()), Some(&Some(b"2".to_vec())));
}

#[test]
fn concurrent_mixed_load_is_clean() {
    let fixture = TestContainer::memory();
    let kv = Arc::new(fixture.newkv().unwrap());
    let config = StressConfig {
        operations: 500,
        threads: 8,
        ..StressConfig::default()
    };

    let report = stress_concurrent_mixed(Arc::clone(&kv), &config);
    assert!(report.is_clean());
    assert_eq!(report.point_ok, 500 * 8);
    assert!(kv.len().unwrap() <= config.key_space);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn put_then_get_round_trips(key in key_strategy(), value in value_strategy()) {
        let fixture = TestContainer::memory();
        let kv = fixture.newkv().unwrap();
        kv.put(&key, &value).unwrap();
        prop_assert_eq!(kv.get(&key).unwrap(), Some(value));
    }

    #[test]
    fn bulk_and_point_writes_agree(entries in kv_map_strategy(64)) {
        let fixture = TestContainer::instrumented();
        let bulk = fixture.newkv().unwrap();
        let point = fixture.newkv().unwrap();

        bulk.bput(&entries).unwrap();
        for (key, value) in &entries {
            point.put_opt(key, value.as_deref()).unwrap();
        }

        let mut fetched = query_for(&entries);
        bulk.bget(&mut fetched).unwrap();
        for (key, value) in &fetched {
            prop_assert_eq!(value, &point.get(key).unwrap());
        }
        prop_assert_eq!(bulk.dump().unwrap(), point.dump().unwrap());
        prop_assert!(fixture.engine.peak_in_flight() <= MAX_IN_FLIGHT);
    }

    #[test]
    fn walk_is_complete_for_any_page_hints(
        entries in kv_map_strategy(96),
        (page_entries, page_bytes) in page_hints_strategy(),
    ) {
        let config = Config::default().page_entries(page_entries).page_bytes(page_bytes);
        let fixture = TestContainer::memory_with(config);
        let kv = fixture.newkv().unwrap();
        kv.bput(&entries).unwrap();

        let stored: BTreeSet<Vec<u8>> = entries
            .iter()
            .filter(|(_, value)| value.as_ref().is_some_and(|v| !v.is_empty()))
            .map(|(key, _)| key.clone())
            .collect();

        let mut walked = Vec::new();
        for key in kv.keys() {
            walked.push(key.unwrap());
        }
        prop_assert_eq!(walked.len(), stored.len());
        prop_assert_eq!(walked.into_iter().collect::<BTreeSet<_>>(), stored);
    }
}
