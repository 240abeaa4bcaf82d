//! Property-based test generators using proptest.
//!
//! Keys are never empty, since the engine rejects empty keys. Values may be
//! empty or missing, both of which mean "delete" to a put.

use objkv_core::KvMap;
use proptest::prelude::*;
use rand::Rng;

/// Strategy for generating valid keys.
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..32)
}

/// Strategy for generating values that will be stored.
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..256)
}

/// Strategy for generating bulk put maps, including deletes.
pub fn kv_map_strategy(max_entries: usize) -> impl Strategy<Value = KvMap> {
    prop::collection::hash_map(
        key_strategy(),
        prop_oneof![
            3 => value_strategy().prop_map(Some),
            1 => Just(Some(Vec::new())),
            1 => Just(None),
        ],
        0..max_entries,
    )
}

/// Strategy for generating enumeration page-size hints `(entries, bytes)`.
pub fn page_hints_strategy() -> impl Strategy<Value = (u32, usize)> {
    (1u32..64, 1usize..512)
}

/// Builds a map of `count` distinct keys with random non-empty values.
///
/// Keys are `key-00000`, `key-00001`, and so on.
pub fn random_kv_map<R: Rng>(rng: &mut R, count: usize, value_len: usize) -> KvMap {
    (0..count)
        .map(|i| {
            let len = value_len.max(1);
            let value: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            (format!("key-{i:05}").into_bytes(), Some(value))
        })
        .collect()
}

/// Returns `map` with every value replaced by `None`, ready for a bulk get.
pub fn query_for(map: &KvMap) -> KvMap {
    map.keys().map(|key| (key.clone(), None)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn keys_are_never_empty(key in key_strategy()) {
            prop_assert!(!key.is_empty());
        }

        #[test]
        fn map_respects_bound(map in kv_map_strategy(16)) {
            prop_assert!(map.len() < 16);
        }
    }

    #[test]
    fn random_map_has_requested_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let map = random_kv_map(&mut rng, 100, 8);
        assert_eq!(map.len(), 100);
        assert!(map.values().all(|v| v.as_ref().map(Vec::len) == Some(8)));

        let query = query_for(&map);
        assert_eq!(query.len(), 100);
        assert!(query.values().all(Option::is_none));
    }
}
