//! Single-key commands.

use super::{show, with_object, CliResult, Target};

/// Stores `value` under `key`. An empty value deletes the key.
pub fn put(target: &Target, object: &str, key: &str, value: &str) -> CliResult {
    with_object(target, object, true, |kv| Ok(kv.put(key, value)?))
}

/// Prints the value stored under `key`.
pub fn get(target: &Target, object: &str, key: &str) -> CliResult {
    let value = with_object(target, object, false, |kv| Ok(kv.get(key)?))?;
    match value {
        Some(value) => {
            println!("{}", show(&value));
            Ok(())
        }
        None => Err(format!("Key {key:?} not found").into()),
    }
}

/// Deletes `key`.
pub fn del(target: &Target, object: &str, key: &str) -> CliResult {
    with_object(target, object, true, |kv| Ok(kv.remove(key)?))
}
