//! Key space listing commands.

use super::{show, with_object, CliResult, Target};
use std::collections::BTreeMap;

/// Prints every key of the object, one per line.
pub fn keys(target: &Target, object: &str) -> CliResult {
    let mut keys = with_object(target, object, false, |kv| {
        let mut keys = Vec::new();
        for key in kv.keys() {
            keys.push(key?);
        }
        Ok(keys)
    })?;
    keys.sort();
    for key in &keys {
        println!("{}", show(key));
    }
    Ok(())
}

/// Prints every key and value of the object.
pub fn dump(target: &Target, object: &str, format: &str) -> CliResult {
    let map = with_object(target, object, false, |kv| Ok(kv.dump()?))?;

    // Keys deleted during the walk come back as `None` and are skipped.
    let entries: BTreeMap<String, String> = map
        .iter()
        .filter_map(|(key, value)| value.as_ref().map(|value| (show(key), show(value))))
        .collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
        _ => {
            for (key, value) in &entries {
                println!("{key} = {value}");
            }
        }
    }
    Ok(())
}

/// Prints the number of keys in the object.
pub fn len(target: &Target, object: &str) -> CliResult {
    let len = with_object(target, object, false, |kv| Ok(kv.len()?))?;
    println!("{len}");
    Ok(())
}
