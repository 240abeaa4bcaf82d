//! Classes command implementation.

use super::{load_store, CliResult, Target};
use objkv_core::ClassTable;
use serde::Serialize;

/// One exported object class.
#[derive(Debug, Serialize)]
pub struct ClassEntry {
    /// Class name.
    pub name: String,
    /// Numeric class id.
    pub id: u16,
}

/// Lists the object classes the store's engine exports.
pub fn run(target: &Target, format: &str) -> CliResult {
    let engine = load_store(&target.store)?;
    let entries: Vec<ClassEntry> = ClassTable::from_engine(engine.as_ref())
        .iter()
        .map(|(name, class)| ClassEntry {
            name: name.to_string(),
            id: class.as_u16(),
        })
        .collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
        _ => {
            for entry in &entries {
                println!("{:<16} {}", entry.name, entry.id);
            }
        }
    }
    Ok(())
}
