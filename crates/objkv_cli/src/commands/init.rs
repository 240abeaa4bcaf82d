//! Init command implementation.

use super::{CliResult, Target};
use objkv_engine::InMemoryEngine;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Creates the store if it does not exist, then adds a pool/container pair.
///
/// The pair comes from `--pool`/`--cont` when given, otherwise fresh UUIDs
/// are generated.
pub fn run(target: &Target, register: Option<&Path>) -> CliResult {
    let engine = if target.store.exists() {
        InMemoryEngine::load(&target.store)?
    } else {
        info!(store = %target.store.display(), "creating new store");
        InMemoryEngine::new()
    };

    let pool = target.pool.unwrap_or_else(Uuid::new_v4);
    let cont = target.cont.unwrap_or_else(Uuid::new_v4);
    if !engine.create_container(pool, cont) {
        return Err(format!("Container {pool}:{cont} already exists").into());
    }
    if let Some(path) = register {
        engine.register_path(path, pool, cont)?;
    }
    engine.save(&target.store)?;

    println!("pool: {pool}");
    println!("cont: {cont}");
    if let Some(path) = register {
        println!("path: {}", path.display());
    }
    Ok(())
}
