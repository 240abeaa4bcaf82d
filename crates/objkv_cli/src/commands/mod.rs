//! CLI command implementations.

pub mod classes;
pub mod entry;
pub mod init;
pub mod listing;
pub mod object;

use objkv_core::{Config, Container, ContainerLocator, KvObject, ObjectId};
use objkv_engine::InMemoryEngine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Result type for command implementations.
pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Which store and container a command works on.
#[derive(Debug, Clone)]
pub struct Target {
    /// Snapshot file.
    pub store: PathBuf,
    /// Pool UUID.
    pub pool: Option<Uuid>,
    /// Container UUID.
    pub cont: Option<Uuid>,
    /// Namespace path.
    pub path: Option<PathBuf>,
}

impl Target {
    fn locator(&self) -> ContainerLocator {
        ContainerLocator {
            pool: self.pool,
            container: self.cont,
            path: self.path.clone(),
        }
    }
}

/// Loads the engine from the snapshot file.
pub fn load_store(store: &Path) -> CliResult<Arc<InMemoryEngine>> {
    if !store.exists() {
        return Err(format!("No store found at {} (run `objkv init`)", store.display()).into());
    }
    let engine = InMemoryEngine::load(store)?;
    debug!(store = %store.display(), "store loaded");
    Ok(Arc::new(engine))
}

/// Opens the target container, runs `f`, closes the container, and saves
/// the store if `save` is set.
pub fn with_container<T>(
    target: &Target,
    save: bool,
    f: impl FnOnce(&Container) -> CliResult<T>,
) -> CliResult<T> {
    let engine = load_store(&target.store)?;
    let container = Container::open_with(engine.clone(), &target.locator(), Config::default())?;

    let value = f(&container)?;
    container.close()?;

    if save {
        engine.save(&target.store)?;
        debug!(store = %target.store.display(), "store saved");
    }
    Ok(value)
}

/// Opens the object named by `selector`: `root` for the root object of
/// the default class, otherwise an identifier as printed by `newkv`.
pub fn open_object(container: &Container, selector: &str) -> CliResult<KvObject> {
    if selector.eq_ignore_ascii_case("root") {
        return Ok(container.rootkv()?);
    }
    let oid: ObjectId = selector.parse()?;
    Ok(container.kv(oid)?)
}

/// Runs `f` on the object named by `selector` and closes it afterwards.
pub fn with_object<T>(
    target: &Target,
    selector: &str,
    save: bool,
    f: impl FnOnce(&KvObject) -> CliResult<T>,
) -> CliResult<T> {
    with_container(target, save, |container| {
        let kv = open_object(container, selector)?;
        let value = f(&kv)?;
        kv.close()?;
        Ok(value)
    })
}

/// Renders bytes for display.
pub fn show(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_store(dir: &TempDir) -> Target {
        let (pool, cont) = (Uuid::new_v4(), Uuid::new_v4());
        let engine = InMemoryEngine::new();
        engine.create_container(pool, cont);
        let store = dir.path().join("store.json");
        engine.save(&store).unwrap();
        Target {
            store,
            pool: Some(pool),
            cont: Some(cont),
            path: None,
        }
    }

    #[test]
    fn missing_store_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = load_store(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("No store found"));
    }

    #[test]
    fn saved_writes_are_visible_to_later_runs() {
        let dir = TempDir::new().unwrap();
        let target = init_store(&dir);

        with_object(&target, "root", true, |kv| Ok(kv.put("k", "v")?)).unwrap();
        let value = with_object(&target, "root", false, |kv| Ok(kv.get("k")?)).unwrap();
        assert_eq!(value, Some(b"v".to_vec()));
    }

    #[test]
    fn unsaved_writes_are_dropped() {
        let dir = TempDir::new().unwrap();
        let target = init_store(&dir);

        with_object(&target, "root", false, |kv| Ok(kv.put("k", "v")?)).unwrap();
        let len = with_object(&target, "root", false, |kv| Ok(kv.len()?)).unwrap();
        assert_eq!(len, 0);
    }

    #[test]
    fn object_selector_parses_identifiers() {
        let dir = TempDir::new().unwrap();
        let target = init_store(&dir);

        let oid = with_container(&target, true, |container| {
            let kv = container.newkv()?;
            kv.put("a", "1")?;
            let oid = kv.oid();
            kv.close()?;
            Ok(oid)
        })
        .unwrap();

        let value = with_object(&target, &oid.to_string(), false, |kv| Ok(kv.get("a")?)).unwrap();
        assert_eq!(value, Some(b"1".to_vec()));
        assert!(with_object(&target, "not-an-oid", false, |_| Ok(())).is_err());
    }

    #[test]
    fn missing_container_selection_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut target = init_store(&dir);
        target.cont = None;
        assert!(with_container(&target, false, |_| Ok(())).is_err());
    }
}
