//! Object identifier allocation and the object class table.

use crate::container::Container;
use crate::error::{EngineResultExt, KvError, KvResult};
use objkv_engine::{Engine, ObjectClass, ObjectId};

/// The object classes exported by an engine, looked up by name.
///
/// The set is not fixed at compile time: it is read from
/// [`Engine::object_classes`] when a container is opened.
#[derive(Debug, Clone, Default)]
pub struct ClassTable {
    classes: Vec<(String, ObjectClass)>,
}

impl ClassTable {
    /// Reads the class table from an engine.
    pub fn from_engine(engine: &dyn Engine) -> Self {
        Self {
            classes: engine.object_classes(),
        }
    }

    /// Returns the class exported under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ObjectClass> {
        self.classes
            .iter()
            .find(|(known, _)| known == name)
            .map(|(_, class)| *class)
    }

    /// Returns the class exported under `name`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the engine exports no such class.
    pub fn resolve(&self, name: &str) -> KvResult<ObjectClass> {
        self.get(name)
            .ok_or_else(|| KvError::invalid_argument(format!("unknown object class {name:?}")))
    }

    /// Returns the name a class is exported under.
    #[must_use]
    pub fn name_of(&self, class: ObjectClass) -> Option<&str> {
        self.classes
            .iter()
            .find(|(_, known)| *known == class)
            .map(|(name, _)| name.as_str())
    }

    /// Iterates over `(name, class)` pairs in engine order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ObjectClass)> {
        self.classes
            .iter()
            .map(|(name, class)| (name.as_str(), *class))
    }

    /// Returns the number of exported classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns true if the engine exports no classes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Generates a new object identifier, unique within `container`.
///
/// # Errors
///
/// Returns `ProtocolViolation` if the container is closed and `Engine` if
/// the engine rejects the request.
pub fn generate(container: &Container, class: ObjectClass) -> KvResult<ObjectId> {
    let shared = container.shared();
    let coh = shared.ensure_open()?;
    shared
        .engine()
        .object_generate_id(coh, class)
        .or_fail("failed to generate object identifier")
}

/// Returns the well-known root object identifier for `class`.
///
/// The root identifier can be opened in any container without prior
/// generation; it names the container's implicit root KV store.
///
/// # Errors
///
/// Returns `Engine` if the engine rejects the class.
pub fn root(engine: &dyn Engine, class: ObjectClass) -> KvResult<ObjectId> {
    engine
        .object_root_id(class)
        .or_fail("failed to generate root object identifier")
}
