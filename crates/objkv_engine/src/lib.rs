//! # objkv Engine
//!
//! Engine gateway trait, identifier types and reference engine for objkv.
//!
//! This crate is the lowest layer of objkv: the narrow synchronous boundary
//! to the storage engine that actually executes opens, closes, gets, puts
//! and key enumeration against a cluster.
//!
//! ## Design Principles
//!
//! - The engine is a black box behind the [`Engine`] trait
//! - Every failure is a [`Status`] code passed through unmodified
//! - Handles are opaque cookies; only the engine interprets them
//! - Must be `Send + Sync` for concurrent bulk operations
//!
//! ## Available Engines
//!
//! - [`InMemoryEngine`] - For testing, local tooling and ephemeral stores
//!
//! ## Example
//!
//! ```rust
//! use objkv_engine::{Engine, InMemoryEngine, ObjectClass};
//! use uuid::Uuid;
//!
//! let engine = InMemoryEngine::new();
//! let (pool, cont) = (Uuid::new_v4(), Uuid::new_v4());
//! engine.create_container(pool, cont);
//!
//! let (_poh, coh) = engine.pool_container_open(pool, cont).unwrap();
//! let oid = engine.object_generate_id(coh, ObjectClass::new(214)).unwrap();
//! let oh = engine.object_open(coh, oid).unwrap();
//! engine.kv_put(oh, b"key", b"value").unwrap();
//! assert_eq!(engine.kv_get(oh, b"key").unwrap(), Some(b"value".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod memory;
mod snapshot;
mod status;
mod types;

pub use engine::Engine;
pub use memory::{InMemoryEngine, DEFAULT_CLASSES};
pub use snapshot::{
    ContainerImage, EngineSnapshot, ObjectImage, PathBinding, SnapshotError, SnapshotResult,
};
pub use status::{EngineResult, Status};
pub use types::{
    Anchor, ContainerHandle, KeyPage, ObjectClass, ObjectHandle, ObjectId, ParseObjectIdError,
    PoolHandle,
};
