//! # objkv core
//!
//! Client layer over an object-storage [`Engine`]: containers, KV objects,
//! bounded bulk operations, and paginated key enumeration.
//!
//! ## Ownership
//!
//! A [`Container`] binds a pool and a container. [`KvObject`]s opened from
//! it hold a counted reference to its interior, so the engine-level
//! container close is deferred until the last of them is closed.
//!
//! ## Example
//!
//! ```rust
//! use objkv_core::{Container, KvMap};
//! use objkv_engine::InMemoryEngine;
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! let engine = Arc::new(InMemoryEngine::new());
//! let (pool, cont) = (Uuid::new_v4(), Uuid::new_v4());
//! engine.create_container(pool, cont);
//!
//! let container = Container::open(engine, pool, cont).unwrap();
//! let kv = container.newkv().unwrap();
//!
//! let mut batch = KvMap::new();
//! batch.insert(b"x".to_vec(), Some(b"10".to_vec()));
//! batch.insert(b"y".to_vec(), None);
//! kv.bput(&batch).unwrap();
//!
//! assert_eq!(kv.get("x").unwrap(), Some(b"10".to_vec()));
//! assert_eq!(kv.len().unwrap(), 1);
//!
//! kv.close().unwrap();
//! container.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bulk;
mod config;
mod container;
mod cursor;
mod error;
pub mod id;
mod kv;
mod stats;

pub use bulk::MAX_IN_FLIGHT;
pub use config::Config;
pub use container::{CloseStatus, Container, ContainerLocator};
pub use cursor::KeyCursor;
pub use error::{KvError, KvResult};
pub use id::ClassTable;
pub use kv::{KvMap, KvObject};
pub use stats::{ClientStats, StatsSnapshot};

// Re-export engine types that appear in this crate's API.
pub use objkv_engine::{Engine, ObjectClass, ObjectId, Status};
