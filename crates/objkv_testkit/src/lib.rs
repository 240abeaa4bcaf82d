//! # objkv testkit
//!
//! Test utilities for objkv.
//!
//! This crate provides:
//! - [`InstrumentedEngine`], an engine wrapper that measures in-flight calls
//!   and injects failures
//! - Container fixtures and temporary snapshot stores
//! - Property-based test generators using proptest
//! - Stress helpers
//!
//! ## Usage
//!
//! ```rust
//! use objkv_testkit::prelude::*;
//!
//! let fixture = TestContainer::instrumented();
//! let kv = fixture.newkv().unwrap();
//! kv.put("k", "v").unwrap();
//! assert_eq!(fixture.engine.calls(EngineOp::KvPut), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod instrumented;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::instrumented::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use instrumented::*;
pub use stress::*;
