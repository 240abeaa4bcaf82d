//! Client configuration.

use crate::error::{KvError, KvResult};

/// Configuration for opening a container.
///
/// The bulk concurrency bound is not configurable; see
/// [`crate::MAX_IN_FLIGHT`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of keys requested per enumeration page. Must be at least 1.
    pub page_entries: u32,

    /// Key bytes requested per enumeration page.
    pub page_bytes: usize,

    /// Name of the object class used by `newkv()` and `rootkv()`.
    pub default_class: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_entries: 256,
            page_bytes: 4096, // sized for ~16-byte keys
            default_class: "OC_SX".to_string(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of keys requested per enumeration page.
    ///
    /// Zero is raised to 1.
    #[must_use]
    pub const fn page_entries(mut self, entries: u32) -> Self {
        self.page_entries = if entries == 0 { 1 } else { entries };
        self
    }

    /// Sets the key bytes requested per enumeration page.
    #[must_use]
    pub const fn page_bytes(mut self, bytes: usize) -> Self {
        self.page_bytes = bytes;
        self
    }

    /// Sets the default object class by name.
    #[must_use]
    pub fn default_class(mut self, name: impl Into<String>) -> Self {
        self.default_class = name.into();
        self
    }

    /// Checks values that can only have been set through the public fields.
    pub(crate) fn validate(&self) -> KvResult<()> {
        if self.page_entries == 0 {
            return Err(KvError::invalid_argument(
                "page_entries must be at least 1",
            ));
        }
        Ok(())
    }
}
