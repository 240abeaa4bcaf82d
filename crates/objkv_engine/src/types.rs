//! Identifier and handle types shared across the engine boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A 128-bit object identifier.
///
/// Object IDs are:
/// - Globally unique within a container once generated
/// - Immutable
/// - Copied by value
///
/// The printable form is `[0x<hi>:0x<lo>]`, and [`FromStr`] accepts the
/// same form back.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    hi: u64,
    lo: u64,
}

impl ObjectId {
    /// Creates an object ID from its high and low halves.
    #[inline]
    #[must_use]
    pub const fn new(hi: u64, lo: u64) -> Self {
        Self { hi, lo }
    }

    /// Returns the high 64 bits.
    #[inline]
    #[must_use]
    pub const fn hi(&self) -> u64 {
        self.hi
    }

    /// Returns the low 64 bits.
    #[inline]
    #[must_use]
    pub const fn lo(&self) -> u64 {
        self.lo
    }

    /// Returns the identifier as a single 128-bit value.
    #[must_use]
    pub const fn as_u128(&self) -> u128 {
        ((self.hi as u128) << 64) | self.lo as u128
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}:{:#x}]", self.hi, self.lo)
    }
}

/// Error returned when parsing an [`ObjectId`] from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid object id {input:?}: expected [0x<hi>:0x<lo>]")]
pub struct ParseObjectIdError {
    input: String,
}

impl FromStr for ObjectId {
    type Err = ParseObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseObjectIdError {
            input: s.to_string(),
        };
        let inner = s
            .trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(err)?;
        let (hi, lo) = inner.split_once(':').ok_or_else(err)?;
        let parse_half = |half: &str| {
            let digits = half
                .strip_prefix("0x")
                .or_else(|| half.strip_prefix("0X"))
                .unwrap_or(half);
            u64::from_str_radix(digits, 16).map_err(|_| err())
        };
        Ok(Self::new(parse_half(hi)?, parse_half(lo)?))
    }
}

/// An object class tag.
///
/// Classes select the redundancy scheme of a newly generated object. The
/// set of valid classes is exported by the engine at run time (see
/// [`crate::Engine::object_classes`]); this type carries no meaning beyond
/// the raw tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectClass(u16);

impl ObjectClass {
    /// Creates a class from its raw tag.
    #[must_use]
    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }

    /// Returns the raw tag.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "oc:{}", self.0)
    }
}

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw engine cookie.
            #[must_use]
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw engine cookie.
            #[must_use]
            pub const fn as_raw(self) -> u64 {
                self.0
            }
        }
    };
}

opaque_handle!(
    /// Opaque handle to an open pool binding.
    PoolHandle
);
opaque_handle!(
    /// Opaque handle to an open container binding.
    ContainerHandle
);
opaque_handle!(
    /// Opaque handle to an open object binding.
    ObjectHandle
);

/// Opaque continuation token for key enumeration.
///
/// Only the engine interprets the bytes. Callers hold on to the anchor
/// returned by one [`crate::Engine::kv_enumerate`] call and pass it back in
/// the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor(Vec<u8>);

impl Anchor {
    /// Wraps engine-defined anchor bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the raw anchor bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// One page of keys returned by [`crate::Engine::kv_enumerate`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyPage {
    /// Keys in this page, in engine order.
    pub keys: Vec<Vec<u8>>,
    /// Entry-count hint for the next call.
    pub count: u32,
    /// Byte-size hint for the next call.
    pub bytes: usize,
    /// Continuation anchor; `None` once the key space is exhausted.
    pub anchor: Option<Anchor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_bracketed_hex() {
        let oid = ObjectId::new(0xd6_0000_0000, 0x1f);
        assert_eq!(oid.to_string(), "[0xd600000000:0x1f]");
    }

    #[test]
    fn parse_display_form() {
        let oid = ObjectId::new(u64::MAX, 7);
        let parsed: ObjectId = oid.to_string().parse().unwrap();
        assert_eq!(parsed, oid);
    }

    #[test]
    fn parse_accepts_bare_hex() {
        let parsed: ObjectId = "[ff:10]".parse().unwrap();
        assert_eq!(parsed, ObjectId::new(0xff, 0x10));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("0x1:0x2".parse::<ObjectId>().is_err());
        assert!("[0x1]".parse::<ObjectId>().is_err());
        assert!("[0xzz:0x2]".parse::<ObjectId>().is_err());
    }

    #[test]
    fn ordering_follows_hi_then_lo() {
        let a = ObjectId::new(1, u64::MAX);
        let b = ObjectId::new(2, 0);
        assert!(a < b);
        assert!(a.as_u128() < b.as_u128());
    }

    #[test]
    fn handles_roundtrip_raw() {
        assert_eq!(ObjectHandle::from_raw(9).as_raw(), 9);
        assert_ne!(PoolHandle::from_raw(1), PoolHandle::from_raw(2));
    }
}
