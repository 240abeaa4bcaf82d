//! Engine status codes.

use std::fmt;

/// Result type for engine gateway calls.
pub type EngineResult<T> = Result<T, Status>;

/// A status code returned by the storage engine.
///
/// [`Status::SUCCESS`] is the only code that means "no error". Every other
/// value is an opaque, engine-defined error code and must be passed through
/// unmodified so callers can diagnose failures across the boundary.
///
/// The named constants cover the codes the reference engine produces and the
/// ones commonly seen from a real cluster. Unknown codes are still valid
/// statuses; they just print without a symbolic name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Status(i32);

impl Status {
    /// Operation completed without error.
    pub const SUCCESS: Status = Status(0);
    /// No permission.
    pub const NO_PERM: Status = Status(-1001);
    /// Invalid handle.
    pub const NO_HDL: Status = Status(-1002);
    /// Invalid parameters.
    pub const INVAL: Status = Status(-1003);
    /// Entity already exists.
    pub const EXIST: Status = Status(-1004);
    /// Entity does not exist.
    pub const NONEXIST: Status = Status(-1005);
    /// No space on the storage target.
    pub const NOSPACE: Status = Status(-1007);
    /// Out of memory.
    pub const NOMEM: Status = Status(-1009);
    /// Function not implemented.
    pub const NOSYS: Status = Status(-1010);
    /// Timed out.
    pub const TIMEDOUT: Status = Status(-1011);
    /// Device or resource busy.
    pub const BUSY: Status = Status(-1012);
    /// Try again.
    pub const AGAIN: Status = Status(-1013);
    /// Not initialized.
    pub const UNINIT: Status = Status(-1015);
    /// Generic I/O error.
    pub const IO: Status = Status(-2001);
    /// Key is too large for the supplied buffer.
    pub const KEY2BIG: Status = Status(-2012);

    /// Wraps a raw engine code.
    #[inline]
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        Self(code)
    }

    /// Returns the raw engine code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Returns true for [`Status::SUCCESS`].
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Converts a raw code into a result: `Ok(())` for success,
    /// `Err(status)` for anything else.
    pub const fn check(code: i32) -> EngineResult<()> {
        if code == 0 {
            Ok(())
        } else {
            Err(Self(code))
        }
    }

    /// Returns the symbolic name of the code, if known.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0 => "DER_SUCCESS",
            -1001 => "DER_NO_PERM",
            -1002 => "DER_NO_HDL",
            -1003 => "DER_INVAL",
            -1004 => "DER_EXIST",
            -1005 => "DER_NONEXIST",
            -1007 => "DER_NOSPACE",
            -1009 => "DER_NOMEM",
            -1010 => "DER_NOSYS",
            -1011 => "DER_TIMEDOUT",
            -1012 => "DER_BUSY",
            -1013 => "DER_AGAIN",
            -1015 => "DER_UNINIT",
            -2001 => "DER_IO",
            -2012 => "DER_KEY2BIG",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status({self})")
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}({})", self.0),
            None => write!(f, "DER_UNKNOWN({})", self.0),
        }
    }
}

impl std::error::Error for Status {}

impl From<Status> for i32 {
    fn from(status: Status) -> Self {
        status.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_maps_zero_to_ok() {
        assert!(Status::check(0).is_ok());
        assert_eq!(Status::check(-1003), Err(Status::INVAL));
    }

    #[test]
    fn unknown_code_is_preserved() {
        let status = Status::from_code(-4242);
        assert_eq!(status.code(), -4242);
        assert!(status.name().is_none());
        assert_eq!(status.to_string(), "DER_UNKNOWN(-4242)");
    }

    #[test]
    fn display_uses_symbolic_name() {
        assert_eq!(Status::NONEXIST.to_string(), "DER_NONEXIST(-1005)");
        assert!(Status::SUCCESS.is_success());
        assert!(!Status::BUSY.is_success());
    }
}
