//! Error types for objkv core.

use objkv_engine::{EngineResult, Status};
use thiserror::Error;

/// Result type for core operations.
pub type KvResult<T> = Result<T, KvError>;

/// Errors that can occur in objkv core operations.
#[derive(Debug, Error)]
pub enum KvError {
    /// The caller supplied an invalid combination of arguments.
    ///
    /// Always detected locally, before any engine call.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// The engine returned a non-success status.
    #[error("{op}: {status}")]
    Engine {
        /// What was being attempted.
        op: &'static str,
        /// The engine status, unmodified.
        status: Status,
    },

    /// A handle or cursor was used outside its lifecycle.
    ///
    /// This is a programming error, not a recoverable condition.
    #[error("protocol violation: {message}")]
    ProtocolViolation {
        /// Description of the misuse.
        message: String,
    },

    /// A local runtime resource (such as the bulk worker pool) is unavailable.
    #[error("runtime error: {message}")]
    Runtime {
        /// Description of the failure.
        message: String,
    },
}

impl KvError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an engine error.
    pub fn engine(op: &'static str, status: Status) -> Self {
        Self::Engine { op, status }
    }

    /// Creates a protocol violation error.
    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
        }
    }

    /// Creates a runtime error.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    /// Returns the engine status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Engine { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if this error reports lifecycle misuse.
    #[must_use]
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation { .. })
    }
}

/// Attaches an operation description to an engine result.
pub(crate) trait EngineResultExt<T> {
    fn or_fail(self, op: &'static str) -> KvResult<T>;
}

impl<T> EngineResultExt<T> for EngineResult<T> {
    fn or_fail(self, op: &'static str) -> KvResult<T> {
        self.map_err(|status| KvError::engine(op, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_keeps_status() {
        let err = KvError::engine("failed to store KV value", Status::from_code(-7777));
        assert_eq!(err.status().map(Status::code), Some(-7777));
        assert_eq!(
            err.to_string(),
            "failed to store KV value: DER_UNKNOWN(-7777)"
        );
    }

    #[test]
    fn local_errors_have_no_status() {
        assert!(KvError::invalid_argument("x").status().is_none());
        assert!(KvError::protocol_violation("x").is_protocol_violation());
    }

    #[test]
    fn or_fail_wraps_status() {
        let result: EngineResult<()> = Err(Status::NONEXIST);
        let err = result.or_fail("failed to open object").unwrap_err();
        assert!(matches!(
            err,
            KvError::Engine {
                op: "failed to open object",
                status: Status::NONEXIST
            }
        ));
    }
}
