//! Error types for the FSM harness
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Taxonomy
//!
//! - `ConfigError`: malformed workload configuration, detected before any
//!   worker starts
//! - `CommandError`: a `{ok: 0, code, errmsg}` reply from the database under
//!   test; whether it is expected is decided by the workload's classifier
//! - `HarnessError::Assertion`: a workload assertion that did not hold
//! - Everything else (I/O, parse, panics) is unexpected

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for harness operations
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

/// Result type alias for calls against the database under test
pub type CommandResult<T> = std::result::Result<T, CommandError>;

/// Numeric server error code
///
/// The constants use the numeric codes of the document database the
/// harness drives, so allowlists written against a real server and against
/// the in-memory backend are interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// Generic internal failure
    pub const INTERNAL_ERROR: ErrorCode = ErrorCode(1);
    /// Malformed request
    pub const BAD_VALUE: ErrorCode = ErrorCode(2);
    /// Lock acquisition timed out
    pub const LOCK_TIMEOUT: ErrorCode = ErrorCode(24);
    /// Database or collection does not exist
    pub const NAMESPACE_NOT_FOUND: ErrorCode = ErrorCode(26);
    /// Named index does not exist
    pub const INDEX_NOT_FOUND: ErrorCode = ErrorCode(27);
    /// Type mismatch while applying an operation
    pub const TYPE_MISMATCH: ErrorCode = ErrorCode(14);
    /// Cursor was killed or expired
    pub const CURSOR_NOT_FOUND: ErrorCode = ErrorCode(43);
    /// Command name not recognised
    pub const COMMAND_NOT_FOUND: ErrorCode = ErrorCode(59);
    /// Index with this name already exists with different options
    pub const INDEX_OPTIONS_CONFLICT: ErrorCode = ErrorCode(85);
    /// Collection already exists
    pub const NAMESPACE_EXISTS: ErrorCode = ErrorCode(48);
    /// Network timeout talking to a node
    pub const NETWORK_TIMEOUT: ErrorCode = ErrorCode(89);
    /// Concurrent write conflict
    pub const WRITE_CONFLICT: ErrorCode = ErrorCode(112);
    /// Transaction was aborted or never existed
    pub const NO_SUCH_TRANSACTION: ErrorCode = ErrorCode(251);
    /// Operation was interrupted
    pub const INTERRUPTED: ErrorCode = ErrorCode(11601);
    /// Unique index violation
    pub const DUPLICATE_KEY: ErrorCode = ErrorCode(11000);
    /// Routing table is stale
    pub const STALE_CONFIG: ErrorCode = ErrorCode(13388);

    /// Symbolic name for well-known codes
    pub fn name(&self) -> &'static str {
        match *self {
            ErrorCode::INTERNAL_ERROR => "InternalError",
            ErrorCode::BAD_VALUE => "BadValue",
            ErrorCode::LOCK_TIMEOUT => "LockTimeout",
            ErrorCode::NAMESPACE_NOT_FOUND => "NamespaceNotFound",
            ErrorCode::INDEX_NOT_FOUND => "IndexNotFound",
            ErrorCode::TYPE_MISMATCH => "TypeMismatch",
            ErrorCode::CURSOR_NOT_FOUND => "CursorNotFound",
            ErrorCode::COMMAND_NOT_FOUND => "CommandNotFound",
            ErrorCode::INDEX_OPTIONS_CONFLICT => "IndexOptionsConflict",
            ErrorCode::NAMESPACE_EXISTS => "NamespaceExists",
            ErrorCode::NETWORK_TIMEOUT => "NetworkTimeout",
            ErrorCode::WRITE_CONFLICT => "WriteConflict",
            ErrorCode::NO_SUCH_TRANSACTION => "NoSuchTransaction",
            ErrorCode::INTERRUPTED => "Interrupted",
            ErrorCode::DUPLICATE_KEY => "DuplicateKey",
            ErrorCode::STALE_CONFIG => "StaleConfig",
            _ => "UnknownError",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

/// Error label attached by the server to transient transaction failures
pub const TRANSIENT_TRANSACTION_ERROR: &str = "TransientTransactionError";

/// A failed command reply from the database under test
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("command failed with {code}: {message}")]
pub struct CommandError {
    /// Server error code
    pub code: ErrorCode,
    /// Human readable message (`errmsg`)
    pub message: String,
    /// Error labels, e.g. `TransientTransactionError`
    pub labels: Vec<String>,
}

impl CommandError {
    /// Create an error with no labels
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        CommandError {
            code,
            message: message.into(),
            labels: Vec::new(),
        }
    }

    /// Attach an error label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Check whether the reply carries the given label
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// Malformed workload configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `thread_count` must be at least one
    #[error("workload '{workload}': thread_count must be >= 1")]
    ZeroThreads {
        /// Workload name
        workload: String,
    },

    /// No states were defined
    #[error("workload '{workload}': no states defined")]
    NoStates {
        /// Workload name
        workload: String,
    },

    /// `start_state` is not a key of `states`
    #[error("workload '{workload}': start state '{state}' is not a defined state")]
    UnknownStartState {
        /// Workload name
        workload: String,
        /// The missing start state
        state: String,
    },

    /// A transition row exists for a state that is not defined
    #[error("workload '{workload}': transitions defined for unknown state '{state}'")]
    UnknownTransitionSource {
        /// Workload name
        workload: String,
        /// The undefined source state
        state: String,
    },

    /// A transition targets a state that is not defined
    #[error("workload '{workload}': transition '{from}' -> '{to}' targets an unknown state")]
    DanglingTransition {
        /// Workload name
        workload: String,
        /// Source state
        from: String,
        /// Missing target state
        to: String,
    },

    /// A transition weight is negative or not finite
    #[error("workload '{workload}': transition '{from}' -> '{to}' has invalid weight {weight}")]
    InvalidWeight {
        /// Workload name
        workload: String,
        /// Source state
        from: String,
        /// Target state
        to: String,
        /// Offending weight, rendered
        weight: String,
    },

    /// A state's usable weights overflow when summed
    #[error("workload '{workload}': weights out of '{from}' sum to {total}")]
    InvalidWeightSum {
        /// Workload name
        workload: String,
        /// Source state
        from: String,
        /// The sum, rendered
        total: String,
    },

    /// Workload name not present in the registry
    #[error("unknown workload '{0}'")]
    UnknownWorkload(String),

    /// Modifier name not present in the registry
    #[error("unknown workload modifier '{0}'")]
    UnknownModifier(String),

    /// Harness or manifest setting out of range
    #[error("invalid setting '{key}': {reason}")]
    InvalidSetting {
        /// Setting name
        key: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Error types for the FSM harness
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Workload configuration is malformed
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database command failed
    #[error(transparent)]
    Command(#[from] CommandError),

    /// A workload assertion did not hold
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// A worker thread panicked
    #[error("worker panicked: {0}")]
    Panic(String),

    /// The run was cancelled before this operation completed
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// I/O error (manifest discovery, config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Manifest or config file could not be parsed
    #[error("parse error in {path}: {message}")]
    Parse {
        /// File that failed to parse
        path: String,
        /// Parser message
        message: String,
    },
}

impl HarnessError {
    /// Create an assertion failure
    pub fn assertion(msg: impl Into<String>) -> Self {
        HarnessError::Assertion(msg.into())
    }

    /// Server error code, when this error came from a command reply
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            HarnessError::Command(e) => Some(e.code),
            _ => None,
        }
    }

    /// The command reply, when this error came from one
    pub fn as_command(&self) -> Option<&CommandError> {
        match self {
            HarnessError::Command(e) => Some(e),
            _ => None,
        }
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, HarnessError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::DUPLICATE_KEY.to_string(), "DuplicateKey(11000)");
        assert_eq!(ErrorCode(424242).to_string(), "UnknownError(424242)");
    }

    #[test]
    fn test_command_error_display() {
        let err = CommandError::new(ErrorCode::WRITE_CONFLICT, "conflict on doc 7");
        let msg = err.to_string();
        assert!(msg.contains("WriteConflict"));
        assert!(msg.contains("conflict on doc 7"));
    }

    #[test]
    fn test_command_error_labels() {
        let err = CommandError::new(ErrorCode::NO_SUCH_TRANSACTION, "txn gone")
            .with_label(TRANSIENT_TRANSACTION_ERROR);
        assert!(err.has_label(TRANSIENT_TRANSACTION_ERROR));
        assert!(!err.has_label("RetryableWriteError"));
    }

    #[test]
    fn test_harness_error_from_command() {
        let err: HarnessError = CommandError::new(ErrorCode::DUPLICATE_KEY, "dup").into();
        assert_eq!(err.code(), Some(ErrorCode::DUPLICATE_KEY));
        assert!(err.as_command().is_some());
        assert!(!err.is_config());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::DanglingTransition {
            workload: "w".to_string(),
            from: "a".to_string(),
            to: "zzz".to_string(),
        };
        let msg = HarnessError::from(err).to_string();
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("'a' -> 'zzz'"));
    }

    #[test]
    fn test_assertion_has_no_code() {
        let err = HarnessError::assertion("count mismatch");
        assert_eq!(err.code(), None);
        assert!(err.to_string().contains("count mismatch"));
    }
}
