use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Callers match on these,
// never on the human-readable message string.

/// Stable error code constants.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const INVALID_TRANSITION: &str = "INVALID_TRANSITION";
    pub const BUSY: &str = "BUSY";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

// ── ServiceError ────────────────────────────────────────────────────

/// Unified error type for every controller in the admin core.
///
/// Errors are handled where they occur (the controller that issued the
/// store call); the message always names the attempted action, e.g.
/// `"create employee: storage unavailable"`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// Record does not exist at the given path.
    #[error("{0}")]
    NotFound(String),

    /// Input rejected before any store call (missing or bad field).
    #[error("{0}")]
    Validation(String),

    /// Status change not allowed from the record's current state.
    #[error("{0}")]
    InvalidTransition(String),

    /// A submit is already in flight for this form.
    #[error("{0}")]
    Busy(String),

    /// The current session's role may not perform the action.
    #[error("{0}")]
    PermissionDenied(String),

    /// Store rejected a read or write.
    #[error("{0}")]
    Storage(String),

    /// Unexpected internal error (encoding, invariant breach).
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => error_code::NOT_FOUND,
            ServiceError::Validation(_) => error_code::VALIDATION_FAILED,
            ServiceError::InvalidTransition(_) => error_code::INVALID_TRANSITION,
            ServiceError::Busy(_) => error_code::BUSY,
            ServiceError::PermissionDenied(_) => error_code::PERMISSION_DENIED,
            ServiceError::Storage(_) => error_code::STORAGE_ERROR,
            ServiceError::Internal(_) => error_code::INTERNAL,
        }
    }

    /// Prefix the message with the action that failed.
    ///
    /// Validation, transition and busy errors already describe the action
    /// and are returned unchanged.
    pub fn during(self, action: &str) -> Self {
        match self {
            ServiceError::NotFound(m) => ServiceError::NotFound(format!("{action}: {m}")),
            ServiceError::Storage(m) => ServiceError::Storage(format!("{action}: {m}")),
            ServiceError::Internal(m) => ServiceError::Internal(format!("{action}: {m}")),
            other => other,
        }
    }
}
