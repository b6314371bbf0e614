// Error handling module
// Defines the classified error taxonomy surfaced to callers

use thiserror::Error;

/// Fallback message for 403 responses when the backend supplies none.
/// Callers are guaranteed a non-empty, human-readable message.
pub const FORBIDDEN_FALLBACK_MESSAGE: &str =
    "You do not have permission to perform this action";

/// Generic fallback for responses that carry no message at all.
pub(crate) const GENERIC_FALLBACK_MESSAGE: &str = "The request could not be completed";

/// Classified errors surfaced by [`ApiClient::send`](crate::ApiClient::send).
///
/// `Unauthenticated` is the only kind the client recovers from on its own
/// (refresh-and-retry or anonymous retry); every other kind propagates
/// directly. Errors are `Clone` because a single refresh failure is
/// broadcast to every caller queued behind it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The session credential is missing, expired, or rejected (HTTP 401).
    #[error("authentication required: {message}")]
    Unauthenticated {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// The authenticated user may not perform this action (HTTP 403).
    #[error("access denied: {message}")]
    Forbidden {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// The requested resource does not exist (HTTP 404).
    #[error("not found: {message}")]
    NotFound {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// The backend rejected the request payload (HTTP 400).
    #[error("validation failed: {message}")]
    Validation {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// The request never produced a usable response (connect failure,
    /// timeout, or an unreadable body).
    #[error("network error ({kind}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    /// Anything the taxonomy does not cover.
    #[error("unexpected API error {status}: {message}")]
    Unknown {
        status: u16,
        code: Option<i64>,
        message: String,
    },
}

impl ApiError {
    /// The human-readable message, guaranteed non-empty.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Unauthenticated { message, .. }
            | ApiError::Forbidden { message, .. }
            | ApiError::NotFound { message, .. }
            | ApiError::Validation { message, .. }
            | ApiError::Network { message, .. }
            | ApiError::Unknown { message, .. } => message,
        }
    }

    /// The HTTP-level status (embedded or transport), when one exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthenticated { status, .. }
            | ApiError::Forbidden { status, .. }
            | ApiError::NotFound { status, .. }
            | ApiError::Validation { status, .. }
            | ApiError::Unknown { status, .. } => Some(*status),
            ApiError::Network { .. } => None,
        }
    }

    /// The backend business error code, when the envelope carried one.
    pub fn code(&self) -> Option<i64> {
        match self {
            ApiError::Unauthenticated { code, .. }
            | ApiError::Forbidden { code, .. }
            | ApiError::NotFound { code, .. }
            | ApiError::Validation { code, .. }
            | ApiError::Unknown { code, .. } => *code,
            ApiError::Network { .. } => None,
        }
    }
}

/// Sub-classification for transport-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The request or response timed out.
    Timeout,
    /// The connection could not be established.
    Connect,
    /// The response body could not be read or decoded.
    Decode,
    /// Any other transport failure.
    Other,
}

impl std::fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            NetworkErrorKind::Timeout => "timeout",
            NetworkErrorKind::Connect => "connection_failed",
            NetworkErrorKind::Decode => "decode_error",
            NetworkErrorKind::Other => "unknown",
        };
        f.write_str(label)
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;
