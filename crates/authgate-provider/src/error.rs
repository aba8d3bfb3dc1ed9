//! Error taxonomy for provider-backed operations.
//!
//! Provider failures arrive pre-classified by provider-specific string codes
//! ("permission-denied", "unavailable", ...). [`ErrorKind::classify`] maps
//! those codes into this system's fixed taxonomy so that recovery logic
//! branches on data, never on provider-specific exception shapes.

use std::fmt;

/// Classification of a provider-backed failure.
///
/// The recovery wrapper keys its behavior entirely off this enum:
/// - [`is_refresh_recoverable`](ErrorKind::is_refresh_recoverable) kinds are
///   retried after a forced token refresh.
/// - [`is_transient`](ErrorKind::is_transient) kinds are surfaced as "try
///   again" — retrying them is the caller's own business, not the refresh
///   path's.
/// - Everything else is surfaced immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No active principal. Only re-sign-in can fix this.
    Unauthenticated,

    /// The principal lacks rights for this resource *as currently known*.
    /// Treated as a potentially stale credential — the primary trigger for
    /// forced refresh + retry.
    PermissionDenied,

    /// The credential was explicitly expired or revoked server-side.
    /// Same recovery path as `PermissionDenied`.
    TokenExpiredOrRevoked,

    /// Transient network transport failure.
    NetworkUnavailable,

    /// Transient session-store transport failure.
    StoreUnavailable,

    /// A write conflicted with concurrent state. Not fixable by refresh.
    ResourceConflict,

    /// The resource doesn't exist. Not fixable by refresh.
    NotFound,

    /// The request itself was malformed. Not fixable by refresh.
    InvalidArgument,

    /// Quota or rate limit exhausted. Not fixable by refresh.
    ResourceExhausted,

    /// Anything that matched no known pattern. Surfaced with a generic
    /// message — never silently swallowed.
    Unknown,
}

impl ErrorKind {
    /// Maps a provider-specific error code into the taxonomy.
    ///
    /// Unrecognized codes become [`ErrorKind::Unknown`].
    pub fn classify(code: &str) -> Self {
        match code {
            "unauthenticated" => Self::Unauthenticated,
            "permission-denied" => Self::PermissionDenied,
            "token-expired" | "token-revoked" | "id-token-expired" | "id-token-revoked" => {
                Self::TokenExpiredOrRevoked
            }
            "unavailable" | "network-request-failed" | "deadline-exceeded" => {
                Self::NetworkUnavailable
            }
            "aborted" | "already-exists" => Self::ResourceConflict,
            "not-found" => Self::NotFound,
            "invalid-argument" => Self::InvalidArgument,
            "resource-exhausted" => Self::ResourceExhausted,
            _ => Self::Unknown,
        }
    }

    /// Returns `true` if a forced token refresh + retry may resolve this.
    pub fn is_refresh_recoverable(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::TokenExpiredOrRevoked)
    }

    /// Returns `true` for transient transport failures the caller may
    /// simply retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkUnavailable | Self::StoreUnavailable)
    }

    /// The user-facing message for this kind of failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "Please sign in to continue.",
            Self::PermissionDenied => "You don't have permission to do that.",
            Self::TokenExpiredOrRevoked => "Your session credential expired. Please try again.",
            Self::NetworkUnavailable | Self::StoreUnavailable => {
                "Connection problem. Please check your network and try again."
            }
            Self::ResourceConflict => "That change conflicted with another update. Please retry.",
            Self::NotFound => "The requested item could not be found.",
            Self::InvalidArgument => "The request was invalid.",
            Self::ResourceExhausted => "Too many requests. Please wait a moment and try again.",
            Self::Unknown => "Something went wrong. Please try again.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::PermissionDenied => "permission-denied",
            Self::TokenExpiredOrRevoked => "token-expired-or-revoked",
            Self::NetworkUnavailable => "network-unavailable",
            Self::StoreUnavailable => "store-unavailable",
            Self::ResourceConflict => "resource-conflict",
            Self::NotFound => "not-found",
            Self::InvalidArgument => "invalid-argument",
            Self::ResourceExhausted => "resource-exhausted",
            Self::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// A failure from the identity provider or a provider-backed resource,
/// carrying its taxonomy classification.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    kind: ErrorKind,
    message: String,
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Builds an error from a provider-specific code, classifying it.
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::classify(code), message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_codes() {
        assert_eq!(
            ErrorKind::classify("permission-denied"),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            ErrorKind::classify("id-token-expired"),
            ErrorKind::TokenExpiredOrRevoked
        );
        assert_eq!(
            ErrorKind::classify("token-revoked"),
            ErrorKind::TokenExpiredOrRevoked
        );
        assert_eq!(
            ErrorKind::classify("unavailable"),
            ErrorKind::NetworkUnavailable
        );
        assert_eq!(ErrorKind::classify("not-found"), ErrorKind::NotFound);
        assert_eq!(
            ErrorKind::classify("unauthenticated"),
            ErrorKind::Unauthenticated
        );
    }

    #[test]
    fn test_classify_unknown_code_is_unknown() {
        assert_eq!(ErrorKind::classify("fly-to-moon"), ErrorKind::Unknown);
        assert_eq!(ErrorKind::classify(""), ErrorKind::Unknown);
    }

    #[test]
    fn test_refresh_recoverable_kinds() {
        assert!(ErrorKind::PermissionDenied.is_refresh_recoverable());
        assert!(ErrorKind::TokenExpiredOrRevoked.is_refresh_recoverable());
        assert!(!ErrorKind::Unauthenticated.is_refresh_recoverable());
        assert!(!ErrorKind::NotFound.is_refresh_recoverable());
        assert!(!ErrorKind::NetworkUnavailable.is_refresh_recoverable());
        assert!(!ErrorKind::Unknown.is_refresh_recoverable());
    }

    #[test]
    fn test_transient_kinds() {
        assert!(ErrorKind::NetworkUnavailable.is_transient());
        assert!(ErrorKind::StoreUnavailable.is_transient());
        assert!(!ErrorKind::PermissionDenied.is_transient());
    }

    #[test]
    fn test_every_kind_has_a_user_message() {
        // A blank message would surface an empty toast.
        let kinds = [
            ErrorKind::Unauthenticated,
            ErrorKind::PermissionDenied,
            ErrorKind::TokenExpiredOrRevoked,
            ErrorKind::NetworkUnavailable,
            ErrorKind::StoreUnavailable,
            ErrorKind::ResourceConflict,
            ErrorKind::NotFound,
            ErrorKind::InvalidArgument,
            ErrorKind::ResourceExhausted,
            ErrorKind::Unknown,
        ];
        for kind in kinds {
            assert!(!kind.user_message().is_empty(), "{kind} has no message");
        }
    }

    #[test]
    fn test_provider_error_display_includes_kind() {
        let err = ProviderError::from_code("permission-denied", "no access to orders");
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert!(err.to_string().contains("permission-denied"));
        assert!(err.to_string().contains("no access to orders"));
    }
}
