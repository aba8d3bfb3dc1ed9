//! Error types for the session layer.

use crate::{SessionId, StoreError};

/// Errors from session lifecycle operations.
///
/// Invalid-session outcomes (revoked, expired, absent) from *validation*
/// are not errors — see [`Validation`](crate::Validation). This enum covers
/// the cases where an operation itself cannot proceed.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The store could not be reached. Transient; the caller may retry.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operation targeted a session that doesn't exist.
    /// Terminal for that session — the caller must treat it as
    /// "not authenticated".
    #[error("session {0} not found")]
    NotFound(SessionId),
}
