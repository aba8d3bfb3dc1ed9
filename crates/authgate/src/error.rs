//! Unified error type for the Authgate meta-crate.

use authgate_provider::ProviderError;
use authgate_session::{SessionError, StoreError};

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `authgate` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum AuthgateError {
    /// A session lifecycle error (missing record, store failure).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A session-store transport error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An identity-provider error, carrying its taxonomy classification.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
