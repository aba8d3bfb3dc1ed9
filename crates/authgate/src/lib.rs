//! # Authgate
//!
//! Client-side authenticated-session lifecycle: persistent sessions,
//! background identity-token refresh, and taxonomy-driven error recovery.
//!
//! The host application implements five small seams — an identity
//! provider, a session store, a local session reference, a notification
//! sink, and a navigator — and Authgate orchestrates everything between
//! sign-in and sign-out.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use authgate::prelude::*;
//!
//! // Implement IdentityProvider, SessionStore, LocalSessionRef,
//! // NotificationSink and Navigator for your platform, then:
//! // let context = SessionContext::new(
//! //     provider, store, local, sink, navigator, ContextConfig::default(),
//! // );
//! // context.handle_auth_change(AuthChange::SignedIn(sign_in)).await?;
//! ```

mod context;
mod error;

pub use context::{AppEvent, ContextConfig, SessionContext};
pub use error::AuthgateError;

/// One-stop imports for applications built on Authgate.
pub mod prelude {
    pub use authgate_provider::{
        AuthChange, ErrorKind, IdToken, IdentityProvider, Principal, ProviderError, SignIn,
        UserId,
    };
    pub use authgate_recovery::{
        Navigator, NotificationSink, Recovery, RecoveryOptions, Severity,
    };
    pub use authgate_refresh::{
        RefreshConfig, RefreshEvent, RefreshOutcome, TokenRefreshCoordinator,
    };
    pub use authgate_session::{
        InvalidReason, LocalSessionRef, MemorySessionRef, MemoryStore, SessionConfig,
        SessionError, SessionId, SessionManager, SessionRecord, SessionStore, StoreError,
        TerminateSummary, Validation,
    };

    pub use crate::{AppEvent, AuthgateError, ContextConfig, SessionContext};
}
