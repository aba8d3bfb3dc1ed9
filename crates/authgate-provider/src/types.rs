//! Shared identity types: who the principal is and what credential they hold.
//!
//! A *principal* is the identity-provider's view of the signed-in user.
//! An *identity token* is the short-lived credential attached to each
//! provider-backed call. The two are deliberately separate from the session
//! record (owned by `authgate-session`): the token expires in minutes and is
//! refreshed in-process, the session lives for days and is persisted.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a user, as issued by the identity provider.
///
/// Newtype over the provider's opaque string ID so a `UserId` can't be
/// confused with an email or a session ID in a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identity snapshot for the currently signed-in user.
///
/// Captured at sign-in time. The `role` may go stale relative to the
/// provider — it is re-validated on profile refresh, not owned here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub role: String,
}

// ---------------------------------------------------------------------------
// IdToken
// ---------------------------------------------------------------------------

/// A short-lived identity token issued by the provider.
///
/// The value is opaque to this system — it is forwarded on provider-backed
/// calls, never parsed. `expires_at` is advisory and drives early refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl IdToken {
    /// Returns `true` if the token expires within the given lookahead
    /// window (or has already expired).
    pub fn expires_within(&self, lookahead: Duration) -> bool {
        let window = TimeDelta::from_std(lookahead).unwrap_or(TimeDelta::MAX);
        self.expires_at - Utc::now() <= window
    }
}

// ---------------------------------------------------------------------------
// Auth-state transitions
// ---------------------------------------------------------------------------

/// Everything the sign-in surface knows at the moment of sign-in.
///
/// The device fingerprint (`ip_address`, `user_agent`) and the `remember_me`
/// choice only exist at the sign-in call site, so they travel with the
/// auth-state transition rather than living on the provider trait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignIn {
    pub principal: Principal,
    pub ip_address: String,
    pub user_agent: String,
    pub remember_me: bool,
}

/// An authentication-state transition observed from the identity provider.
///
/// The composition root subscribes to a stream of these and reacts: start
/// the session + refresh machinery on [`SignedIn`](AuthChange::SignedIn),
/// tear it down on [`SignedOut`](AuthChange::SignedOut).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChange {
    SignedIn(SignIn),
    SignedOut,
}

// =========================================================================
// Tests
// =========================================================================
