//! Session record types: the data persisted per authenticated device.
//!
//! A "session" here is the durable record tracking one signed-in device or
//! browser instance. It is distinct from the identity token: the token is a
//! short-lived credential refreshed in-process, the session is a persisted
//! record with its own expiry and revocation state.

use std::fmt;

use authgate_provider::{Principal, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session lifetimes.
///
/// The expiry written into a new record depends on the `remember_me` choice
/// made at sign-in: a short default lifetime, or a long "remembered" one.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Lifetime (in seconds) for a session created with `remember_me =
    /// false`. Default: 86 400 (one day).
    pub default_lifetime_secs: u64,

    /// Lifetime (in seconds) for a session created with `remember_me =
    /// true`. Default: 2 592 000 (thirty days).
    pub remembered_lifetime_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_lifetime_secs: 86_400,
            remembered_lifetime_secs: 2_592_000,
        }
    }
}

impl SessionConfig {
    /// The lifetime applied for the given `remember_me` choice, in seconds.
    pub fn lifetime_secs(&self, remember_me: bool) -> u64 {
        if remember_me {
            self.remembered_lifetime_secs
        } else {
            self.default_lifetime_secs
        }
    }
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// An opaque unique session identifier, generated at creation, immutable.
///
/// 32 hex characters (128 bits of randomness) — guessing a valid ID is
/// computationally infeasible, which is what makes the locally persisted
/// reference safe to treat as a bearer of the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionRecord
// ---------------------------------------------------------------------------

/// One authenticated device/browser instance, as persisted in the store.
///
/// A record is either *active* (`!revoked` and not yet past `expires_at`)
/// or *invalid* — there is no third state. `revoked` is a one-way latch:
/// once set, validation must always fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque unique identifier. Immutable after creation.
    pub session_id: SessionId,

    /// Identity snapshot at creation time. The role may go stale; it is
    /// re-validated against the provider on profile refresh, not here.
    pub user_id: UserId,
    pub email: String,
    pub role: String,

    /// Device/network fingerprint captured at creation. Informational —
    /// used to spot anomalous reuse, not enforced as a hard binding.
    pub ip_address: String,
    pub user_agent: String,

    pub created_at: DateTime<Utc>,
    /// Refreshed on every successful validation.
    pub last_activity_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    /// Which lifetime policy was applied at creation.
    pub remember_me: bool,

    /// Set by explicit termination. Once true, always invalid.
    pub revoked: bool,
}

impl SessionRecord {
    /// The validity law: active iff not revoked and not yet expired.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }
}

// ---------------------------------------------------------------------------
// Validation outcome
// ---------------------------------------------------------------------------

/// Why a session failed validation.
///
/// These are normal result variants, not errors — callers branch on them.
/// Store transport failures are a separate `StoreError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// No record exists for the ID.
    NotFound,
    /// The record was explicitly revoked.
    Revoked,
    /// `expires_at` has passed.
    Expired,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NotFound"),
            Self::Revoked => write!(f, "Revoked"),
            Self::Expired => write!(f, "Expired"),
        }
    }
}

/// The outcome of validating a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// The session is active; the record has its activity timestamp
    /// already refreshed.
    Valid(SessionRecord),
    /// The session is invalid for the given reason.
    Invalid(InvalidReason),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// The validated record, if valid.
    pub fn session(&self) -> Option<&SessionRecord> {
        match self {
            Self::Valid(record) => Some(record),
            Self::Invalid(_) => None,
        }
    }

    /// The failure reason, if invalid.
    pub fn reason(&self) -> Option<InvalidReason> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid(reason) => Some(*reason),
        }
    }
}

/// Convenience for building a record from a principal snapshot.
///
/// Lives here (not on the manager) so test fixtures and stores can build
/// records without a manager in hand.
pub(crate) fn new_record(
    session_id: SessionId,
    principal: &Principal,
    ip_address: &str,
    user_agent: &str,
    remember_me: bool,
    lifetime_secs: u64,
    now: DateTime<Utc>,
) -> SessionRecord {
    SessionRecord {
        session_id,
        user_id: principal.user_id.clone(),
        email: principal.email.clone(),
        role: principal.role.clone(),
        ip_address: ip_address.to_string(),
        user_agent: user_agent.to_string(),
        created_at: now,
        last_activity_at: now,
        expires_at: now + chrono::TimeDelta::seconds(lifetime_secs as i64),
        remember_me,
        revoked: false,
    }
}

// =========================================================================
// Tests
// =========================================================================
