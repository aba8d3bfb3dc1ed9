//! Session management for Authgate.
//!
//! This crate handles the lifecycle of persisted session records:
//!
//! 1. **Creation** — one record per authenticated device/browser instance,
//!    bound to a device fingerprint and an expiry policy ([`SessionManager`])
//! 2. **Validation** — the active/invalid decision with a precise reason
//!    ([`Validation`], [`InvalidReason`])
//! 3. **Termination** — single-session revoke, "log out everywhere", and
//!    the expiry sweep
//!
//! The store itself is external: this crate only defines the
//! [`SessionStore`] boundary and ships [`MemoryStore`] for tests and demos.
//!
//! # How it fits in the stack
//!
//! ```text
//! Context Layer (above)  ← creates/terminates sessions on auth transitions
//!     ↕
//! Session Layer (this crate)  ← record lifecycle, validity law
//!     ↕
//! Provider Layer (below)  ← UserId, Principal
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod local;
mod manager;
mod record;
mod store;

pub use error::SessionError;
pub use local::{LocalSessionRef, MemorySessionRef};
pub use manager::{SessionManager, TerminateSummary};
pub use record::{InvalidReason, SessionConfig, SessionId, SessionRecord, Validation};
pub use store::{MemoryStore, SessionStore, StoreError};
