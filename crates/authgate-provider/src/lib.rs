//! Identity-provider boundary for Authgate.
//!
//! This crate is the shared "leaf" of the workspace: the types that every
//! other crate speaks, plus the trait that abstracts the remote identity
//! provider. Nothing here does I/O — the provider itself (Firebase, Auth0,
//! Keycloak, a custom backend) lives outside this codebase and is reached
//! through the [`IdentityProvider`] trait.
//!
//! # How it fits in the stack
//!
//! ```text
//! Context Layer (above)   ← wires collaborators, reacts to auth changes
//!     ↕
//! Session / Refresh / Recovery (middle)  ← orchestration around the token
//!     ↕
//! Provider Layer (this crate)  ← Principal, IdToken, ErrorKind, the trait
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod provider;
mod types;

pub use error::{ErrorKind, ProviderError};
pub use provider::IdentityProvider;
pub use types::{AuthChange, IdToken, Principal, SignIn, UserId};
