//! The identity-provider trait: the seam between this system and the
//! remote auth service.
//!
//! Authgate doesn't implement sign-in, token issuance, or password reset —
//! that's the provider's job (Firebase, Auth0, Keycloak, a custom backend).
//! This trait defines exactly what the orchestration layers need from it:
//! a way to sign in/out and a way to mint a fresh identity token on demand.
//!
//! In tests and the demo, small in-process implementations stand in for the
//! real provider, the same way a mock authenticator stands in for JWT
//! validation during development.

use chrono::{DateTime, Utc};

use crate::{IdToken, Principal, ProviderError};

/// Abstracts the remote identity provider.
///
/// # Trait bounds
///
/// - `Send + Sync` → shared across async tasks (the refresh schedule and
///   wrapped operations may call it from different tasks concurrently).
/// - `'static` → it doesn't borrow temporary data; it lives as long as the
///   composition root.
///
/// # Example
///
/// ```rust
/// use authgate_provider::{
///     IdToken, IdentityProvider, Principal, ProviderError, UserId,
/// };
/// use chrono::{TimeDelta, Utc};
///
/// /// Issues a fixed token for any credentials. Development only.
/// struct DevProvider;
///
/// impl IdentityProvider for DevProvider {
///     async fn sign_in(
///         &self,
///         email: &str,
///         _password: &str,
///     ) -> Result<Principal, ProviderError> {
///         Ok(Principal {
///             user_id: UserId(format!("dev-{email}")),
///             email: email.to_string(),
///             role: "customer".to_string(),
///         })
///     }
///
///     async fn sign_out(&self) -> Result<(), ProviderError> {
///         Ok(())
///     }
///
///     async fn fetch_id_token(
///         &self,
///         principal: &Principal,
///         _force_refresh: bool,
///     ) -> Result<IdToken, ProviderError> {
///         Ok(IdToken {
///             value: format!("dev-token-{}", principal.user_id),
///             expires_at: Utc::now() + TimeDelta::hours(1),
///         })
///     }
///
///     async fn token_expiry(
///         &self,
///         _principal: &Principal,
///     ) -> Result<Option<chrono::DateTime<Utc>>, ProviderError> {
///         Ok(None)
///     }
/// }
/// ```
pub trait IdentityProvider: Send + Sync + 'static {
    /// Authenticates with the provider and returns the principal.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<Principal, ProviderError>> + Send;

    /// Ends the provider-side authentication state.
    fn sign_out(
        &self,
    ) -> impl std::future::Future<Output = Result<(), ProviderError>> + Send;

    /// Requests an identity token for the principal.
    ///
    /// With `force_refresh = true` the provider must mint a fresh token
    /// rather than returning a cached one. This is the call the refresh
    /// coordinator serializes — at most one in flight per principal.
    fn fetch_id_token(
        &self,
        principal: &Principal,
        force_refresh: bool,
    ) -> impl std::future::Future<Output = Result<IdToken, ProviderError>> + Send;

    /// The expiry of the provider's currently cached token, if it knows one.
    ///
    /// Advisory — used for the early-refresh lookahead check. `None` means
    /// the provider can't say, and the coordinator falls back to its own
    /// bookkeeping.
    fn token_expiry(
        &self,
        principal: &Principal,
    ) -> impl std::future::Future<Output = Result<Option<DateTime<Utc>>, ProviderError>> + Send;
}
