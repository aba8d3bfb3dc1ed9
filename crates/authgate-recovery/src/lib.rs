//! Error recovery for provider-backed operations.
//!
//! Wraps a fallible operation and reacts to its failure *classification*
//! ([`ErrorKind`]), never to provider-specific exception shapes:
//!
//! - `PermissionDenied` / `TokenExpiredOrRevoked` → the credential is
//!   probably stale. Force a token refresh, wait for server-side
//!   propagation, re-invoke.
//! - Transient transport kinds → surface as "try again" at warning
//!   severity. The wrapper does not retry these; when to re-attempt a
//!   network call is the caller's decision.
//! - Everything else → surface immediately with the taxonomy's user-facing
//!   message.
//!
//! The wrapper talks to the user through two small ports, [`NotificationSink`]
//! and [`Navigator`], so the host application decides what a toast or a
//! login screen actually is.

use std::sync::Arc;
use std::time::Duration;

use authgate_provider::{ErrorKind, IdentityProvider, Principal, ProviderError};
use authgate_refresh::{RefreshOutcome, TokenRefreshCoordinator};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// How loud a user-facing notification should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational ("You're back online").
    Info,
    /// Transient trouble; the user can simply retry.
    Warning,
    /// The operation failed for real.
    Error,
}

/// Delivers user-facing messages (toast, snackbar, log line).
pub trait NotificationSink: Send + Sync + 'static {
    fn notify(&self, message: &str, severity: Severity);
}

/// Moves the user to the sign-in surface when authentication is gone.
pub trait Navigator: Send + Sync + 'static {
    fn redirect_to_login(&self);
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Per-call recovery tuning.
#[derive(Debug, Clone)]
pub struct RecoveryOptions {
    /// Budget of recoverable failures before surfacing. With the default of
    /// 2, a failed call is retried once after a refresh; a second failure
    /// surfaces.
    pub max_retries: u32,
    /// How long to wait after a refresh before re-invoking, giving the new
    /// credential time to propagate server-side.
    pub propagation_delay: Duration,
    /// Sent at [`Severity::Info`] when a retry succeeds after a silent
    /// recovery. `None` keeps the recovery fully silent.
    pub success_notice: Option<String>,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            max_retries: 2,
            propagation_delay: Duration::from_secs(1),
            success_notice: None,
        }
    }
}

impl RecoveryOptions {
    pub fn with_success_notice(mut self, notice: impl Into<String>) -> Self {
        self.success_notice = Some(notice.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Recovery wrapper
// ---------------------------------------------------------------------------

/// Wraps provider-backed operations with refresh-and-retry recovery.
///
/// Cheap to clone. Holds a coordinator clone (sharing its single-flight
/// state), a notification sink, and a navigator.
pub struct Recovery<P: IdentityProvider, N, V> {
    coordinator: TokenRefreshCoordinator<P>,
    sink: Arc<N>,
    navigator: Arc<V>,
}

impl<P: IdentityProvider, N, V> Clone for Recovery<P, N, V> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            sink: Arc::clone(&self.sink),
            navigator: Arc::clone(&self.navigator),
        }
    }
}

impl<P, N, V> Recovery<P, N, V>
where
    P: IdentityProvider,
    N: NotificationSink,
    V: Navigator,
{
    pub fn new(
        coordinator: TokenRefreshCoordinator<P>,
        sink: Arc<N>,
        navigator: Arc<V>,
    ) -> Self {
        Self {
            coordinator,
            sink,
            navigator,
        }
    }

    /// Runs `operation`, recovering from stale-credential failures.
    ///
    /// The counter counts recoverable *failures*: with `max_retries = 2`
    /// the operation runs at most twice — the initial call plus one
    /// post-refresh retry.
    pub async fn execute<T, F, Fut>(
        &self,
        principal: &Principal,
        mut operation: F,
        options: &RecoveryOptions,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut failures = 0u32;
        let mut recovered = false;

        loop {
            match operation().await {
                Ok(value) => {
                    if recovered {
                        info!("operation succeeded after credential recovery");
                        if let Some(notice) = &options.success_notice {
                            self.sink.notify(notice, Severity::Info);
                        }
                    }
                    return Ok(value);
                }
                Err(error) if error.kind().is_refresh_recoverable() => {
                    failures += 1;
                    if failures >= options.max_retries {
                        warn!(
                            kind = %error.kind(),
                            failures,
                            "recovery budget exhausted — surfacing"
                        );
                        self.surface(&error);
                        return Err(error);
                    }

                    debug!(kind = %error.kind(), "stale credential suspected — forcing refresh");
                    match self.coordinator.refresh_now(principal).await {
                        RefreshOutcome::Refreshed(_) | RefreshOutcome::AlreadyInFlight => {
                            tokio::time::sleep(options.propagation_delay).await;
                            recovered = true;
                        }
                        RefreshOutcome::Failed => {
                            return Err(self.escalate_refresh_failure());
                        }
                    }
                }
                Err(error) => {
                    self.surface(&error);
                    return Err(error);
                }
            }
        }
    }

    /// Delivers the taxonomy's user-facing message and redirects when the
    /// user is simply not signed in.
    fn surface(&self, error: &ProviderError) {
        let severity = if error.kind().is_transient() {
            Severity::Warning
        } else {
            Severity::Error
        };
        self.sink.notify(error.kind().user_message(), severity);
        if error.kind() == ErrorKind::Unauthenticated {
            self.navigator.redirect_to_login();
        }
    }

    /// The forced refresh itself failed: the credential cannot be repaired
    /// from here, so this becomes a sign-out.
    fn escalate_refresh_failure(&self) -> ProviderError {
        warn!("token refresh failed during recovery — redirecting to login");
        self.sink.notify(
            "Your session has expired. Please sign in again.",
            Severity::Error,
        );
        self.navigator.redirect_to_login();
        ProviderError::new(
            ErrorKind::Unauthenticated,
            "token refresh failed during recovery",
        )
    }
}

// =========================================================================
// Tests
// =========================================================================
