//! `SessionContext`: the composition root that ties the layers together.
//!
//! One context per process. It owns the session manager, the refresh
//! coordinator, and the recovery wrapper, and reacts to three event
//! streams: auth-state transitions from the provider, app lifecycle events
//! from the host, and refresh outcomes from the coordinator.

use std::sync::Arc;

use authgate_provider::{AuthChange, IdentityProvider, Principal, SignIn};
use authgate_recovery::{Navigator, NotificationSink, Recovery, Severity};
use authgate_refresh::{RefreshConfig, RefreshEvent, TokenRefreshCoordinator};
use authgate_session::{
    LocalSessionRef, SessionConfig, SessionManager, SessionStore, StoreError, Validation,
};
use tokio::sync::{Mutex, broadcast, mpsc};

use crate::AuthgateError;

/// An app lifecycle event the host forwards to the context.
///
/// Both are moments when the token may have silently gone stale: the app
/// was suspended in the background, or the device was offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Foregrounded,
    ConnectivityRestored,
}

/// Configuration for the whole context: session lifetimes plus the refresh
/// schedule. Defaults are production values.
#[derive(Debug, Clone, Default)]
pub struct ContextConfig {
    pub session: SessionConfig,
    pub refresh: RefreshConfig,
}

/// The composition root.
///
/// Generic over the five collaborator seams — identity provider, session
/// store, notification sink, navigator, and local session reference — so
/// tests and the demo run fully in-process while production plugs in real
/// adapters.
pub struct SessionContext<P, S, N, V, L>
where
    P: IdentityProvider,
    S: SessionStore,
    N: NotificationSink,
    V: Navigator,
    L: LocalSessionRef,
{
    manager: SessionManager<S>,
    coordinator: TokenRefreshCoordinator<P>,
    recovery: Recovery<P, N, V>,
    local: Arc<L>,
    sink: Arc<N>,
    navigator: Arc<V>,
    /// The signed-in principal, if any. `None` = anonymous.
    active: Mutex<Option<Principal>>,
}

impl<P, S, N, V, L> SessionContext<P, S, N, V, L>
where
    P: IdentityProvider,
    S: SessionStore,
    N: NotificationSink,
    V: Navigator,
    L: LocalSessionRef,
{
    pub fn new(
        provider: Arc<P>,
        store: Arc<S>,
        local: Arc<L>,
        sink: Arc<N>,
        navigator: Arc<V>,
        config: ContextConfig,
    ) -> Self {
        let coordinator = TokenRefreshCoordinator::new(provider, config.refresh);
        let recovery = Recovery::new(
            coordinator.clone(),
            Arc::clone(&sink),
            Arc::clone(&navigator),
        );
        Self {
            manager: SessionManager::new(store, config.session),
            coordinator,
            recovery,
            local,
            sink,
            navigator,
            active: Mutex::new(None),
        }
    }

    // -- Event handling -----------------------------------------------------

    /// Reacts to an auth-state transition from the identity provider.
    ///
    /// Sign-in reuses a still-valid local session for the same user (a
    /// restart, not a new device) or creates one, then starts the refresh
    /// schedule. Sign-out tears everything down; revoking the session is
    /// best effort — a dead store must not block local sign-out.
    pub async fn handle_auth_change(&self, change: AuthChange) -> Result<(), AuthgateError> {
        match change {
            AuthChange::SignedIn(sign_in) => self.handle_signed_in(sign_in).await,
            AuthChange::SignedOut => {
                self.tear_down_session().await;
                Ok(())
            }
        }
    }

    async fn handle_signed_in(&self, sign_in: SignIn) -> Result<(), AuthgateError> {
        let SignIn {
            principal,
            ip_address,
            user_agent,
            remember_me,
        } = sign_in;

        let existing = self.manager.current_session(self.local.as_ref()).await?;
        match existing {
            Some(Validation::Valid(record)) if record.user_id == principal.user_id => {
                tracing::info!(
                    session_id = %record.session_id,
                    user_id = %record.user_id,
                    "reusing valid local session"
                );
            }
            _ => {
                let record = self
                    .manager
                    .create_session(&principal, &ip_address, &user_agent, remember_me)
                    .await?;
                self.local.write(&record.session_id);
            }
        }

        *self.active.lock().await = Some(principal.clone());
        self.coordinator.start(principal).await;
        Ok(())
    }

    /// Forwards an app lifecycle event to the refresh coordinator.
    /// No-op when anonymous — there is no token to keep fresh.
    pub async fn handle_app_event(&self, event: AppEvent) {
        let Some(principal) = self.active_principal().await else {
            tracing::debug!(?event, "app event while anonymous — ignoring");
            return;
        };
        match event {
            AppEvent::Foregrounded => {
                self.coordinator.on_foreground(&principal).await;
            }
            AppEvent::ConnectivityRestored => {
                self.coordinator.on_connectivity_restored(&principal).await;
            }
        }
    }

    /// Reacts to a refresh outcome. Terminal failure forces sign-out: the
    /// credential cannot be repaired, so staying "signed in" would only
    /// produce a stream of failing calls.
    pub async fn handle_refresh_event(&self, event: RefreshEvent) {
        match event {
            RefreshEvent::Refreshed { expires_at } => {
                tracing::debug!(%expires_at, "token refreshed");
            }
            RefreshEvent::RefreshFailed { attempts } => {
                tracing::warn!(attempts, "token refresh failed permanently — signing out");
                self.sink.notify(
                    "Your session has expired. Please sign in again.",
                    Severity::Error,
                );
                self.navigator.redirect_to_login();
                self.tear_down_session().await;
            }
        }
    }

    async fn tear_down_session(&self) {
        self.coordinator.stop().await;
        *self.active.lock().await = None;

        if let Some(session_id) = self.local.read() {
            if let Err(e) = self.manager.terminate_session(&session_id).await {
                tracing::warn!(
                    %session_id,
                    error = %e,
                    "could not revoke session on sign-out"
                );
            }
        }
        self.local.clear();
        tracing::info!("signed out");
    }

    /// Drives the context until an event source closes.
    ///
    /// Selects over the auth-change stream, the app-event stream, and the
    /// coordinator's own outcome broadcast. Lagged refresh events are
    /// skipped — only the latest outcome matters.
    pub async fn run(
        &self,
        mut auth_rx: mpsc::Receiver<AuthChange>,
        mut app_rx: mpsc::Receiver<AppEvent>,
    ) {
        let mut refresh_events = self.coordinator.subscribe();
        loop {
            tokio::select! {
                change = auth_rx.recv() => match change {
                    Some(change) => {
                        if let Err(e) = self.handle_auth_change(change).await {
                            tracing::error!(error = %e, "failed to apply auth change");
                        }
                    }
                    None => break,
                },
                event = app_rx.recv() => match event {
                    Some(event) => self.handle_app_event(event).await,
                    None => break,
                },
                event = refresh_events.recv() => match event {
                    Ok(event) => self.handle_refresh_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "refresh event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        tracing::debug!("session context loop exited");
    }

    // -- Read path ----------------------------------------------------------

    /// Validates the device-local session, if one exists.
    pub async fn current_session(&self) -> Result<Option<Validation>, StoreError> {
        self.manager.current_session(self.local.as_ref()).await
    }

    /// Whether a principal is currently signed in on this context.
    pub async fn is_authenticated(&self) -> bool {
        self.active.lock().await.is_some()
    }

    pub async fn active_principal(&self) -> Option<Principal> {
        self.active.lock().await.clone()
    }

    // -- Component access ----------------------------------------------------

    /// The recovery wrapper, for running provider-backed operations.
    pub fn recovery(&self) -> &Recovery<P, N, V> {
        &self.recovery
    }

    pub fn manager(&self) -> &SessionManager<S> {
        &self.manager
    }

    pub fn coordinator(&self) -> &TokenRefreshCoordinator<P> {
        &self.coordinator
    }
}
