//! Background identity-token refresh for Authgate.
//!
//! Keeps the provider's short-lived identity token fresh so that wrapped
//! calls rarely see an expired credential. Three triggers feed the same
//! single-flight refresh path:
//!
//! - a periodic schedule (default every 50 minutes),
//! - lifecycle events (app foregrounded, connectivity restored),
//! - explicit demand from the error-recovery layer.
//!
//! # Single-flight
//!
//! At most one provider refresh call is in flight at a time. A trigger that
//! arrives while one is running gets [`RefreshOutcome::AlreadyInFlight`] and
//! no second provider call is made. The guard is a mutex over a small state
//! block; it is never held across the provider call itself.
//!
//! # Failure handling
//!
//! A failed refresh schedules a single retry after `retry_delay × attempt`,
//! so the gaps between attempts grow linearly. After `max_retries`
//! consecutive failures the coordinator latches failed, broadcasts
//! [`RefreshEvent::RefreshFailed`] exactly once, and stays inert until
//! [`TokenRefreshCoordinator::start`] resets it. The composition root treats
//! that event as a forced sign-out.
//!
//! # Integration
//!
//! The coordinator is cloned into background tasks; clones share state:
//!
//! ```ignore
//! let coordinator = TokenRefreshCoordinator::new(provider, RefreshConfig::default());
//! let mut events = coordinator.subscribe();
//! coordinator.start(principal.clone()).await;
//! // ... on foreground:
//! coordinator.on_foreground(&principal).await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use authgate_provider::{IdToken, IdentityProvider, Principal};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Full configuration for the refresh coordinator.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Period of the background refresh schedule.
    /// Default: 50 minutes — comfortably inside a typical 60-minute token
    /// lifetime.
    pub interval: Duration,
    /// Consecutive failures tolerated before the coordinator latches failed.
    pub max_retries: u32,
    /// Base retry delay. Attempt `n` retries after `retry_delay × n`.
    pub retry_delay: Duration,
    /// Refresh early when the token expires within this window.
    pub expiry_lookahead: Duration,
    /// Capacity of the outcome-event broadcast channel.
    pub event_capacity: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(50 * 60),
            max_retries: 3,
            retry_delay: Duration::from_secs(10),
            expiry_lookahead: Duration::from_secs(10 * 60),
            event_capacity: 16,
        }
    }
}

impl RefreshConfig {
    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TokenRefreshCoordinator::new`]. Rules:
    /// - `interval` raised to at least 1 second (a zero interval would spin).
    /// - `max_retries` raised to at least 1.
    /// - `event_capacity` raised to at least 1 (broadcast requires it).
    pub fn validated(mut self) -> Self {
        if self.interval < Duration::from_secs(1) {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                "refresh interval below minimum — raising to 1s"
            );
            self.interval = Duration::from_secs(1);
        }
        if self.max_retries == 0 {
            self.max_retries = 1;
        }
        if self.event_capacity == 0 {
            self.event_capacity = 1;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Events and outcomes
// ---------------------------------------------------------------------------

/// Broadcast outcome of a refresh attempt.
///
/// Subscribers (the composition root, UI state) observe these instead of
/// polling coordinator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    /// A fresh token was obtained.
    Refreshed { expires_at: DateTime<Utc> },
    /// The retry budget is exhausted. Terminal until the next `start`;
    /// emitted exactly once per failure episode.
    RefreshFailed { attempts: u32 },
}

/// What a single refresh trigger got.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// A fresh token, minted by this call.
    Refreshed(IdToken),
    /// Another refresh is already running; no provider call was made.
    /// The in-flight result arrives on the event channel.
    AlreadyInFlight,
    /// The provider call failed, or the coordinator has latched failed.
    Failed,
}

impl RefreshOutcome {
    pub fn token(&self) -> Option<&IdToken> {
        match self {
            Self::Refreshed(token) => Some(token),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Coordinator state
// ---------------------------------------------------------------------------

/// Mutable refresh bookkeeping, guarded by one mutex.
///
/// The `epoch` counter fences stale work: `start`/`stop` bump it, and any
/// provider completion or scheduled retry carrying an old epoch is
/// discarded without touching state.
#[derive(Debug, Default)]
struct TokenState {
    is_refreshing: bool,
    retry_count: u32,
    expiration_time: Option<DateTime<Utc>>,
    failed: bool,
    epoch: u64,
}

struct Inner<P> {
    provider: Arc<P>,
    config: RefreshConfig,
    state: Mutex<TokenState>,
    events: broadcast::Sender<RefreshEvent>,
    /// Handle of the periodic schedule task, if one is running.
    timer: Mutex<Option<JoinHandle<()>>>,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Serializes and schedules identity-token refreshes for one principal.
///
/// Cheap to clone; clones share all state. One coordinator per signed-in
/// principal — `start` for a new principal replaces the old schedule.
pub struct TokenRefreshCoordinator<P: IdentityProvider> {
    inner: Arc<Inner<P>>,
}

impl<P: IdentityProvider> Clone for TokenRefreshCoordinator<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: IdentityProvider> TokenRefreshCoordinator<P> {
    pub fn new(provider: Arc<P>, config: RefreshConfig) -> Self {
        let config = config.validated();
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            inner: Arc::new(Inner {
                provider,
                config,
                state: Mutex::new(TokenState::default()),
                events,
                timer: Mutex::new(None),
            }),
        }
    }

    /// Subscribe to refresh outcomes.
    ///
    /// The channel is lossy under lag (oldest events dropped); subscribers
    /// that only care about the latest state can ignore `Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.inner.events.subscribe()
    }

    /// Starts the periodic refresh schedule for a principal.
    ///
    /// Resets all failure bookkeeping, performs an immediate expiry check,
    /// then refreshes every `interval`. Idempotent: calling again replaces
    /// the previous schedule and aborts its task.
    pub async fn start(&self, principal: Principal) {
        {
            let mut state = self.inner.state.lock().await;
            let epoch = state.epoch + 1;
            *state = TokenState {
                epoch,
                ..TokenState::default()
            };
        }

        info!(
            user_id = %principal.user_id,
            interval_secs = self.inner.config.interval.as_secs(),
            "token refresh schedule started"
        );

        let this = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.inner.config.interval);
            // The first interval tick completes immediately — that slot is
            // the startup expiry check.
            ticker.tick().await;
            this.check_expiry(&principal).await;
            loop {
                ticker.tick().await;
                if this.has_failed().await {
                    break;
                }
                this.refresh_now(&principal).await;
            }
        });

        if let Some(old) = self.inner.timer.lock().await.replace(handle) {
            old.abort();
        }
    }

    /// Stops the periodic schedule.
    ///
    /// An in-flight provider call is not cancelled; its completion carries a
    /// stale epoch and is discarded. A pending backoff retry is fenced the
    /// same way.
    pub async fn stop(&self) {
        if let Some(handle) = self.inner.timer.lock().await.take() {
            handle.abort();
        }
        let mut state = self.inner.state.lock().await;
        state.epoch += 1;
        state.is_refreshing = false;
        info!("token refresh schedule stopped");
    }

    /// Forces a token refresh, subject to single-flight.
    ///
    /// This is the one place the provider's `fetch_id_token` is called with
    /// `force_refresh = true`. See the module docs for the failure protocol.
    pub async fn refresh_now(&self, principal: &Principal) -> RefreshOutcome {
        let epoch = {
            let mut state = self.inner.state.lock().await;
            if state.failed {
                return RefreshOutcome::Failed;
            }
            if state.is_refreshing {
                debug!("refresh already in flight — skipping");
                return RefreshOutcome::AlreadyInFlight;
            }
            state.is_refreshing = true;
            state.epoch
        };

        // Provider I/O happens outside the state lock.
        let result = self.inner.provider.fetch_id_token(principal, true).await;

        let mut state = self.inner.state.lock().await;
        if state.epoch != epoch {
            // stop() or a new start() happened mid-call; this result belongs
            // to the previous episode.
            debug!("discarding refresh result from a stopped schedule");
            return RefreshOutcome::Failed;
        }
        state.is_refreshing = false;

        match result {
            Ok(token) => {
                state.retry_count = 0;
                state.expiration_time = Some(token.expires_at);
                debug!(expires_at = %token.expires_at, "identity token refreshed");
                let _ = self.inner.events.send(RefreshEvent::Refreshed {
                    expires_at: token.expires_at,
                });
                RefreshOutcome::Refreshed(token)
            }
            Err(e) => {
                state.retry_count += 1;
                let attempts = state.retry_count;
                if attempts < self.inner.config.max_retries {
                    let delay = self.inner.config.retry_delay * attempts;
                    warn!(
                        error = %e,
                        attempt = attempts,
                        retry_in_secs = delay.as_secs(),
                        "token refresh failed — retrying"
                    );
                    let this = self.clone();
                    let principal = principal.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        if this.inner.state.lock().await.epoch != epoch {
                            return;
                        }
                        this.refresh_now_boxed(&principal).await;
                    });
                } else {
                    state.failed = true;
                    error!(
                        error = %e,
                        attempts,
                        "token refresh failed permanently — signing out"
                    );
                    let _ = self
                        .inner
                        .events
                        .send(RefreshEvent::RefreshFailed { attempts });
                }
                RefreshOutcome::Failed
            }
        }
    }

    /// Boxed form of [`Self::refresh_now`] for the scheduled retry task.
    ///
    /// The retry task awaits `refresh_now` from inside `refresh_now`, which
    /// makes the future type self-referential; boxing through this explicit
    /// signature breaks the cycle so the compiler can prove `Send`.
    fn refresh_now_boxed<'a>(
        &'a self,
        principal: &'a Principal,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = RefreshOutcome> + Send + 'a>> {
        Box::pin(self.refresh_now(principal))
    }

    /// Refreshes early if the token expires within the lookahead window.
    ///
    /// Uses the coordinator's own expiry bookkeeping when it has any, and
    /// falls back to asking the provider. Unknown expiry counts as due — a
    /// refresh is the only way to learn it.
    pub async fn check_expiry(&self, principal: &Principal) {
        let known = self.inner.state.lock().await.expiration_time;
        let expires_at = match known {
            Some(at) => Some(at),
            None => match self.inner.provider.token_expiry(principal).await {
                Ok(at) => at,
                Err(e) => {
                    debug!(error = %e, "could not determine token expiry");
                    None
                }
            },
        };

        let due = match expires_at {
            Some(at) => expires_within(at, self.inner.config.expiry_lookahead),
            None => true,
        };
        if due {
            debug!(?expires_at, "token near expiry — refreshing early");
            self.refresh_now(principal).await;
        }
    }

    /// The app came back to the foreground; the schedule may have been
    /// suspended for a long time, so refresh immediately.
    pub async fn on_foreground(&self, principal: &Principal) -> RefreshOutcome {
        debug!("app foregrounded — refreshing token");
        self.refresh_now(principal).await
    }

    /// Connectivity came back after an offline period.
    pub async fn on_connectivity_restored(&self, principal: &Principal) -> RefreshOutcome {
        debug!("connectivity restored — refreshing token");
        self.refresh_now(principal).await
    }

    // -- Introspection ------------------------------------------------------

    /// Whether a provider refresh call is currently in flight.
    pub async fn is_refreshing(&self) -> bool {
        self.inner.state.lock().await.is_refreshing
    }

    /// Consecutive failures in the current episode.
    pub async fn retry_count(&self) -> u32 {
        self.inner.state.lock().await.retry_count
    }

    /// Whether the retry budget is exhausted (terminal until `start`).
    pub async fn has_failed(&self) -> bool {
        self.inner.state.lock().await.failed
    }

    /// Last known token expiry, if a refresh has succeeded this episode.
    pub async fn expiration_time(&self) -> Option<DateTime<Utc>> {
        self.inner.state.lock().await.expiration_time
    }

    /// Whether the periodic schedule is running.
    pub async fn is_scheduled(&self) -> bool {
        self.inner.timer.lock().await.is_some()
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.inner.config
    }
}

fn expires_within(expires_at: DateTime<Utc>, lookahead: Duration) -> bool {
    let window = TimeDelta::from_std(lookahead).unwrap_or(TimeDelta::MAX);
    expires_at - Utc::now() <= window
}

// =========================================================================
// Tests
// =========================================================================
