//! End-to-end login flow against in-process adapters.
//!
//! Signs a demo user in, validates the persisted session, runs one
//! provider-backed operation through the recovery wrapper (the first call
//! fails with a stale-credential error and recovers silently), then signs
//! out. Run with `RUST_LOG=debug` to watch the lifecycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use authgate::prelude::*;
use chrono::{DateTime, TimeDelta, Utc};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Demo adapters
// ---------------------------------------------------------------------------

/// Accepts any email with a non-empty password and mints numbered tokens.
struct DemoProvider {
    tokens_minted: AtomicU32,
}

impl DemoProvider {
    fn new() -> Self {
        Self {
            tokens_minted: AtomicU32::new(0),
        }
    }
}

impl IdentityProvider for DemoProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, ProviderError> {
        if password.is_empty() {
            return Err(ProviderError::from_code("invalid-argument", "empty password"));
        }
        Ok(Principal {
            user_id: UserId(format!("demo-{email}")),
            email: email.to_string(),
            role: "customer".to_string(),
        })
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn fetch_id_token(
        &self,
        principal: &Principal,
        _force_refresh: bool,
    ) -> Result<IdToken, ProviderError> {
        let n = self.tokens_minted.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(IdToken {
            value: format!("demo-token-{}-{n}", principal.user_id),
            expires_at: Utc::now() + TimeDelta::hours(1),
        })
    }

    async fn token_expiry(
        &self,
        _principal: &Principal,
    ) -> Result<Option<DateTime<Utc>>, ProviderError> {
        Ok(None)
    }
}

/// Prints notifications the way an app would toast them.
struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn notify(&self, message: &str, severity: Severity) {
        println!("  [{severity:?}] {message}");
    }
}

struct LoginNavigator;

impl Navigator for LoginNavigator {
    fn redirect_to_login(&self) {
        println!("  -> redirecting to /login");
    }
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let provider = Arc::new(DemoProvider::new());
    let context = SessionContext::new(
        Arc::clone(&provider),
        Arc::new(MemoryStore::new()),
        Arc::new(MemorySessionRef::new()),
        Arc::new(StdoutSink),
        Arc::new(LoginNavigator),
        ContextConfig::default(),
    );

    // 1. Sign in.
    println!("signing in as ada@example.com");
    let principal = provider.sign_in("ada@example.com", "hunter2").await?;
    context
        .handle_auth_change(AuthChange::SignedIn(SignIn {
            principal: principal.clone(),
            ip_address: "203.0.113.7".into(),
            user_agent: "login-flow-demo/1.0".into(),
            remember_me: true,
        }))
        .await?;

    let session = context
        .current_session()
        .await?
        .and_then(|v| v.session().cloned())
        .expect("session should be valid right after sign-in");
    println!(
        "session {} active until {}",
        session.session_id, session.expires_at
    );

    // 2. A provider-backed call whose first attempt hits a stale-credential
    //    error. The recovery wrapper refreshes and retries silently.
    let attempts = Arc::new(AtomicU32::new(0));
    let op = {
        let attempts = Arc::clone(&attempts);
        move || {
            let attempts = Arc::clone(&attempts);
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ProviderError::from_code(
                        "permission-denied",
                        "security rules saw an expired token",
                    ))
                } else {
                    Ok("order-1042")
                }
            }
        }
    };
    let order = context
        .recovery()
        .execute(
            &principal,
            op,
            &RecoveryOptions::default().with_success_notice("Order placed."),
        )
        .await?;
    println!(
        "placed {order} after {} attempt(s)",
        attempts.load(Ordering::SeqCst)
    );

    // 3. Sign out.
    provider.sign_out().await?;
    context.handle_auth_change(AuthChange::SignedOut).await?;
    println!(
        "signed out; session is now {}",
        match context.current_session().await? {
            Some(v) => format!("{:?}", v.reason()),
            None => "gone".to_string(),
        }
    );

    Ok(())
}
