//! The session manager: creates, validates, and revokes session records.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Creating a record when a principal signs in
//! - Deciding active vs. invalid (with a precise reason) on validation
//! - Revoking one session, or every session a user has
//! - Sweeping dead records out of the store
//!
//! The manager owns no record state of its own — records live in the store
//! and are referenced by ID. All methods take `&self`; the store handle is
//! shared behind an `Arc` and every operation is a store round trip.

use std::sync::Arc;

use authgate_provider::{Principal, UserId};
use chrono::Utc;
use rand::Rng;

use crate::record::new_record;
use crate::{
    InvalidReason, LocalSessionRef, SessionConfig, SessionError, SessionId, SessionRecord,
    SessionStore, StoreError, Validation,
};

/// Outcome of a "log out everywhere" pass.
///
/// Revocation is best-effort per record: a store failure on one record
/// doesn't abort the rest. The caller retries the `failed` remainder.
#[derive(Debug, Clone, Default)]
pub struct TerminateSummary {
    /// Sessions revoked by this pass (including already-revoked ones).
    pub revoked: Vec<SessionId>,
    /// Sessions whose revocation write failed and should be retried.
    pub failed: Vec<SessionId>,
}

impl TerminateSummary {
    /// `true` when nothing was left behind.
    pub fn complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Manages session records against a [`SessionStore`].
///
/// ## Lifecycle
///
/// ```text
/// create_session() ──→ validate_session() ──→ terminate_session()
///        │                    │                       │
///        │              [lastActivity                 ▼
///        │               refreshed]            [revoked = true]
///        ▼                                            │
///   [record in store] ──(expiry passes)──→ purge_expired() ──→ deleted
/// ```
pub struct SessionManager<S: SessionStore> {
    store: Arc<S>,
    config: SessionConfig,
}

impl<S: SessionStore> SessionManager<S> {
    pub fn new(store: Arc<S>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates and persists a new session for a signed-in principal.
    ///
    /// Generates a fresh random session ID and computes `expires_at` from
    /// the configured lifetime for the `remember_me` choice. One store
    /// write; the returned record is the persisted state.
    pub async fn create_session(
        &self,
        principal: &Principal,
        ip_address: &str,
        user_agent: &str,
        remember_me: bool,
    ) -> Result<SessionRecord, StoreError> {
        let record = new_record(
            generate_session_id(),
            principal,
            ip_address,
            user_agent,
            remember_me,
            self.config.lifetime_secs(remember_me),
            Utc::now(),
        );
        self.store.put(&record).await?;

        tracing::info!(
            session_id = %record.session_id,
            user_id = %record.user_id,
            remember_me,
            expires_at = %record.expires_at,
            "session created"
        );
        Ok(record)
    }

    /// Validates a session and refreshes its activity timestamp.
    ///
    /// The validity law: valid iff the record exists, is not revoked, and
    /// `now < expires_at` — checked in that order, so the reported reason
    /// names the first violated condition. A read-then-conditional-write;
    /// no retries here. Store transport failures propagate as
    /// [`StoreError`].
    pub async fn validate_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Validation, StoreError> {
        let Some(mut record) = self.store.get(session_id).await? else {
            return Ok(Validation::Invalid(InvalidReason::NotFound));
        };

        if record.revoked {
            return Ok(Validation::Invalid(InvalidReason::Revoked));
        }

        let now = Utc::now();
        if now >= record.expires_at {
            return Ok(Validation::Invalid(InvalidReason::Expired));
        }

        record.last_activity_at = now;
        // The record can vanish between the read and this write; report it
        // the same as if the read had missed.
        if !self.store.update(&record).await? {
            return Ok(Validation::Invalid(InvalidReason::NotFound));
        }

        Ok(Validation::Valid(record))
    }

    /// Marks a session revoked.
    ///
    /// Idempotent: terminating an already-revoked session is a no-op
    /// success. A missing record is [`SessionError::NotFound`].
    pub async fn terminate_session(&self, session_id: &SessionId) -> Result<(), SessionError> {
        let Some(mut record) = self.store.get(session_id).await? else {
            return Err(SessionError::NotFound(session_id.clone()));
        };

        if record.revoked {
            return Ok(());
        }

        record.revoked = true;
        if !self.store.update(&record).await? {
            return Err(SessionError::NotFound(session_id.clone()));
        }

        tracing::info!(%session_id, user_id = %record.user_id, "session revoked");
        Ok(())
    }

    /// Revokes every session belonging to a user ("log out everywhere").
    ///
    /// Best-effort per record: a failed write lands the ID in
    /// [`TerminateSummary::failed`] and the pass continues. Only a failure
    /// to enumerate the user's sessions aborts the whole operation.
    pub async fn terminate_all_user_sessions(
        &self,
        user_id: &UserId,
    ) -> Result<TerminateSummary, StoreError> {
        let records = self.store.list_by_user(user_id).await?;
        let mut summary = TerminateSummary::default();

        for mut record in records {
            if record.revoked {
                summary.revoked.push(record.session_id);
                continue;
            }
            record.revoked = true;
            let session_id = record.session_id.clone();
            match self.store.update(&record).await {
                Ok(_) => summary.revoked.push(session_id),
                Err(e) => {
                    tracing::warn!(
                        %session_id,
                        error = %e,
                        "failed to revoke session — caller should retry"
                    );
                    summary.failed.push(session_id);
                }
            }
        }

        tracing::info!(
            %user_id,
            revoked = summary.revoked.len(),
            failed = summary.failed.len(),
            "terminated all user sessions"
        );
        Ok(summary)
    }

    /// Resolves the device-local session reference and validates it.
    ///
    /// Returns `None` when no local reference exists — an anonymous device,
    /// not an error.
    pub async fn current_session<L: LocalSessionRef>(
        &self,
        local: &L,
    ) -> Result<Option<Validation>, StoreError> {
        let Some(session_id) = local.read() else {
            return Ok(None);
        };
        Ok(Some(self.validate_session(&session_id).await?))
    }

    /// Deletes a user's revoked and expired records from the store.
    ///
    /// Housekeeping, not correctness: validation already rejects dead
    /// sessions; this just frees storage. Returns the IDs removed.
    pub async fn purge_expired(&self, user_id: &UserId) -> Result<Vec<SessionId>, StoreError> {
        let now = Utc::now();
        let mut purged = Vec::new();

        for record in self.store.list_by_user(user_id).await? {
            if record.is_active(now) {
                continue;
            }
            self.store.delete(&record.session_id).await?;
            tracing::debug!(session_id = %record.session_id, "purged dead session");
            purged.push(record.session_id);
        }

        Ok(purged)
    }
}

/// Generates a random 32-character hex session ID (128 bits of entropy).
fn generate_session_id() -> SessionId {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    SessionId(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionManager`.
    //!
    //! Naming convention: `test_{function}_{scenario}_{expected}`.
    //!
    //! # Testing time-dependent behavior
    //!
    //! Expiry is wall-clock based. Instead of sleeping, we use two config
    //! shapes:
    //!   - `lifetime = 0` → sessions are born expired
    //!   - `lifetime = 3600` → sessions never expire during a test
    //!
    //! This keeps tests fast and deterministic.

    use authgate_provider::UserId;

    use super::*;
    use crate::{MemorySessionRef, MemoryStore};

    // -- Helpers ----------------------------------------------------------

    fn principal(id: &str) -> Principal {
        Principal {
            user_id: UserId(id.into()),
            email: format!("{id}@x.com"),
            role: "customer".into(),
        }
    }

    fn manager() -> SessionManager<MemoryStore> {
        SessionManager::new(
            Arc::new(MemoryStore::new()),
            SessionConfig {
                default_lifetime_secs: 3600,
                remembered_lifetime_secs: 7200,
            },
        )
    }

    /// Sessions created by this manager are expired on arrival.
    fn manager_with_instant_expiry() -> SessionManager<MemoryStore> {
        SessionManager::new(
            Arc::new(MemoryStore::new()),
            SessionConfig {
                default_lifetime_secs: 0,
                remembered_lifetime_secs: 0,
            },
        )
    }

    async fn create(mgr: &SessionManager<MemoryStore>, user: &str) -> SessionRecord {
        mgr.create_session(&principal(user), "1.2.3.4", "UA", false)
            .await
            .expect("create should succeed")
    }

    /// A store that refuses every operation, for transport-failure paths.
    struct BrokenStore;

    impl SessionStore for BrokenStore {
        async fn put(&self, _: &SessionRecord) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("store down".into()))
        }
        async fn get(&self, _: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
            Err(StoreError::Unavailable("store down".into()))
        }
        async fn update(&self, _: &SessionRecord) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("store down".into()))
        }
        async fn delete(&self, _: &SessionId) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("store down".into()))
        }
        async fn list_by_user(&self, _: &UserId) -> Result<Vec<SessionRecord>, StoreError> {
            Err(StoreError::Unavailable("store down".into()))
        }
    }

    /// Delegates to a [`MemoryStore`] but fails `update` for one chosen
    /// session, for partial-failure paths.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_update_for: std::sync::Mutex<Option<SessionId>>,
    }

    impl FlakyStore {
        fn fail_update_for(&self, session_id: &SessionId) {
            *self.fail_update_for.lock().unwrap() = Some(session_id.clone());
        }
    }

    impl SessionStore for FlakyStore {
        async fn put(&self, record: &SessionRecord) -> Result<(), StoreError> {
            self.inner.put(record).await
        }
        async fn get(&self, session_id: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
            self.inner.get(session_id).await
        }
        async fn update(&self, record: &SessionRecord) -> Result<bool, StoreError> {
            let poisoned = self.fail_update_for.lock().unwrap().clone();
            if poisoned.as_ref() == Some(&record.session_id) {
                return Err(StoreError::Unavailable("write rejected".into()));
            }
            self.inner.update(record).await
        }
        async fn delete(&self, session_id: &SessionId) -> Result<(), StoreError> {
            self.inner.delete(session_id).await
        }
        async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<SessionRecord>, StoreError> {
            self.inner.list_by_user(user_id).await
        }
    }

    // =====================================================================
    // create_session()
    // =====================================================================

    #[tokio::test]
    async fn test_create_session_applies_short_lifetime() {
        // The literal contract scenario: rememberMe=false gets the
        // configured default lifetime, and validation immediately passes.
        let mgr = manager();
        let session = mgr
            .create_session(&principal("u1"), "1.2.3.4", "UA", false)
            .await
            .expect("should succeed");

        assert_eq!(
            (session.expires_at - session.created_at).num_seconds(),
            3600
        );
        assert!(!session.remember_me);

        let validation = mgr.validate_session(&session.session_id).await.unwrap();
        assert!(validation.is_valid());
    }

    #[tokio::test]
    async fn test_create_session_applies_remembered_lifetime() {
        let mgr = manager();
        let session = mgr
            .create_session(&principal("u1"), "1.2.3.4", "UA", true)
            .await
            .expect("should succeed");

        assert_eq!(
            (session.expires_at - session.created_at).num_seconds(),
            7200
        );
        assert!(session.remember_me);
    }

    #[tokio::test]
    async fn test_create_session_snapshots_identity_and_fingerprint() {
        let mgr = manager();
        let session = mgr
            .create_session(&principal("u1"), "1.2.3.4", "UA", false)
            .await
            .unwrap();

        assert_eq!(session.user_id, UserId("u1".into()));
        assert_eq!(session.email, "u1@x.com");
        assert_eq!(session.role, "customer");
        assert_eq!(session.ip_address, "1.2.3.4");
        assert_eq!(session.user_agent, "UA");
        assert!(!session.revoked);
    }

    #[tokio::test]
    async fn test_create_session_generates_unique_ids() {
        let mgr = manager();
        let a = create(&mgr, "u1").await;
        let b = create(&mgr, "u1").await;

        assert_eq!(a.session_id.0.len(), 32);
        assert_ne!(a.session_id, b.session_id, "IDs must be unique");
    }

    #[tokio::test]
    async fn test_create_session_store_failure_propagates() {
        let mgr = SessionManager::new(Arc::new(BrokenStore), SessionConfig::default());
        let result = mgr
            .create_session(&principal("u1"), "1.2.3.4", "UA", false)
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    // =====================================================================
    // validate_session()
    // =====================================================================

    #[tokio::test]
    async fn test_validate_session_unknown_id_is_not_found() {
        let mgr = manager();
        let validation = mgr
            .validate_session(&SessionId("missing".into()))
            .await
            .unwrap();
        assert_eq!(validation.reason(), Some(InvalidReason::NotFound));
    }

    #[tokio::test]
    async fn test_validate_session_revoked_reports_revoked() {
        let mgr = manager();
        let session = create(&mgr, "u1").await;
        mgr.terminate_session(&session.session_id).await.unwrap();

        let validation = mgr.validate_session(&session.session_id).await.unwrap();
        assert!(!validation.is_valid());
        assert_eq!(validation.reason(), Some(InvalidReason::Revoked));
    }

    #[tokio::test]
    async fn test_validate_session_expired_reports_expired() {
        let mgr = manager_with_instant_expiry();
        let session = create(&mgr, "u1").await;

        let validation = mgr.validate_session(&session.session_id).await.unwrap();
        assert_eq!(validation.reason(), Some(InvalidReason::Expired));
    }

    #[tokio::test]
    async fn test_validate_session_revoked_wins_over_expired() {
        // Both conditions violated — the reason names the first check.
        let mgr = manager_with_instant_expiry();
        let session = create(&mgr, "u1").await;
        // Expired already; revoke it directly in the store.
        let store = Arc::new(MemoryStore::new());
        let mgr2 = SessionManager::new(Arc::clone(&store), SessionConfig::default());
        let mut record = session.clone();
        record.revoked = true;
        store.put(&record).await.unwrap();

        let validation = mgr2.validate_session(&record.session_id).await.unwrap();
        assert_eq!(validation.reason(), Some(InvalidReason::Revoked));
    }

    #[tokio::test]
    async fn test_validate_session_refreshes_last_activity() {
        let mgr = manager();
        let session = create(&mgr, "u1").await;

        let validation = mgr.validate_session(&session.session_id).await.unwrap();
        let validated = validation.session().expect("should be valid");
        assert!(validated.last_activity_at >= session.last_activity_at);
    }

    #[tokio::test]
    async fn test_validate_session_store_failure_propagates() {
        let mgr = SessionManager::new(Arc::new(BrokenStore), SessionConfig::default());
        let result = mgr.validate_session(&SessionId("any".into())).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    // =====================================================================
    // terminate_session()
    // =====================================================================

    #[tokio::test]
    async fn test_terminate_session_revokes_record() {
        let mgr = manager();
        let session = create(&mgr, "u1").await;

        mgr.terminate_session(&session.session_id)
            .await
            .expect("should succeed");

        let validation = mgr.validate_session(&session.session_id).await.unwrap();
        assert_eq!(validation.reason(), Some(InvalidReason::Revoked));
    }

    #[tokio::test]
    async fn test_terminate_session_twice_is_idempotent() {
        // Second termination: same end state, no error.
        let mgr = manager();
        let session = create(&mgr, "u1").await;

        mgr.terminate_session(&session.session_id).await.unwrap();
        mgr.terminate_session(&session.session_id)
            .await
            .expect("second terminate should be a no-op success");

        let validation = mgr.validate_session(&session.session_id).await.unwrap();
        assert_eq!(validation.reason(), Some(InvalidReason::Revoked));
    }

    #[tokio::test]
    async fn test_terminate_session_missing_returns_not_found() {
        let mgr = manager();
        let result = mgr.terminate_session(&SessionId("missing".into())).await;
        assert!(matches!(result, Err(SessionError::NotFound(_))));
    }

    // =====================================================================
    // terminate_all_user_sessions()
    // =====================================================================

    #[tokio::test]
    async fn test_terminate_all_revokes_every_user_session() {
        let mgr = manager();
        let a = create(&mgr, "u1").await;
        let b = create(&mgr, "u1").await;
        let other = create(&mgr, "u2").await;

        let summary = mgr
            .terminate_all_user_sessions(&UserId("u1".into()))
            .await
            .unwrap();

        assert!(summary.complete());
        assert_eq!(summary.revoked.len(), 2);
        for id in [&a.session_id, &b.session_id] {
            let v = mgr.validate_session(id).await.unwrap();
            assert_eq!(v.reason(), Some(InvalidReason::Revoked));
        }
        // The other user's session is untouched.
        let v = mgr.validate_session(&other.session_id).await.unwrap();
        assert!(v.is_valid());
    }

    #[tokio::test]
    async fn test_terminate_all_counts_already_revoked_as_done() {
        let mgr = manager();
        let a = create(&mgr, "u1").await;
        create(&mgr, "u1").await;
        mgr.terminate_session(&a.session_id).await.unwrap();

        let summary = mgr
            .terminate_all_user_sessions(&UserId("u1".into()))
            .await
            .unwrap();

        assert!(summary.complete());
        assert_eq!(summary.revoked.len(), 2);
    }

    #[tokio::test]
    async fn test_terminate_all_no_sessions_is_empty_success() {
        let mgr = manager();
        let summary = mgr
            .terminate_all_user_sessions(&UserId("nobody".into()))
            .await
            .unwrap();
        assert!(summary.complete());
        assert!(summary.revoked.is_empty());
    }

    #[tokio::test]
    async fn test_terminate_all_partial_failure_reports_remainder() {
        // One record's revocation write fails; the pass keeps going and the
        // summary tells the caller which ID to retry.
        let store = Arc::new(FlakyStore::default());
        let mgr = SessionManager::new(Arc::clone(&store), SessionConfig::default());
        let good = mgr
            .create_session(&principal("u1"), "1.2.3.4", "UA", false)
            .await
            .unwrap();
        let bad = mgr
            .create_session(&principal("u1"), "1.2.3.4", "UA", false)
            .await
            .unwrap();
        store.fail_update_for(&bad.session_id);

        let summary = mgr
            .terminate_all_user_sessions(&UserId("u1".into()))
            .await
            .unwrap();

        assert!(!summary.complete());
        assert_eq!(summary.revoked, vec![good.session_id.clone()]);
        assert_eq!(summary.failed, vec![bad.session_id.clone()]);

        let v = mgr.validate_session(&good.session_id).await.unwrap();
        assert_eq!(v.reason(), Some(InvalidReason::Revoked));
        let bad_record = store.get(&bad.session_id).await.unwrap().unwrap();
        assert!(!bad_record.revoked, "failed revocation leaves the record active");
    }

    #[tokio::test]
    async fn test_terminate_all_list_failure_aborts() {
        let mgr = SessionManager::new(Arc::new(BrokenStore), SessionConfig::default());
        let result = mgr.terminate_all_user_sessions(&UserId("u1".into())).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    // =====================================================================
    // current_session()
    // =====================================================================

    #[tokio::test]
    async fn test_current_session_no_local_ref_returns_none() {
        let mgr = manager();
        let local = MemorySessionRef::new();

        let current = mgr.current_session(&local).await.unwrap();
        assert!(current.is_none());
    }

    #[tokio::test]
    async fn test_current_session_valid_local_ref_validates() {
        let mgr = manager();
        let session = create(&mgr, "u1").await;
        let local = MemorySessionRef::new();
        local.write(&session.session_id);

        let current = mgr.current_session(&local).await.unwrap();
        let validation = current.expect("local ref exists");
        assert!(validation.is_valid());
        assert_eq!(
            validation.session().unwrap().session_id,
            session.session_id
        );
    }

    #[tokio::test]
    async fn test_current_session_stale_local_ref_reports_reason() {
        // The device remembers a session the store no longer has.
        let mgr = manager();
        let local = MemorySessionRef::new();
        local.write(&SessionId("stale".into()));

        let current = mgr.current_session(&local).await.unwrap();
        let validation = current.expect("local ref exists");
        assert_eq!(validation.reason(), Some(InvalidReason::NotFound));
    }

    // =====================================================================
    // purge_expired()
    // =====================================================================

    #[tokio::test]
    async fn test_purge_expired_removes_dead_records() {
        let store = Arc::new(MemoryStore::new());
        let short = SessionManager::new(
            Arc::clone(&store),
            SessionConfig {
                default_lifetime_secs: 0,
                remembered_lifetime_secs: 0,
            },
        );
        let long = SessionManager::new(
            Arc::clone(&store),
            SessionConfig {
                default_lifetime_secs: 3600,
                remembered_lifetime_secs: 3600,
            },
        );

        let dead = create(&short, "u1").await;
        let alive = create(&long, "u1").await;

        let purged = long.purge_expired(&UserId("u1".into())).await.unwrap();

        assert_eq!(purged, vec![dead.session_id]);
        assert_eq!(store.len().await, 1);
        let v = long.validate_session(&alive.session_id).await.unwrap();
        assert!(v.is_valid());
    }

    #[tokio::test]
    async fn test_purge_expired_removes_revoked_records() {
        let mgr = manager();
        let session = create(&mgr, "u1").await;
        mgr.terminate_session(&session.session_id).await.unwrap();

        let purged = mgr.purge_expired(&UserId("u1".into())).await.unwrap();
        assert_eq!(purged, vec![session.session_id.clone()]);

        // Gone for good, not just revoked.
        let v = mgr.validate_session(&session.session_id).await.unwrap();
        assert_eq!(v.reason(), Some(InvalidReason::NotFound));
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_active_records() {
        let mgr = manager();
        create(&mgr, "u1").await;

        let purged = mgr.purge_expired(&UserId("u1".into())).await.unwrap();
        assert!(purged.is_empty());
    }
}
