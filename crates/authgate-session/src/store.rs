//! The session-store boundary and the in-process implementation.
//!
//! The durable store is an external collaborator — a document or key-value
//! service. This module defines exactly what the session layer needs from
//! it, with "not found" as a distinct outcome from transport failure:
//! a missing record is a normal answer, an unreachable store is an error.
//!
//! [`MemoryStore`] is the in-process implementation used by tests and the
//! demo. A production adapter implements [`SessionStore`] against the real
//! backend without touching any other crate.

use std::collections::HashMap;

use authgate_provider::UserId;
use tokio::sync::RwLock;

use crate::{SessionId, SessionRecord};

/// A transport-level store failure. Transient — the caller may retry.
///
/// Record-level outcomes (absent, revoked, expired) are NOT errors; they
/// are modeled as `Option` / [`Validation`](crate::Validation) variants.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or refused the operation.
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Durable key-value operations for session records.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` — the store handle is shared across async tasks
/// for the life of the composition root, same as the identity provider.
pub trait SessionStore: Send + Sync + 'static {
    /// Inserts (or overwrites) a record.
    fn put(
        &self,
        record: &SessionRecord,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Fetches a record. `Ok(None)` means "no such session" — a normal
    /// outcome, not a failure.
    fn get(
        &self,
        session_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<Option<SessionRecord>, StoreError>> + Send;

    /// Overwrites an existing record. Returns `false` if the record is
    /// absent (deleted between a read and this write).
    fn update(
        &self,
        record: &SessionRecord,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Removes a record. Removing an absent record is a no-op success.
    fn delete(
        &self,
        session_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// All records belonging to a user, across devices.
    fn list_by_user(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<SessionRecord>, StoreError>> + Send;
}

/// In-process [`SessionStore`] backed by a `HashMap`.
///
/// Used by tests and the demo. Not durable — restarting the process loses
/// every session.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held. Test/introspection helper.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl SessionStore for MemoryStore {
    async fn put(&self, record: &SessionRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, session_id: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.records.read().await.get(session_id).cloned())
    }

    async fn update(&self, record: &SessionRecord) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.session_id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, session_id: &SessionId) -> Result<(), StoreError> {
        self.records.write().await.remove(session_id);
        Ok(())
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect())
    }
}
