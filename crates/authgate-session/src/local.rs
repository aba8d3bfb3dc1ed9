//! The locally persisted session reference.
//!
//! The device keeps a single session ID (cookie, local storage, keychain —
//! whatever the platform offers) so that "am I signed in?" survives a
//! restart. This module defines that boundary; the host application
//! provides the real storage.

use std::sync::Mutex;

use crate::SessionId;

/// Reads and writes the device-local session reference.
///
/// Synchronous by design: local storage is not a network round trip, and
/// keeping these calls sync means no suspension point between "read the
/// reference" and "validate it".
pub trait LocalSessionRef: Send + Sync + 'static {
    /// The locally stored session ID, if any.
    fn read(&self) -> Option<SessionId>;

    /// Stores the session ID, replacing any previous one.
    fn write(&self, session_id: &SessionId);

    /// Removes the stored reference. Clearing an empty slot is a no-op.
    fn clear(&self);
}

/// In-process [`LocalSessionRef`] for tests and the demo.
#[derive(Debug, Default)]
pub struct MemorySessionRef {
    slot: Mutex<Option<SessionId>>,
}

impl MemorySessionRef {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<SessionId>> {
        // A poisoned lock only means a panic elsewhere mid-write; the slot
        // itself is still a plain Option we can keep serving.
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl LocalSessionRef for MemorySessionRef {
    fn read(&self) -> Option<SessionId> {
        self.slot().clone()
    }

    fn write(&self, session_id: &SessionId) {
        *self.slot() = Some(session_id.clone());
    }

    fn clear(&self) {
        *self.slot() = None;
    }
}
