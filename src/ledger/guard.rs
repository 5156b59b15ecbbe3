//! Single-entry guard for the ledger's mutating calls.
//!
//! The ledger hands custody and pricing collaborators control in the middle of an
//! operation. A collaborator holding a clone of the [`EntryLock`] that tries to call
//! back in sees [`LedgerError::Reentrant`] instead of a half-updated ledger.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use super::results::LedgerError;

#[derive(Debug, Clone, Default)]
pub struct EntryLock {
    held: Arc<AtomicBool>,
}

impl EntryLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Takes the lock until the returned guard drops.
    pub fn try_enter(&self) -> Result<EntryGuard, LedgerError> {
        if self
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("reentrant ledger call rejected");
            return Err(LedgerError::Reentrant);
        }
        Ok(EntryGuard {
            held: Arc::clone(&self.held),
        })
    }
}

#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard drops"]
pub struct EntryGuard {
    held: Arc<AtomicBool>,
}

impl Drop for EntryGuard {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
    }
}
