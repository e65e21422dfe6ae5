use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::errors::Error;

use super::state::TokenPair;

/// Outcome every waiter of one refresh receives; must be cheap to clone so
/// the shared handle can hand it to all of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RefreshFailure {
    /// No refresh token was available to run the exchange with.
    Unauthenticated,
    /// The refresh collaborator rejected or errored; terminal for the session.
    Rejected(String),
    /// A logout (or re-login) replaced the session before the commit.
    Superseded,
}

impl From<RefreshFailure> for Error {
    fn from(failure: RefreshFailure) -> Self {
        match failure {
            RefreshFailure::Unauthenticated => Error::Unauthenticated,
            RefreshFailure::Rejected(reason) => Error::RefreshFailed(reason),
            // The session that asked for the refresh no longer exists.
            RefreshFailure::Superseded => Error::Unauthenticated,
        }
    }
}

pub(crate) type RefreshHandle = Shared<BoxFuture<'static, Result<TokenPair, RefreshFailure>>>;

/// Pending-operation register for the single in-flight refresh.
///
/// The first 401 caller installs a shared handle; later callers clone and
/// await the same one instead of re-invoking the collaborator. The slot lock
/// is plain and never held across an await.
pub(crate) struct RefreshGate {
    slot: Mutex<Option<RefreshHandle>>,
}

impl RefreshGate {
    pub fn new() -> Self {
        RefreshGate {
            slot: Mutex::new(None),
        }
    }

    /// Clone the in-flight handle or install the future built by `make`.
    /// The bool is true for the caller that started the refresh.
    pub fn join_or_start<F>(&self, make: F) -> (RefreshHandle, bool)
    where
        F: FnOnce() -> BoxFuture<'static, Result<TokenPair, RefreshFailure>>,
    {
        let mut slot = self.lock();
        if let Some(handle) = slot.as_ref() {
            return (handle.clone(), false);
        }
        let handle = make().shared();
        *slot = Some(handle.clone());
        (handle, true)
    }

    /// Clear the slot if it still holds `handle`; a refresh installed after a
    /// logout is never evicted by a stale caller settling late.
    pub fn settle(&self, handle: &RefreshHandle) {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|current| current.ptr_eq(handle)) {
            *slot = None;
        }
    }

    /// Detach the in-flight refresh, if any. Existing waiters keep their
    /// handles and still observe the outcome; the commit step is what finds
    /// the session gone.
    pub fn clear(&self) {
        *self.lock() = None;
    }

    pub fn in_flight(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<RefreshHandle>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
