//! Single-slot coordinator between dApp flows awaiting approval and the UI
//! that grants or denies them.
//!
//! At most one request is pending. A new request supersedes the previous one,
//! whose waiter fails with [`BridgeError::Superseded`]. An unanswered request
//! fails with [`BridgeError::Timeout`] once the configured window elapses.

pub mod types;

pub use types::{ConfirmationKind, ConfirmationRequest, ConfirmationResult};

use crate::error::bridge::BridgeError;
use crate::rpc::subscribers::{Subscribers, Subscription};

use log::{debug, info, warn};
use tokio::sync::oneshot;
use tokio::time::timeout as TokioTimeout;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

type Outcome = Result<ConfirmationResult, BridgeError>;

struct PendingConfirmation {
    request: ConfirmationRequest,
    resolver: oneshot::Sender<Outcome>,
}

struct StoreInner {
    slot: Mutex<Option<PendingConfirmation>>,
    subscribers: Subscribers<()>,
    timeout: Duration,
}

/// Clears the slot if it still holds `id` once its waiter is gone, whether it
/// timed out, was answered, or was dropped by its caller.
struct WithdrawOnDrop<'a> {
    store: &'a ConfirmationStore,
    id: String,
}

impl Drop for WithdrawOnDrop<'_> {
    fn drop(&mut self) {
        if self.store.take_if(&self.id) {
            debug!("Confirmation {} withdrawn", self.id);
            self.store.inner.subscribers.notify(&());
        }
    }
}

#[derive(Clone)]
pub struct ConfirmationStore {
    inner: Arc<StoreInner>,
}

impl Default for ConfirmationStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRMATION_TIMEOUT)
    }
}

impl ConfirmationStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                slot: Mutex::new(None),
                subscribers: Subscribers::new(),
                timeout,
            }),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<PendingConfirmation>> {
        self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes `request` and waits for the UI's decision.
    ///
    /// Dropping the returned future withdraws the request from the slot.
    pub async fn request_confirmation(&self, request: ConfirmationRequest) -> Outcome {
        let id = request.id.clone();
        let (resolver, decision) = oneshot::channel();

        let previous = self.slot().replace(PendingConfirmation { request, resolver });
        if let Some(previous) = previous {
            warn!(
                "Confirmation {} superseded by {}",
                previous.request.id, id
            );
            let _ = previous.resolver.send(Err(BridgeError::superseded(format!(
                "confirmation {} replaced by {id}",
                previous.request.id
            ))));
        }
        let _withdraw = WithdrawOnDrop {
            store: self,
            id: id.clone(),
        };
        info!("Confirmation {} awaiting decision", id);
        self.inner.subscribers.notify(&());

        match TokioTimeout(self.inner.timeout, decision).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(BridgeError::unknown(format!(
                "confirmation {id} was dropped without a decision"
            ))),
            Err(_) => {
                warn!("Confirmation {} timed out", id);
                Err(BridgeError::timeout(format!(
                    "confirmation {id} not answered within {:?}",
                    self.inner.timeout
                )))
            }
        }
    }

    fn take_if(&self, id: &str) -> bool {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|pending| pending.request.id == id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    /// Settles the pending request. Returns `false` when nothing is pending.
    pub fn resolve_confirmation(&self, result: ConfirmationResult) -> bool {
        let pending = self.slot().take();
        match pending {
            Some(pending) => {
                debug!(
                    "Confirmation {} resolved (confirmed: {})",
                    pending.request.id, result.confirmed
                );
                let _ = pending.resolver.send(Ok(result));
                self.inner.subscribers.notify(&());
                true
            }
            None => {
                debug!("No pending confirmation to resolve");
                false
            }
        }
    }

    /// Like [`Self::resolve_confirmation`], but only if `id` is still the pending one.
    pub fn resolve_confirmation_for(&self, id: &str, result: ConfirmationResult) -> bool {
        let pending = {
            let mut slot = self.slot();
            if slot.as_ref().is_some_and(|pending| pending.request.id == id) {
                slot.take()
            } else {
                None
            }
        };
        match pending {
            Some(pending) => {
                let _ = pending.resolver.send(Ok(result));
                self.inner.subscribers.notify(&());
                true
            }
            None => false,
        }
    }

    pub fn get_pending_request(&self) -> Option<ConfirmationRequest> {
        self.slot().as_ref().map(|pending| pending.request.clone())
    }

    pub fn has_pending_request(&self) -> bool {
        self.slot().is_some()
    }

    /// Called whenever the pending request appears, changes or clears.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.subscribers.add(move |_: &()| callback())
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }
}
