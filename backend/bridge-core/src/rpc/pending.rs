use crate::envelope::CorrelationId;
use crate::error::bridge::BridgeError;

use serde_json::Value;
use tokio::sync::oneshot;

use std::collections::HashMap;

pub(crate) type Resolver = oneshot::Sender<Result<Value, BridgeError>>;

/// In-flight requests keyed by correlation id. Each entry is settled at most once.
#[derive(Default)]
pub(crate) struct PendingCalls {
    calls: HashMap<CorrelationId, Resolver>,
}

impl PendingCalls {
    /// Hands the resolver back if the id is already in flight.
    pub(crate) fn insert(&mut self, id: CorrelationId, resolver: Resolver) -> Result<(), Resolver> {
        if self.calls.contains_key(&id) {
            return Err(resolver);
        }
        self.calls.insert(id, resolver);
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: CorrelationId) -> Option<Resolver> {
        self.calls.remove(&id)
    }

    /// Returns false when nothing was waiting on `id`.
    pub(crate) fn resolve(&mut self, id: CorrelationId, result: Result<Value, BridgeError>) -> bool {
        match self.calls.remove(&id) {
            // The caller may have given up already; that still settles the entry.
            Some(resolver) => {
                let _ = resolver.send(result);
                true
            }
            None => false,
        }
    }

    pub(crate) fn reject_all(&mut self, error: impl Fn() -> BridgeError) -> usize {
        let count = self.calls.len();
        for (_, resolver) in self.calls.drain() {
            let _ = resolver.send(Err(error()));
        }
        count
    }
}
