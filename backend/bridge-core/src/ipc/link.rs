//! Serving one envelope link against an adapter.

use crate::adapter::InProcessAdapter;
use crate::backend::WalletBackend;
use crate::envelope::{Envelope, EnvelopeKind};
use crate::ipc::shutdown_requested;
use crate::transport::MemoryListener;

use log::{debug, trace, warn};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Answers a single inbound envelope. Only requests get a reply.
pub async fn answer<B: WalletBackend>(
    adapter: &InProcessAdapter<B>,
    envelope: Envelope,
) -> Option<Envelope> {
    if envelope.kind != EnvelopeKind::Request {
        warn!("Ignoring {} envelope from client", envelope.kind);
        return None;
    }
    let id = envelope.correlation_id?;

    match adapter.request(envelope.payload).await {
        Ok(payload) => Some(Envelope::response(id, payload.unwrap_or(Value::Null))),
        Err(e) => {
            debug!("Request {} failed: {}", id, e);
            Some(Envelope::error(id, e.to_wire()))
        }
    }
}

/// Dispatches every request arriving on `incoming` concurrently, writes replies
/// and adapter notifications to `outgoing`, and returns when the link closes or
/// shutdown is signalled.
pub async fn serve_link<B: WalletBackend>(
    adapter: InProcessAdapter<B>,
    mut incoming: mpsc::Receiver<Envelope>,
    outgoing: mpsc::Sender<Envelope>,
    shutdown: watch::Receiver<bool>,
) {
    let notifications = outgoing.clone();
    let subscription = adapter.subscribe(move |payload| {
        if let Err(e) = notifications.try_send(Envelope::notification(payload.clone())) {
            debug!("Dropping notification: {}", e);
        }
    });

    let stop = shutdown_requested(shutdown);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            envelope = incoming.recv() => match envelope {
                Some(envelope) => {
                    trace!("Received {} envelope {:?}", envelope.kind, envelope.correlation_id);
                    let adapter = adapter.clone();
                    let outgoing = outgoing.clone();
                    tokio::spawn(async move {
                        if let Some(reply) = answer(&adapter, envelope).await {
                            // The link may close while the request runs; the reply is then moot.
                            let _ = outgoing.send(reply).await;
                        }
                    });
                }
                None => break,
            },
            _ = &mut stop => break,
        }
    }

    subscription.unsubscribe();
    debug!("Link closed");
}

/// Serves every link opened through the paired [`MemoryTransport`](crate::transport::MemoryTransport).
pub fn serve_memory_listener<B: WalletBackend>(
    mut listener: MemoryListener,
    adapter: InProcessAdapter<B>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(peer) = listener.accept().await {
            // No shutdown source: the link lives until the client drops it.
            let (_, shutdown) = watch::channel(false);
            let adapter = adapter.clone();
            tokio::spawn(async move {
                serve_link(adapter, peer.incoming, peer.outgoing, shutdown).await;
            });
        }
    })
}
