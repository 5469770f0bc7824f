//! In-process transport used by the embedded shell and by tests.

use crate::LINK_CHANNEL_CAPACITY;
use crate::envelope::Envelope;
use crate::error::transport::TransportError;
use crate::transport::{Link, Transport};

use common::ErrorLocation;

use async_trait::async_trait;
use log::debug;
use tokio::sync::mpsc;

use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Client half. Every `connect` hands a fresh [`MemoryPeer`] to the paired listener.
pub struct MemoryTransport {
    acceptor: mpsc::UnboundedSender<MemoryPeer>,
    online: Arc<AtomicBool>,
    connects: AtomicU64,
}

/// Backend half, receiving one [`MemoryPeer`] per successful connect.
pub struct MemoryListener {
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
    online: Arc<AtomicBool>,
}

/// Backend view of one link. Dropping it disconnects the client.
#[derive(Debug)]
pub struct MemoryPeer {
    pub incoming: mpsc::Receiver<Envelope>,
    pub outgoing: mpsc::Sender<Envelope>,
}

impl MemoryTransport {
    pub fn pair() -> (MemoryTransport, MemoryListener) {
        let (acceptor, peers) = mpsc::unbounded_channel();
        let online = Arc::new(AtomicBool::new(true));
        (
            MemoryTransport {
                acceptor,
                online: online.clone(),
                connects: AtomicU64::new(0),
            },
            MemoryListener { peers, online },
        )
    }

    /// Number of links opened so far.
    pub fn connect_count(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn connect(&self) -> Result<Link, TransportError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(TransportError::Connect {
                message: "memory endpoint is offline".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let (client_tx, peer_rx) = mpsc::channel(LINK_CHANNEL_CAPACITY);
        let (peer_tx, client_rx) = mpsc::channel(LINK_CHANNEL_CAPACITY);
        let peer = MemoryPeer {
            incoming: peer_rx,
            outgoing: peer_tx,
        };

        self.acceptor.send(peer).map_err(|_| TransportError::Connect {
            message: "memory listener was dropped".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let count = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Memory link #{} opened", count);

        Ok(Link {
            outbound: client_tx,
            inbound: client_rx,
        })
    }
}

impl MemoryListener {
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }

    /// While offline, `connect` fails without reaching the listener.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl MemoryPeer {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.incoming.recv().await
    }

    pub async fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        let location = ErrorLocation::from(Location::caller());
        self.outgoing
            .send(envelope)
            .await
            .map_err(|_| TransportError::Closed {
                message: "memory link closed".to_string(),
                location,
            })
    }
}
