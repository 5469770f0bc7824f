//! Bidirectional message channels between the UI context and the backend context.
//!
//! A [`Transport`] only knows how to open a [`Link`]. Correlation, queueing and
//! reconnection live in [`crate::rpc`]; a link reports disconnection by closing
//! its inbound half.

pub mod memory;
pub mod ws;

pub use memory::{MemoryListener, MemoryPeer, MemoryTransport};
pub use ws::WsTransport;

use crate::envelope::Envelope;
use crate::error::transport::TransportError;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// One live connection. Sending on `outbound` fails once the link is gone and
/// `inbound` yields `None` when the other side disconnects.
#[derive(Debug)]
pub struct Link {
    pub outbound: mpsc::Sender<Envelope>,
    pub inbound: mpsc::Receiver<Envelope>,
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn connect(&self) -> Result<Link, TransportError>;
}
