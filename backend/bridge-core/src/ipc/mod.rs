//! IPC layer between the UI context and the wallet host process.
//!
//! Provides:
//!
//! - WebSocket server (localhost-only) fronting an [`InProcessAdapter`](crate::adapter::InProcessAdapter)
//! - JSON text frames carrying [`Envelope`](crate::envelope::Envelope)s
//! - Authentication handshake (first frame)
//! - Link serving shared by the socket server and the in-memory transport
//!
//! # Security
//!
//! - Localhost-only binding (`127.0.0.1`)
//! - Non-loopback connections rejected
//! - Authentication token required (generated on server start unless supplied)

mod connection_state;
mod handle;
pub mod link;
mod server;

pub use handle::IpcServerHandle;
pub use link::{answer, serve_link, serve_memory_listener};
pub use server::start_ipc_server;

use tokio::sync::watch;

/// Resolves once shutdown is signalled. Never resolves if the signal source is gone.
pub(crate) async fn shutdown_requested(mut shutdown: watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
