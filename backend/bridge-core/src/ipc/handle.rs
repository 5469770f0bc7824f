//! IPC server handle type.

use tokio::sync::watch;

use std::net::SocketAddr;
use std::sync::Arc;

/// Handle to a running IPC WebSocket server.
///
/// Returned by [`start_ipc_server`](crate::ipc::start_ipc_server).
///
/// # Lifecycle
///
/// Dropping this handle does **not** stop the server; call [`IpcServerHandle::shutdown`].
/// Shutdown stops accepting connections and closes every open socket, which
/// connected clients observe as a disconnect.
pub struct IpcServerHandle {
    pub(crate) local_addr: SocketAddr,
    pub(crate) auth_token: String,
    pub(crate) shutdown: Arc<watch::Sender<bool>>,
}

impl IpcServerHandle {
    /// Bound address. Useful when the server was started on port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Token clients must present in their first frame.
    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}
