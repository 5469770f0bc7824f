//! Wiring of the wallet host: backend, confirmation store, adapter and IPC server.

use crate::error::HostError;

use bridge_core::adapter::InProcessAdapter;
use bridge_core::backend::MemoryWalletBackend;
use bridge_core::config::BridgeConfig;
use bridge_core::confirmation::{ConfirmationResult, ConfirmationStore};
use bridge_core::ipc::{IpcServerHandle, start_ipc_server};

use std::net::SocketAddr;
use std::sync::Arc;

use log::info;

/// What a UI process needs to reach the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub address: SocketAddr,
    pub auth_token: String,
}

/// A running wallet host.
///
/// Dropping it leaves the server running; call [`WalletHost::shutdown`].
pub struct WalletHost {
    adapter: InProcessAdapter<MemoryWalletBackend>,
    server: IpcServerHandle,
}

impl WalletHost {
    /// Bootstraps the backend and starts serving on `config.ipc.port`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Backend`] if the backend cannot bootstrap and
    /// [`HostError::Ipc`] if the port cannot be bound.
    pub async fn start(config: &BridgeConfig) -> Result<Self, HostError> {
        let backend = Arc::new(MemoryWalletBackend::new());
        let confirmations = ConfirmationStore::new(config.confirmation.timeout());
        let adapter = InProcessAdapter::new(backend, confirmations);

        adapter.init().await?;

        let server = start_ipc_server(
            config.ipc.port,
            config.ipc.auth_token.clone(),
            adapter.clone(),
        )
        .await?;
        info!("Wallet host serving on {}", server.local_addr());

        Ok(Self { adapter, server })
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            address: self.server.local_addr(),
            auth_token: self.server.auth_token().to_string(),
        }
    }

    pub fn adapter(&self) -> &InProcessAdapter<MemoryWalletBackend> {
        &self.adapter
    }

    /// Denies any pending confirmation, then stops the server.
    pub fn shutdown(&self) {
        let confirmations = self.adapter.confirmations();
        if confirmations.has_pending_request() {
            info!("Denying pending confirmation on shutdown");
            confirmations.resolve_confirmation(ConfirmationResult::deny());
        }
        self.server.shutdown();
        info!("Wallet host stopped");
    }

    pub fn is_shut_down(&self) -> bool {
        self.server.is_shut_down()
    }
}
