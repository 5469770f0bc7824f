pub mod backend;
pub mod bridge;
pub mod config;
pub mod ipc;
pub mod transport;

pub use backend::BackendError;
pub use bridge::{BridgeError, ErrorKind};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Bridge(#[from] bridge::BridgeError),

    #[error(transparent)]
    Backend(#[from] backend::BackendError),

    #[error(transparent)]
    Transport(#[from] transport::TransportError),

    #[error(transparent)]
    Ipc(#[from] ipc::IpcError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}
