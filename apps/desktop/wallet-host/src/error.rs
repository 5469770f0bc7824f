use bridge_core::error::BridgeError;
use bridge_core::error::config::ConfigError;
use bridge_core::error::ipc::IpcError;

use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

/// Errors that stop the wallet host from starting or running.
///
/// Written to stderr as JSON when startup fails, for whatever launched the host.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum HostError {
    /// Error from this binary
    #[error("Host Error: {message} {location}")]
    Host {
        message: String,
        location: ErrorLocation,
    },

    /// Configuration could not be loaded, validated or overridden
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// The IPC server could not be started
    #[error("Ipc Error: {message} {location}")]
    Ipc {
        message: String,
        location: ErrorLocation,
    },

    /// The wallet backend refused to bootstrap
    #[error("Backend Error: {message} {location}")]
    Backend {
        message: String,
        location: ErrorLocation,
    },
}

impl From<ConfigError> for HostError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        HostError::Config {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<IpcError> for HostError {
    #[track_caller]
    fn from(error: IpcError) -> Self {
        HostError::Ipc {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<BridgeError> for HostError {
    #[track_caller]
    fn from(error: BridgeError) -> Self {
        HostError::Backend {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<IoError> for HostError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        HostError::Host {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
