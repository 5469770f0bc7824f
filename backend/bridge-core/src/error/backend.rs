use crate::error::bridge::{BridgeError, ErrorKind};

use common::ErrorLocation;

use serde_json::Value;
use thiserror::Error as ThisError;

use std::panic::Location;

/// Failures raised by a wallet backend capability.
#[derive(Debug, Clone, ThisError)]
pub enum BackendError {
    #[error("Not Granted Error: {message} {location}")]
    NotGranted {
        message: String,
        location: ErrorLocation,
    },

    #[error("Not Found Error: {message} {location}")]
    NotFound {
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid Params Error: {message} {location}")]
    InvalidParams {
        message: String,
        location: ErrorLocation,
    },

    #[error("Backend Failure: {message} {location}")]
    Failed {
        message: String,
        location: ErrorLocation,
    },
}

impl BackendError {
    #[track_caller]
    pub fn not_granted(message: impl Into<String>) -> Self {
        BackendError::NotGranted {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        BackendError::NotFound {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        BackendError::InvalidParams {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn failed(message: impl Into<String>) -> Self {
        BackendError::Failed {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::NotGranted { .. } => ErrorKind::NotGranted,
            BackendError::NotFound { .. } => ErrorKind::NotFound,
            BackendError::InvalidParams { .. } => ErrorKind::InvalidParams,
            BackendError::Failed { .. } => ErrorKind::Unknown,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            BackendError::NotGranted { message, .. }
            | BackendError::NotFound { message, .. }
            | BackendError::InvalidParams { message, .. }
            | BackendError::Failed { message, .. } => message,
        }
    }

    pub fn location(&self) -> ErrorLocation {
        match self {
            BackendError::NotGranted { location, .. }
            | BackendError::NotFound { location, .. }
            | BackendError::InvalidParams { location, .. }
            | BackendError::Failed { location, .. } => *location,
        }
    }

    pub fn to_wire(&self) -> Value {
        BridgeError::from(self.clone()).to_wire()
    }
}

impl From<BackendError> for BridgeError {
    fn from(error: BackendError) -> Self {
        let location = error.location();
        let kind = error.kind();
        let message = match error {
            BackendError::NotGranted { message, .. }
            | BackendError::NotFound { message, .. }
            | BackendError::InvalidParams { message, .. }
            | BackendError::Failed { message, .. } => message,
        };
        match kind {
            ErrorKind::NotGranted => BridgeError::NotGranted { message, location },
            ErrorKind::NotFound => BridgeError::NotFound { message, location },
            ErrorKind::InvalidParams => BridgeError::InvalidParams { message, location },
            _ => BridgeError::Unknown { message, location },
        }
    }
}

impl From<serde_json::Error> for BackendError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        BackendError::InvalidParams {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
