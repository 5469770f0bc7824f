use crate::page::errors::classify;

use common::ErrorLocation;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error as ThisError;

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::panic::Location;

/// Stable, serializable name for every failure a bridge call can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    TransportLost,
    Timeout,
    NotGranted,
    NotFound,
    InvalidParams,
    Superseded,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::TransportLost,
        ErrorKind::Timeout,
        ErrorKind::NotGranted,
        ErrorKind::NotFound,
        ErrorKind::InvalidParams,
        ErrorKind::Superseded,
        ErrorKind::Unknown,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            ErrorKind::TransportLost => "TransportLost",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::NotGranted => "NotGranted",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidParams => "InvalidParams",
            ErrorKind::Superseded => "Superseded",
            ErrorKind::Unknown => "Unknown",
        }
    }

    /// Code carried on the wire when an error crosses a context boundary.
    pub const fn code(&self) -> &'static str {
        match self {
            ErrorKind::TransportLost => "TRANSPORT_LOST",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::NotGranted => "NOT_GRANTED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidParams => "INVALID_PARAMS",
            ErrorKind::Superseded => "SUPERSEDED",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }

    /// Text a dApp can show to its user.
    pub const fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::TransportLost => "Connection to the wallet was lost",
            ErrorKind::Timeout => "The wallet did not answer in time",
            ErrorKind::NotGranted => "Permission Not Granted",
            ErrorKind::NotFound => "Account Not Found. Try connect again",
            ErrorKind::InvalidParams => "Some of the parameters you provided are invalid",
            ErrorKind::Superseded => "The request was replaced by a newer one",
            ErrorKind::Unknown => "An unknown error occurred. Please try again",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum BridgeError {
    #[error("Transport Lost Error: {message} {location}")]
    TransportLost {
        message: String,
        location: ErrorLocation,
    },

    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

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

    #[error("Superseded Error: {message} {location}")]
    Superseded {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unknown Error: {message} {location}")]
    Unknown {
        message: String,
        location: ErrorLocation,
    },
}

impl BridgeError {
    #[track_caller]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let location = ErrorLocation::from(Location::caller());
        match kind {
            ErrorKind::TransportLost => BridgeError::TransportLost { message, location },
            ErrorKind::Timeout => BridgeError::Timeout { message, location },
            ErrorKind::NotGranted => BridgeError::NotGranted { message, location },
            ErrorKind::NotFound => BridgeError::NotFound { message, location },
            ErrorKind::InvalidParams => BridgeError::InvalidParams { message, location },
            ErrorKind::Superseded => BridgeError::Superseded { message, location },
            ErrorKind::Unknown => BridgeError::Unknown { message, location },
        }
    }

    #[track_caller]
    pub fn transport_lost(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransportLost, message)
    }

    #[track_caller]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    #[track_caller]
    pub fn not_granted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotGranted, message)
    }

    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    #[track_caller]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, message)
    }

    #[track_caller]
    pub fn superseded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Superseded, message)
    }

    #[track_caller]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::TransportLost { .. } => ErrorKind::TransportLost,
            BridgeError::Timeout { .. } => ErrorKind::Timeout,
            BridgeError::NotGranted { .. } => ErrorKind::NotGranted,
            BridgeError::NotFound { .. } => ErrorKind::NotFound,
            BridgeError::InvalidParams { .. } => ErrorKind::InvalidParams,
            BridgeError::Superseded { .. } => ErrorKind::Superseded,
            BridgeError::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            BridgeError::TransportLost { message, .. }
            | BridgeError::Timeout { message, .. }
            | BridgeError::NotGranted { message, .. }
            | BridgeError::NotFound { message, .. }
            | BridgeError::InvalidParams { message, .. }
            | BridgeError::Superseded { message, .. }
            | BridgeError::Unknown { message, .. } => message,
        }
    }

    pub fn location(&self) -> ErrorLocation {
        match self {
            BridgeError::TransportLost { location, .. }
            | BridgeError::Timeout { location, .. }
            | BridgeError::NotGranted { location, .. }
            | BridgeError::NotFound { location, .. }
            | BridgeError::InvalidParams { location, .. }
            | BridgeError::Superseded { location, .. }
            | BridgeError::Unknown { location, .. } => *location,
        }
    }

    /// Error payload as sent inside an `error` envelope or page error response.
    ///
    /// Coded kinds travel as `"CODE"` or `"CODE: detail"`; [`ErrorKind::Unknown`]
    /// travels as its bare message so the original text survives the trip.
    pub fn to_wire(&self) -> Value {
        let message = self.message();
        let text = match self.kind() {
            ErrorKind::Unknown => message.to_string(),
            kind if message.is_empty() => kind.code().to_string(),
            kind => format!("{}: {}", kind.code(), message),
        };
        Value::String(text)
    }

    /// Rebuilds a typed error from a wire payload. Total: anything that does not
    /// carry a known code becomes [`ErrorKind::Unknown`] holding the original text.
    #[track_caller]
    pub fn from_wire(payload: &Value) -> Self {
        classify(payload)
    }
}
