//! Self-describing JSON messages exchanged between the two contexts.

use crate::error::transport::TransportError;

use common::ErrorLocation;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::panic::Location;

pub type CorrelationId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    Request,
    Response,
    Error,
    Notification,
}

impl EnvelopeKind {
    /// Requests, responses and errors pair up by correlation id; notifications never do.
    pub const fn is_correlated(&self) -> bool {
        !matches!(self, EnvelopeKind::Notification)
    }
}

impl Display for EnvelopeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            EnvelopeKind::Request => "request",
            EnvelopeKind::Response => "response",
            EnvelopeKind::Error => "error",
            EnvelopeKind::Notification => "notification",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub kind: EnvelopeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn request(correlation_id: CorrelationId, payload: Value) -> Self {
        Self {
            kind: EnvelopeKind::Request,
            correlation_id: Some(correlation_id),
            payload,
        }
    }

    pub fn response(correlation_id: CorrelationId, payload: Value) -> Self {
        Self {
            kind: EnvelopeKind::Response,
            correlation_id: Some(correlation_id),
            payload,
        }
    }

    pub fn error(correlation_id: CorrelationId, payload: Value) -> Self {
        Self {
            kind: EnvelopeKind::Error,
            correlation_id: Some(correlation_id),
            payload,
        }
    }

    pub fn notification(payload: Value) -> Self {
        Self {
            kind: EnvelopeKind::Notification,
            correlation_id: None,
            payload,
        }
    }

    pub fn encode(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a text frame. Correlated kinds without an id are rejected;
    /// an id on a notification is dropped.
    #[track_caller]
    pub fn decode(text: &str) -> Result<Self, TransportError> {
        let mut envelope: Envelope = serde_json::from_str(text)?;
        if envelope.kind.is_correlated() && envelope.correlation_id.is_none() {
            return Err(TransportError::Codec {
                message: format!("{} envelope without correlationId", envelope.kind),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        if !envelope.kind.is_correlated() {
            envelope.correlation_id = None;
        }
        Ok(envelope)
    }
}

/// First frame a client sends on a fresh socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthHandshake {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthHandshakeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthHandshakeResponse {
    pub fn accepted() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
        }
    }
}
