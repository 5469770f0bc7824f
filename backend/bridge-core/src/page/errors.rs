//! Deterministic mapping from host error payloads to typed errors.

use crate::error::bridge::{BridgeError, ErrorKind};
use crate::page::protocol::DappErrorType;

use serde_json::Value;

/// Text carried by an error payload: a bare string, the first element of an
/// array, or the `message` field of an object.
pub fn error_message(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        Value::Array(items) => items.first().map(error_message).unwrap_or_default(),
        Value::Object(fields) => match fields.get("message") {
            Some(Value::String(text)) => text.clone(),
            _ => payload.to_string(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn dapp_kind(code: DappErrorType) -> ErrorKind {
    match code {
        DappErrorType::NetworkNotGranted | DappErrorType::NotGranted => ErrorKind::NotGranted,
        DappErrorType::NotFound => ErrorKind::NotFound,
        DappErrorType::InvalidParams => ErrorKind::InvalidParams,
    }
}

/// Kind named by a leading `CODE` or `CODE:`, if any.
fn leading_kind(upper: &str) -> Option<ErrorKind> {
    let head = upper.split_once(':').map_or(upper, |(head, _)| head).trim();
    DappErrorType::ALL
        .into_iter()
        .find(|code| code.code() == head)
        .map(dapp_kind)
        .or_else(|| ErrorKind::ALL.into_iter().find(|kind| kind.code() == head))
}

/// A leading code wins. Otherwise recognized codes are matched as a
/// case-insensitive substring. Host-side failures (`TRANSPORT_LOST`, `TIMEOUT`,
/// `SUPERSEDED`) keep their kind when they come back through an `error` envelope.
pub fn error_kind(message: &str) -> ErrorKind {
    let upper = message.to_ascii_uppercase();
    if let Some(kind) = leading_kind(&upper) {
        return kind;
    }
    for code in DappErrorType::ALL {
        if upper.contains(code.code()) {
            return dapp_kind(code);
        }
    }
    for kind in [
        ErrorKind::TransportLost,
        ErrorKind::Timeout,
        ErrorKind::Superseded,
    ] {
        if upper.starts_with(kind.code()) {
            return kind;
        }
    }
    ErrorKind::Unknown
}

/// Strips a leading `CODE:` so the detail reads cleanly.
fn detail(message: &str, kind: ErrorKind) -> String {
    match message.split_once(':') {
        Some((code, rest))
            if kind != ErrorKind::Unknown && code.trim().eq_ignore_ascii_case(kind.code()) =>
        {
            rest.trim().to_string()
        }
        _ => message.to_string(),
    }
}

#[track_caller]
pub fn classify(payload: &Value) -> BridgeError {
    let message = error_message(payload);
    let kind = error_kind(&message);
    match kind {
        ErrorKind::Unknown if message.is_empty() => {
            BridgeError::unknown(ErrorKind::Unknown.user_message())
        }
        ErrorKind::Unknown => BridgeError::unknown(message),
        kind => BridgeError::new(kind, detail(&message, kind)),
    }
}
