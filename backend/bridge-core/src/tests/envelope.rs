use crate::envelope::{AuthHandshakeResponse, Envelope, EnvelopeKind};

use serde_json::json;

/// **VALUE**: Verifies the JSON shape other contexts rely on.
///
/// **BUG THIS CATCHES**: A serde rename regression (e.g. `correlation_id` instead of
/// `correlationId`) that would silently break every peer.
#[test]
fn given_request_envelope_when_encoded_then_uses_camel_case_and_lowercase_kind() {
    // GIVEN: A request envelope
    let envelope = Envelope::request(7, json!({"type": "GetStateRequest"}));

    // WHEN: Encoded
    let text = envelope.encode().expect("encode");
    let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");

    // THEN: Field names and kind match the wire format
    assert_eq!(value["kind"], "request");
    assert_eq!(value["correlationId"], 7);
    assert_eq!(value["payload"]["type"], "GetStateRequest");
}

#[test]
fn given_response_without_correlation_id_when_decoded_then_rejected() {
    let result = Envelope::decode(r#"{"kind":"response","payload":{}}"#);
    assert!(result.is_err(), "uncorrelated response must be rejected");
}

#[test]
fn given_notification_with_correlation_id_when_decoded_then_id_dropped() {
    let envelope = Envelope::decode(
        r#"{"kind":"notification","correlationId":3,"payload":{"type":"StateUpdated"}}"#,
    )
    .expect("decode");

    assert_eq!(envelope.kind, EnvelopeKind::Notification);
    assert_eq!(envelope.correlation_id, None);
}

#[test]
fn given_notification_when_encoded_then_correlation_id_omitted() {
    let text = Envelope::notification(json!({"type": "StateUpdated"}))
        .encode()
        .expect("encode");
    assert!(!text.contains("correlationId"));
}

#[test]
fn given_rejected_handshake_when_serialized_then_error_present() {
    let text = serde_json::to_string(&AuthHandshakeResponse::rejected("bad token")).expect("json");
    assert_eq!(text, r#"{"success":false,"error":"bad token"}"#);

    let text = serde_json::to_string(&AuthHandshakeResponse::accepted()).expect("json");
    assert_eq!(text, r#"{"success":true}"#);
}
