// Unit tests for the error taxonomy and wire classification

use crate::error::{BackendError, BridgeError, ErrorKind};
use crate::page::errors::{classify, error_message};

use serde_json::json;

/// **VALUE**: Every kind survives the trip to the wire and back.
///
/// **WHY THIS MATTERS**: Errors raised in the backend context are only useful to
/// callers if they arrive as the same typed variant.
///
/// **BUG THIS CATCHES**: A wire code that the classifier no longer recognizes, or a
/// kind whose message prefix is not stripped.
#[test]
fn given_typed_error_when_sent_over_wire_then_classified_back_to_same_kind() {
    for kind in ErrorKind::ALL {
        // GIVEN: An error of this kind with a detail message
        let original = BridgeError::new(kind, "detail");

        // WHEN: Encoded and classified
        let restored = BridgeError::from_wire(&original.to_wire());

        // THEN: Kind and message are preserved
        assert_eq!(restored.kind(), kind, "kind {kind} changed on the wire");
        assert_eq!(restored.message(), "detail");
    }
}

#[test]
fn given_network_not_granted_code_when_classified_then_not_granted() {
    let error = classify(&json!("NETWORK_NOT_GRANTED"));
    assert_eq!(error.kind(), ErrorKind::NotGranted);
}

#[test]
fn given_code_with_detail_when_classified_then_detail_kept() {
    let error = classify(&json!("INVALID_PARAMS: amount must be positive"));
    assert_eq!(error.kind(), ErrorKind::InvalidParams);
    assert_eq!(error.message(), "amount must be positive");
}

/// **VALUE**: Codes embedded in free text are still recognized, case-insensitively.
///
/// **BUG THIS CATCHES**: Hosts that wrap codes in longer messages would otherwise
/// surface as Unknown.
#[test]
fn given_code_inside_message_when_classified_then_matches_case_insensitively() {
    let error = classify(&json!("lookup failed: not_found for account 0x01"));
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

/// **VALUE**: The code a message starts with decides its kind.
///
/// **BUG THIS CATCHES**: Scanning the whole text in a fixed order, so a detail that
/// mentions another code overrides the leading one.
#[test]
fn given_leading_code_and_other_code_in_detail_when_classified_then_leading_code_wins() {
    let error = classify(&json!("INVALID_PARAMS: account NOT_FOUND"));

    assert_eq!(error.kind(), ErrorKind::InvalidParams);
    assert_eq!(error.message(), "account NOT_FOUND");
}

#[test]
fn given_object_message_with_code_and_detail_when_classified_then_kind_and_detail_kept() {
    let error = classify(&json!({ "message": "NOT_GRANTED: denied" }));

    assert_eq!(error.kind(), ErrorKind::NotGranted);
    assert_eq!(error.message(), "denied");
}

#[test]
fn given_array_or_object_payload_when_classified_then_message_extracted() {
    assert_eq!(
        classify(&json!(["NOT_GRANTED", "ignored"])).kind(),
        ErrorKind::NotGranted
    );
    assert_eq!(
        classify(&json!({"message": "NOT_FOUND"})).kind(),
        ErrorKind::NotFound
    );
    assert_eq!(error_message(&json!({"message": "boom"})), "boom");
}

/// **VALUE**: Unrecognized errors keep the host's text.
///
/// **WHY THIS MATTERS**: Unknown is the catch-all; losing the text would leave the
/// dApp with nothing to show or log.
#[test]
fn given_unrecognized_text_when_classified_then_unknown_with_original_text() {
    // GIVEN: A payload with no recognized code
    let payload = json!("Invalid password");

    // WHEN: Classified twice
    let first = classify(&payload);
    let second = classify(&payload);

    // THEN: Both are Unknown and carry the text verbatim
    assert_eq!(first.kind(), ErrorKind::Unknown);
    assert_eq!(first.message(), "Invalid password");
    assert_eq!(first.kind(), second.kind());
    assert_eq!(first.message(), second.message());
}

#[test]
fn given_empty_payload_when_classified_then_unknown_with_generic_message() {
    let error = classify(&json!(null));
    assert_eq!(error.kind(), ErrorKind::Unknown);
    assert!(!error.message().is_empty());
}

#[test]
fn given_backend_failure_when_converted_then_unknown_keeps_message_and_location() {
    // GIVEN: A generic backend failure
    let failure = BackendError::failed("Wallet is locked");
    let location = failure.location();

    // WHEN: Converted into the bridge taxonomy
    let error = BridgeError::from(failure);

    // THEN: It is Unknown, with the same message and origin
    assert_eq!(error.kind(), ErrorKind::Unknown);
    assert_eq!(error.message(), "Wallet is locked");
    assert_eq!(error.location(), location);
}

#[test]
fn given_backend_not_found_when_sent_over_wire_then_prefixed_with_code() {
    let wire = BackendError::not_found("Account 0x01 not found").to_wire();
    assert_eq!(wire, json!("NOT_FOUND: Account 0x01 not found"));
}
