use crate::RedactedSecret;

/// **VALUE**: Verifies secrets never appear in Debug or Display output.
///
/// **WHY THIS MATTERS**: Wallet requests are logged at debug level by the adapter. An
/// `UnlockRequest` printed with `{:?}` must not contain the password.
///
/// **BUG THIS CATCHES**: Would catch someone replacing the manual Debug impl with a derive.
#[test]
fn given_secret_when_formatted_then_value_is_redacted() {
    // GIVEN: A secret
    let secret = RedactedSecret::new("hunter2");

    // WHEN: Formatting with Debug and Display
    let debug = format!("{secret:?}");
    let display = format!("{secret}");

    // THEN: Neither contains the secret
    assert!(!debug.contains("hunter2"));
    assert!(!display.contains("hunter2"));
    assert_eq!(secret.expose(), "hunter2");
    assert_eq!(secret.len(), 7);
}

/// **VALUE**: Verifies secrets deserialize from plain JSON strings but refuse to serialize.
///
/// **WHY THIS MATTERS**: Requests arrive as JSON, so deserialization must work; echoing a
/// secret back to a page would be a leak, so serialization must fail loudly.
///
/// **BUG THIS CATCHES**: Would catch a derived `Serialize` sneaking in.
#[test]
fn given_secret_when_round_tripped_through_json_then_only_deserialization_succeeds() {
    // GIVEN: A JSON string
    let secret: RedactedSecret = serde_json::from_str("\"p\"").unwrap();

    // WHEN: Serializing it back
    let result = serde_json::to_string(&secret);

    // THEN: Deserialization worked, serialization refused
    assert_eq!(secret.expose(), "p");
    assert!(result.is_err(), "Serialization must be refused");
}
