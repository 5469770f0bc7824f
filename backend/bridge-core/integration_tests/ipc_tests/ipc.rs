use crate::ipc_tests::helpers::{
    TEST_AUTH_TOKEN, adapter_for, authenticate, connect_to_server, connected_client,
    is_connection_closed, receive_envelope, send_text, start_test_host,
};

use bridge_core::backend::MemoryWalletBackend;
use bridge_core::envelope::{Envelope, EnvelopeKind};
use bridge_core::error::ErrorKind;

use serde_json::{Value, json};
use tokio::sync::mpsc;

use std::time::Duration;

/// **VALUE**: Verifies that a client presenting the right token is accepted.
///
/// **WHY THIS MATTERS**: The handshake is the only thing standing between any local
/// process and the wallet. It must accept the host's own UI.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The handshake frame format drifts between client and server
/// - The server never answers the handshake
#[tokio::test]
async fn given_valid_token_when_authenticating_then_accepted() {
    // GIVEN: IPC server running on a free port
    let handle = start_test_host(adapter_for(MemoryWalletBackend::new())).await;

    // WHEN: Client authenticates with the right token
    let mut ws = connect_to_server(handle.port()).await;
    let response = authenticate(&mut ws, TEST_AUTH_TOKEN).await;

    // THEN: The server accepts
    assert!(response.success, "Auth should succeed");
    assert!(response.error.is_none());
    handle.shutdown();
}

/// **VALUE**: Verifies that a wrong token is refused and the socket closed.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Token comparison is skipped or inverted
/// - The server keeps serving a connection after a failed handshake
#[tokio::test]
async fn given_invalid_token_when_authenticating_then_rejected_and_closed() {
    // GIVEN: IPC server running
    let handle = start_test_host(adapter_for(MemoryWalletBackend::new())).await;

    // WHEN: Client authenticates with the wrong token
    let mut ws = connect_to_server(handle.port()).await;
    let response = authenticate(&mut ws, "wrong-token").await;

    // THEN: The server refuses and hangs up
    assert!(!response.success, "Auth should fail");
    assert!(response.error.is_some());
    assert!(is_connection_closed(&mut ws).await);
    handle.shutdown();
}

#[tokio::test]
async fn given_envelope_before_handshake_when_sent_then_connection_closed() {
    let handle = start_test_host(adapter_for(MemoryWalletBackend::new())).await;

    let mut ws = connect_to_server(handle.port()).await;
    let early = Envelope::request(1, json!({"type": "GetStateRequest"}))
        .encode()
        .expect("encode");
    send_text(&mut ws, &early).await;

    assert!(is_connection_closed(&mut ws).await);
    handle.shutdown();
}

/// **VALUE**: A UI request travels client → socket → adapter → backend and back.
///
/// **WHY THIS MATTERS**: This is the whole bridge in one call. Every UI action
/// depends on this path.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Correlation ids are lost across the socket
/// - The adapter bootstraps the backend more than once per host
/// - Typed responses are not relayed verbatim
#[tokio::test]
async fn given_locked_wallet_when_unlocked_over_socket_then_state_ready() {
    // GIVEN: A host with a locked wallet and a connected RPC client
    let adapter = adapter_for(MemoryWalletBackend::with_locked_wallet("hunter22"));
    let handle = start_test_host(adapter.clone()).await;
    let client = connected_client(handle.port()).await;

    // WHEN: The UI unlocks and reads state
    let unlock = client
        .request(json!({"type": "UnlockRequest", "password": "hunter22"}))
        .await
        .expect("unlock");
    let state = client
        .request(json!({"type": "GetStateRequest"}))
        .await
        .expect("state");

    // THEN: Both replies are typed and the backend bootstrapped once
    assert_eq!(unlock, json!({"type": "UnlockResponse"}));
    assert_eq!(state["state"]["status"], "READY");
    assert_eq!(adapter.backend().bootstrap_count(), 1);

    client.close();
    handle.shutdown();
}

#[tokio::test]
async fn given_backend_error_when_requested_over_socket_then_typed_error() {
    let handle = start_test_host(adapter_for(MemoryWalletBackend::with_locked_wallet("hunter22"))).await;
    let client = connected_client(handle.port()).await;

    let error = client
        .request(json!({"type": "UnlockRequest", "password": "nope"}))
        .await
        .unwrap_err();
    let malformed = client
        .request(json!({"type": "UnlockRequest"}))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Unknown);
    assert_eq!(error.message(), "Invalid password");
    assert_eq!(malformed.kind(), ErrorKind::InvalidParams);

    client.close();
    handle.shutdown();
}

#[tokio::test]
async fn given_unknown_request_type_when_sent_then_null_response() {
    let handle = start_test_host(adapter_for(MemoryWalletBackend::new())).await;
    let client = connected_client(handle.port()).await;

    let response = client
        .request(json!({"type": "SelfDestructRequest"}))
        .await
        .expect("unknown types still get a reply");

    assert_eq!(response, Value::Null);
    client.close();
    handle.shutdown();
}

/// **VALUE**: A malformed frame carrying a correlation id gets an error reply.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - A bad frame kills the connection
/// - The caller behind a bad frame is left waiting forever
#[tokio::test]
async fn given_malformed_envelope_with_id_when_sent_then_invalid_params_reply() {
    // GIVEN: An authenticated raw socket
    let handle = start_test_host(adapter_for(MemoryWalletBackend::new())).await;
    let mut ws = connect_to_server(handle.port()).await;
    assert!(authenticate(&mut ws, TEST_AUTH_TOKEN).await.success);

    // WHEN: It sends a frame with an unknown kind
    send_text(&mut ws, r#"{"kind": "shout", "correlationId": 41, "payload": {}}"#).await;

    // THEN: The error reply carries the same id and INVALID_PARAMS
    let reply = receive_envelope(&mut ws).await;
    assert_eq!(reply.kind, EnvelopeKind::Error);
    assert_eq!(reply.correlation_id, Some(41));
    assert!(
        reply
            .payload
            .as_str()
            .is_some_and(|text| text.starts_with("INVALID_PARAMS"))
    );

    // AND: The connection still serves requests
    let request = Envelope::request(42, json!({"type": "GetStateRequest"}))
        .encode()
        .expect("encode");
    send_text(&mut ws, &request).await;
    let reply = receive_envelope(&mut ws).await;
    assert_eq!(reply.kind, EnvelopeKind::Response);
    assert_eq!(reply.correlation_id, Some(42));
    handle.shutdown();
}

#[tokio::test]
async fn given_subscribed_client_when_state_changes_then_notification_pushed() {
    // GIVEN: A connected client listening for notifications
    let handle = start_test_host(adapter_for(MemoryWalletBackend::with_locked_wallet("hunter22"))).await;
    let client = connected_client(handle.port()).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _subscription = client.subscribe(move |payload| {
        let _ = tx.send(payload.clone());
    });

    // WHEN: A request mutates wallet state
    client
        .request(json!({"type": "UnlockRequest", "password": "hunter22"}))
        .await
        .expect("unlock");

    // THEN: The client receives StateUpdated without asking
    let notification = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("Timed out waiting for notification")
        .expect("notification");
    assert_eq!(notification, json!({"type": "StateUpdated"}));

    client.close();
    handle.shutdown();
}
