use crate::ipc_tests::helpers::{adapter_for, connected_client, restart_test_host, start_test_host};

use bridge_core::backend::MemoryWalletBackend;
use bridge_core::error::ErrorKind;
use bridge_core::rpc::ConnectionState;

use serde_json::json;

use std::time::Duration;

/// **VALUE**: The UI survives a host restart without losing or hanging calls.
///
/// **WHY THIS MATTERS**: The host process can be suspended or restarted at any time.
/// Calls in flight at that moment must fail fast, and calls made while it is down
/// must go through once it is back.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - In-flight calls hang after the socket dies
/// - The client gives up reconnecting
/// - Requests made during the outage are dropped or fail
#[tokio::test]
async fn given_host_restart_when_calls_span_outage_then_lost_then_flushed() {
    // GIVEN: A connected client with a call parked on a confirmation prompt
    let adapter = adapter_for(MemoryWalletBackend::new());
    adapter
        .request(json!({"type": "NewWalletRequest", "password": "hunter22"}))
        .await
        .expect("wallet");
    let handle = start_test_host(adapter.clone()).await;
    let port = handle.port();
    let client = connected_client(port).await;

    let parked = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .request(json!({
                    "type": "PageRequest",
                    "origin": "https://dapp.example",
                    "payload": {
                        "type": "PERMISSION_REQUEST",
                        "appMeta": {"name": "Example dApp"},
                        "network": "testnet"
                    }
                }))
                .await
        })
    };
    while !adapter.confirmations().has_pending_request() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // WHEN: The host goes away
    handle.shutdown();

    // THEN: The parked call fails with TransportLost
    let error = tokio::time::timeout(Duration::from_secs(5), parked)
        .await
        .expect("parked call should settle")
        .expect("task")
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TransportLost);

    // WHEN: A call is made during the outage and the host then comes back
    let mut states = client.state_changes();
    states
        .wait_for(|state| *state != ConnectionState::Connected)
        .await
        .expect("state watch");
    let queued = {
        let client = client.clone();
        tokio::spawn(async move { client.request(json!({"type": "GetStateRequest"})).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let restarted = restart_test_host(port, adapter.clone()).await;

    // THEN: The queued call is delivered on the new link
    let state = tokio::time::timeout(Duration::from_secs(5), queued)
        .await
        .expect("queued call should settle")
        .expect("task")
        .expect("state");
    assert_eq!(state["type"], "GetStateResponse");
    assert_eq!(client.connection_state(), ConnectionState::Connected);
    assert_eq!(adapter.backend().bootstrap_count(), 1);

    client.close();
    restarted.shutdown();
}
