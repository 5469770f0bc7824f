use crate::ipc_tests::helpers::{adapter_for, connected_client, start_test_host};

use bridge_core::backend::MemoryWalletBackend;
use bridge_core::confirmation::ConfirmationResult;
use bridge_core::error::ErrorKind;

use serde_json::{Value, json};

use std::time::Duration;

const ORIGIN: &str = "https://dapp.example";

fn page_request(payload: Value) -> Value {
    json!({"type": "PageRequest", "origin": ORIGIN, "payload": payload})
}

#[tokio::test]
async fn given_dapp_support_enabled_when_page_pings_then_pong() {
    let handle = start_test_host(adapter_for(MemoryWalletBackend::new())).await;
    let client = connected_client(handle.port()).await;

    let response = client
        .request(page_request(json!("PING")))
        .await
        .expect("page reply");

    assert_eq!(response, json!({"type": "PageResponse", "payload": "PONG"}));
    client.close();
    handle.shutdown();
}

#[tokio::test]
async fn given_dapp_support_disabled_when_page_pings_then_not_granted() {
    let backend = MemoryWalletBackend::new();
    backend.set_dapp_enabled(false);
    let handle = start_test_host(adapter_for(backend)).await;
    let client = connected_client(handle.port()).await;

    let error = client
        .request(page_request(json!("PING")))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::NotGranted);
    client.close();
    handle.shutdown();
}

/// **VALUE**: A page permission request relayed through the host waits for the user.
///
/// **WHY THIS MATTERS**: The approval UI and the page live in different contexts.
/// The confirmation store is the only thing joining them.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The host answers permission requests without a decision
/// - The approved account is not the one reported back to the page
/// - The session is not visible to the wallet's session list afterwards
#[tokio::test]
async fn given_permission_request_when_user_approves_then_session_listed() {
    // GIVEN: A host with a wallet and a connected UI client
    let adapter = adapter_for(MemoryWalletBackend::new());
    let handle = start_test_host(adapter.clone()).await;
    let client = connected_client(handle.port()).await;
    client
        .request(json!({"type": "NewWalletRequest", "password": "hunter22"}))
        .await
        .expect("wallet");
    let state = client
        .request(json!({"type": "GetStateRequest"}))
        .await
        .expect("state");
    let account = state["state"]["currentAccount"]["publicKey"]
        .as_str()
        .expect("current account")
        .to_string();

    // WHEN: The page asks for permission and the user approves
    let pending = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .request(page_request(json!({
                    "type": "PERMISSION_REQUEST",
                    "appMeta": {"name": "Example dApp"},
                    "network": "testnet",
                    "allowedPrivateData": 1
                })))
                .await
        })
    };
    let confirmations = adapter.confirmations().clone();
    let prompt = loop {
        if let Some(prompt) = confirmations.get_pending_request() {
            break prompt;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    assert_eq!(prompt.origin, ORIGIN);
    assert!(confirmations.resolve_confirmation(ConfirmationResult::approve(account.clone())));

    // THEN: The page gets the approved account
    let response = pending.await.expect("task").expect("permission");
    assert_eq!(response["payload"]["type"], "PERMISSION_RESPONSE");
    assert_eq!(response["payload"]["accountId"], json!(account));

    // AND: The wallet lists the new session
    let sessions = client
        .request(json!({"type": "DAppGetAllSessionsRequest"}))
        .await
        .expect("sessions");
    assert_eq!(
        sessions["sessions"][ORIGIN][0]["accountId"],
        json!(account)
    );

    client.close();
    handle.shutdown();
}
