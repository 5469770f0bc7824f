// Unit tests for the in-process adapter dispatch table

use crate::adapter::{InProcessAdapter, WalletRequest, WalletRequestType, WalletResponse};
use crate::backend::{AnalyticsEvent, MemoryWalletBackend, WalletBackend, WalletStatus};
use crate::confirmation::ConfirmationStore;
use crate::error::ErrorKind;

use serde_json::json;
use tokio::sync::mpsc;

use std::sync::Arc;

fn adapter_with(backend: MemoryWalletBackend) -> InProcessAdapter<MemoryWalletBackend> {
    InProcessAdapter::new(Arc::new(backend), ConfirmationStore::default())
}

/// **VALUE**: The wallet backend bootstraps exactly once no matter how many calls race.
///
/// **WHY THIS MATTERS**: Bootstrapping opens stores and starts sync. Running it twice
/// concurrently corrupts state.
///
/// **BUG THIS CATCHES**: A check-then-set init guard that lets concurrent first
/// requests all see "not initialized".
#[tokio::test]
async fn given_concurrent_first_requests_when_dispatched_then_backend_initialized_once() {
    // GIVEN: A fresh adapter
    let adapter = adapter_with(MemoryWalletBackend::new());
    assert!(!adapter.is_initialized());

    // WHEN: Ten requests arrive at once
    let calls = (0..10).map(|_| {
        let adapter = adapter.clone();
        async move { adapter.request(json!({"type": "GetStateRequest"})).await }
    });
    let results = futures_util::future::join_all(calls).await;

    // THEN: All succeed and the backend bootstrapped once
    assert!(results.iter().all(Result::is_ok));
    assert!(adapter.is_initialized());
    assert_eq!(adapter.backend().bootstrap_count(), 1);

    // AND: Further init calls are no-ops
    adapter.init().await.expect("init");
    assert_eq!(adapter.backend().bootstrap_count(), 1);
}

#[tokio::test]
async fn given_unknown_type_when_requested_then_no_response_body() {
    let adapter = adapter_with(MemoryWalletBackend::new());

    let response = adapter
        .request(json!({"type": "TeleportRequest"}))
        .await
        .expect("unknown types are not errors");

    assert!(response.is_none());
}

#[tokio::test]
async fn given_missing_type_when_requested_then_no_response_body() {
    let adapter = adapter_with(MemoryWalletBackend::new());

    let response = adapter.request(json!({"password": "x"})).await.expect("ok");

    assert!(response.is_none());
}

#[tokio::test]
async fn given_known_type_with_missing_field_when_requested_then_invalid_params() {
    // GIVEN: An UnlockRequest without its password
    let adapter = adapter_with(MemoryWalletBackend::with_locked_wallet("hunter22"));

    // WHEN: It is dispatched
    let error = adapter
        .request(json!({"type": "UnlockRequest"}))
        .await
        .unwrap_err();

    // THEN: It is rejected before reaching the backend
    assert_eq!(error.kind(), ErrorKind::InvalidParams);
    assert!(error.message().contains("UnlockRequest"));
}

#[tokio::test]
async fn given_locked_wallet_when_unlocked_then_state_reports_ready() {
    // GIVEN: A locked wallet
    let adapter = adapter_with(MemoryWalletBackend::with_locked_wallet("hunter22"));

    // WHEN: The right password is supplied
    let unlock = adapter
        .request(json!({"type": "UnlockRequest", "password": "hunter22"}))
        .await
        .expect("unlock");

    // THEN: The response is typed and the state flips to READY
    assert_eq!(unlock, Some(json!({"type": "UnlockResponse"})));
    let state = adapter
        .request(json!({"type": "GetStateRequest"}))
        .await
        .expect("state")
        .expect("body");
    assert_eq!(state["type"], "GetStateResponse");
    assert_eq!(state["state"]["status"], "READY");
    assert_eq!(state["state"]["accounts"].as_array().map(Vec::len), Some(1));

    // AND: Unlocking again is accepted without bootstrapping the backend again
    let again = adapter
        .request(json!({"type": "UnlockRequest", "password": "hunter22"}))
        .await
        .expect("second unlock");
    assert_eq!(again, Some(json!({"type": "UnlockResponse"})));
    assert_eq!(adapter.backend().bootstrap_count(), 1);
}

#[tokio::test]
async fn given_wrong_password_when_unlocking_then_unknown_error_with_backend_message() {
    let adapter = adapter_with(MemoryWalletBackend::with_locked_wallet("hunter22"));

    let error = adapter
        .dispatch(WalletRequest::UnlockRequest {
            password: "wrong".into(),
        })
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Unknown);
    assert_eq!(error.message(), "Invalid password");
    assert_eq!(
        adapter.backend().get_state().await.expect("state").status,
        WalletStatus::Locked
    );
}

#[tokio::test]
async fn given_subscriber_when_backend_state_changes_then_state_updated_pushed() {
    // GIVEN: An initialized adapter with a subscriber
    let adapter = adapter_with(MemoryWalletBackend::with_locked_wallet("hunter22"));
    adapter.init().await.expect("init");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _subscription = adapter.subscribe(move |notification| {
        let _ = tx.send(notification.clone());
    });

    // WHEN: A request changes wallet state
    adapter
        .dispatch(WalletRequest::UnlockRequest {
            password: "hunter22".into(),
        })
        .await
        .expect("unlock");

    // THEN: Subscribers get a StateUpdated notification
    let notification = rx.recv().await.expect("notification");
    assert_eq!(notification, json!({"type": "StateUpdated"}));
}

#[tokio::test]
async fn given_analytics_requests_when_dispatched_then_backend_records_them() {
    let adapter = adapter_with(MemoryWalletBackend::new());

    adapter
        .request(json!({"type": "SendPageEventRequest", "path": "/receive"}))
        .await
        .expect("page event");
    adapter
        .request(json!({
            "type": "SendTrackEventRequest",
            "event": "send_clicked",
            "properties": {"amount": 5}
        }))
        .await
        .expect("track event");

    let events = adapter.backend().recorded_events();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], AnalyticsEvent::Page { path, .. } if path == "/receive"));
    assert!(matches!(&events[1], AnalyticsEvent::Track { event, .. } if event == "send_clicked"));
}

#[tokio::test]
async fn given_new_wallet_when_accounts_managed_then_sessions_and_state_follow() {
    // GIVEN: A freshly registered wallet
    let adapter = adapter_with(MemoryWalletBackend::new());
    adapter
        .request(json!({"type": "NewWalletRequest", "password": "hunter22"}))
        .await
        .expect("new wallet");

    // WHEN: A second account is created and renamed
    adapter
        .request(json!({"type": "CreateAccountRequest", "name": "Savings"}))
        .await
        .expect("create");
    let state = adapter.backend().get_state().await.expect("state");
    let savings = state.current_account.expect("current account");
    assert_eq!(savings.name, "Savings");

    let response = adapter
        .dispatch(WalletRequest::EditAccountRequest {
            account_public_key: savings.public_key.clone(),
            name: "Rainy day".to_string(),
        })
        .await
        .expect("edit");

    // THEN: The rename is visible and there are no dApp sessions yet
    assert_eq!(response, WalletResponse::EditAccountResponse);
    let state = adapter.backend().get_state().await.expect("state");
    assert_eq!(state.accounts.len(), 2);
    assert_eq!(state.accounts[1].name, "Rainy day");
    let sessions = adapter
        .request(json!({"type": "DAppGetAllSessionsRequest"}))
        .await
        .expect("sessions")
        .expect("body");
    assert_eq!(sessions["sessions"], json!({}));
}

#[test]
fn given_request_with_password_when_debug_formatted_then_password_redacted() {
    let request: WalletRequest = serde_json::from_value(json!({
        "type": "UnlockRequest",
        "password": "hunter22"
    }))
    .expect("valid request");

    let debug = format!("{request:?}");

    assert!(!debug.contains("hunter22"));
    assert_eq!(request.request_type(), WalletRequestType::Unlock);
}

#[test]
fn given_every_request_type_when_looked_up_by_name_then_round_trips() {
    for kind in WalletRequestType::ALL {
        assert_eq!(WalletRequestType::from_name(kind.name()), Some(kind));
    }
    assert_eq!(WalletRequestType::from_name("UnlockResponse"), None);
}
