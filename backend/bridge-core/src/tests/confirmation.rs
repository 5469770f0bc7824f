// Unit tests for the single-slot confirmation store

use crate::confirmation::{
    ConfirmationKind, ConfirmationRequest, ConfirmationResult, ConfirmationStore,
    DEFAULT_CONFIRMATION_TIMEOUT,
};
use crate::error::ErrorKind;
use crate::page::protocol::{AllowedPrivateData, DappMetadata, PrivateDataPermission};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn connect_request(id: &str) -> ConfirmationRequest {
    ConfirmationRequest {
        id: id.to_string(),
        kind: ConfirmationKind::Connect,
        origin: "https://dapp.example".to_string(),
        app_meta: DappMetadata {
            name: "Example dApp".to_string(),
            url: None,
            icon: None,
        },
        network: "testnet".to_string(),
        network_rpc: "https://rpc.testnet.example.org".to_string(),
        private_data_permission: PrivateDataPermission::UponRequest,
        allowed_private_data: AllowedPrivateData::NONE,
        existing_permission: false,
        source_public_key: None,
        transaction_messages: None,
    }
}

async fn wait_for_pending(store: &ConfirmationStore, id: &str) {
    while store.get_pending_request().map(|request| request.id) != Some(id.to_string()) {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn given_pending_request_when_resolved_then_waiter_gets_result() {
    // GIVEN: A request waiting for a decision
    let store = ConfirmationStore::default();
    let waiter = {
        let store = store.clone();
        tokio::spawn(async move { store.request_confirmation(connect_request("c-1")).await })
    };
    wait_for_pending(&store, "c-1").await;
    assert!(store.has_pending_request());

    // WHEN: The UI approves it
    let resolved = store.resolve_confirmation(ConfirmationResult::approve("0xabc"));

    // THEN: The waiter gets the decision and the slot is clear
    assert!(resolved);
    let result = waiter.await.expect("task").expect("decision");
    assert!(result.confirmed);
    assert_eq!(result.account_public_key.as_deref(), Some("0xabc"));
    assert!(!store.has_pending_request());
}

/// **VALUE**: A second dApp prompt never leaves the first caller hanging.
///
/// **WHY THIS MATTERS**: There is one approval slot. If replacing it silently dropped
/// the earlier waiter, that dApp call would never return.
///
/// **BUG THIS CATCHES**: Overwriting the slot without settling the previous resolver.
#[tokio::test]
async fn given_pending_request_when_new_request_arrives_then_previous_superseded() {
    // GIVEN: A pending request
    let store = ConfirmationStore::default();
    let first = {
        let store = store.clone();
        tokio::spawn(async move { store.request_confirmation(connect_request("c-1")).await })
    };
    wait_for_pending(&store, "c-1").await;

    // WHEN: Another request takes the slot
    let second = {
        let store = store.clone();
        tokio::spawn(async move { store.request_confirmation(connect_request("c-2")).await })
    };

    // THEN: The first fails as Superseded and the second is now pending
    let error = first.await.expect("task").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Superseded);
    wait_for_pending(&store, "c-2").await;

    store.resolve_confirmation(ConfirmationResult::deny());
    let result = second.await.expect("task").expect("decision");
    assert!(!result.confirmed);
}

#[tokio::test(start_paused = true)]
async fn given_unanswered_request_when_window_elapses_then_timeout_and_slot_cleared() {
    // GIVEN: A store with the default window
    let store = ConfirmationStore::default();
    assert_eq!(store.timeout(), DEFAULT_CONFIRMATION_TIMEOUT);

    // WHEN: Nobody answers
    let result = store.request_confirmation(connect_request("c-1")).await;

    // THEN: The caller times out and nothing is left pending
    assert_eq!(result.unwrap_err().kind(), ErrorKind::Timeout);
    assert!(store.get_pending_request().is_none());
}

#[test]
fn given_no_pending_request_when_resolved_then_returns_false() {
    let store = ConfirmationStore::default();

    assert!(!store.resolve_confirmation(ConfirmationResult::deny()));
}

#[tokio::test]
async fn given_stale_id_when_resolving_by_id_then_pending_request_untouched() {
    // GIVEN: Request c-2 is pending
    let store = ConfirmationStore::new(Duration::from_secs(5));
    let waiter = {
        let store = store.clone();
        tokio::spawn(async move { store.request_confirmation(connect_request("c-2")).await })
    };
    wait_for_pending(&store, "c-2").await;

    // WHEN: The UI answers a request it rendered earlier
    let stale = store.resolve_confirmation_for("c-1", ConfirmationResult::approve("0xabc"));

    // THEN: Nothing is resolved until the current id is used
    assert!(!stale);
    assert!(store.has_pending_request());
    assert!(store.resolve_confirmation_for("c-2", ConfirmationResult::deny()));
    assert!(!waiter.await.expect("task").expect("decision").confirmed);
}

#[tokio::test]
async fn given_subscriber_when_request_published_and_resolved_then_notified_each_time() {
    // GIVEN: A UI subscriber
    let store = ConfirmationStore::default();
    let notified = Arc::new(AtomicUsize::new(0));
    let subscription = {
        let notified = notified.clone();
        store.subscribe(move || {
            notified.fetch_add(1, Ordering::SeqCst);
        })
    };

    // WHEN: A request appears and is resolved
    let waiter = {
        let store = store.clone();
        tokio::spawn(async move { store.request_confirmation(connect_request("c-1")).await })
    };
    wait_for_pending(&store, "c-1").await;
    store.resolve_confirmation(ConfirmationResult::deny());
    waiter.await.expect("task").expect("decision");

    // THEN: The subscriber saw both transitions, and none after unsubscribing
    assert_eq!(notified.load(Ordering::SeqCst), 2);
    subscription.unsubscribe();
    store.resolve_confirmation(ConfirmationResult::deny());
    assert_eq!(notified.load(Ordering::SeqCst), 2);
}

/// **VALUE**: A caller that gives up on a prompt takes it down with it.
///
/// **WHY THIS MATTERS**: A dApp request can be cancelled by an outer deadline. A
/// prompt left behind would be approved by the user for a caller that no longer
/// exists, and would block the slot until the store's own timeout.
///
/// **BUG THIS CATCHES**: Clearing the slot only from the timeout branch, so a
/// dropped waiter leaves its request pending.
#[tokio::test(start_paused = true)]
async fn given_waiter_dropped_by_outer_deadline_when_checked_then_slot_cleared() {
    // GIVEN: A UI subscriber and a caller willing to wait only one second
    let store = ConfirmationStore::default();
    let notified = Arc::new(AtomicUsize::new(0));
    let _subscription = {
        let notified = notified.clone();
        store.subscribe(move || {
            notified.fetch_add(1, Ordering::SeqCst);
        })
    };

    // WHEN: The outer deadline drops the waiting future
    let outcome = tokio::time::timeout(
        Duration::from_secs(1),
        store.request_confirmation(connect_request("c-1")),
    )
    .await;

    // THEN: Nothing is left to answer
    assert!(outcome.is_err());
    assert!(!store.has_pending_request());
    assert!(!store.resolve_confirmation(ConfirmationResult::approve("0xabc")));

    // AND: The UI heard the request appear and disappear
    assert_eq!(notified.load(Ordering::SeqCst), 2);
}

#[test]
fn given_request_with_messages_when_serialized_then_ui_field_names_used() {
    let mut request = connect_request("c-1");
    request.kind = ConfirmationKind::PrivateNotes;
    request.transaction_messages = Some(vec!["Share private notes (all)".to_string()]);

    let value = serde_json::to_value(&request).expect("serialize");

    assert_eq!(value["kind"], "privateNotes");
    assert_eq!(value["transactionMessages"][0], "Share private notes (all)");
    let bare = serde_json::to_value(connect_request("c-2")).expect("serialize");
    assert!(bare.get("transactionMessages").is_none());
}
