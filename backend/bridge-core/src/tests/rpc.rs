// Unit tests for the RPC client over the in-memory transport

use crate::envelope::Envelope;
use crate::error::ErrorKind;
use crate::rpc::{ConnectionState, RpcClient, RpcClientConfig, Subscribers};
use crate::transport::{MemoryListener, MemoryPeer, MemoryTransport};

use serde_json::{Value, json};
use tokio::sync::mpsc;

use std::collections::HashSet;
use std::time::Duration;

fn test_config() -> RpcClientConfig {
    RpcClientConfig {
        reconnect_delay: Duration::from_millis(50),
        reconnect_max_delay: Duration::from_millis(50),
        request_timeout: None,
    }
}

async fn accept(listener: &mut MemoryListener) -> MemoryPeer {
    listener.accept().await.expect("client should open a link")
}

async fn wait_for_outage(client: &RpcClient) {
    client
        .state_changes()
        .wait_for(|state| *state != ConnectionState::Connected)
        .await
        .expect("state watch");
}

/// **VALUE**: Concurrent callers each get their own answer.
///
/// **WHY THIS MATTERS**: Correlation ids are the only thing tying a response to its
/// caller. Reuse would hand one caller another caller's data.
///
/// **BUG THIS CATCHES**: Non-atomic id generation, or routing by arrival order.
#[tokio::test]
async fn given_concurrent_requests_when_answered_then_ids_unique_and_routed_to_caller() {
    // GIVEN: A connected client and a backend that records ids and echoes payloads
    let (transport, mut listener) = MemoryTransport::pair();
    let client = RpcClient::connect(transport, test_config());
    let mut peer = accept(&mut listener).await;

    let backend = tokio::spawn(async move {
        let mut ids = Vec::new();
        while ids.len() < 20 {
            let envelope = peer.recv().await.expect("request");
            let id = envelope.correlation_id.expect("request id");
            ids.push(id);
            peer.send(Envelope::response(id, envelope.payload))
                .await
                .expect("reply");
        }
        ids
    });

    // WHEN: 20 requests run concurrently
    let calls = (0..20).map(|n| {
        let client = client.clone();
        tokio::spawn(async move { (n, client.request(json!({ "n": n })).await) })
    });
    let results = futures_util::future::join_all(calls).await;

    // THEN: Every caller got its own payload back and no id repeated
    for result in results {
        let (n, reply) = result.expect("task");
        assert_eq!(reply.expect("reply"), json!({ "n": n }));
    }
    let ids = backend.await.expect("backend task");
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len(), "correlation ids must be unique");
}

#[tokio::test]
async fn given_two_requests_when_answered_out_of_order_then_each_caller_gets_its_reply() {
    // GIVEN: A connected client
    let (transport, mut listener) = MemoryTransport::pair();
    let client = RpcClient::connect(transport, test_config());
    let mut peer = accept(&mut listener).await;

    // WHEN: The backend answers the second request before the first
    let backend = async {
        let first = peer.recv().await.expect("first");
        let second = peer.recv().await.expect("second");
        for envelope in [second, first] {
            let id = envelope.correlation_id.expect("id");
            peer.send(Envelope::response(id, json!({ "echo": envelope.payload })))
                .await
                .expect("reply");
        }
    };
    let (a, b, _) = tokio::join!(
        client.request(json!("a")),
        client.request(json!("b")),
        backend
    );

    // THEN: Replies follow the ids, not arrival order
    assert_eq!(a.expect("a"), json!({ "echo": "a" }));
    assert_eq!(b.expect("b"), json!({ "echo": "b" }));
}

/// **VALUE**: A repeated response settles its caller once and goes nowhere else.
///
/// **BUG THIS CATCHES**: Keeping the pending entry after the first reply, or
/// routing an unknown response to notification subscribers.
#[tokio::test]
async fn given_duplicate_response_when_received_then_delivered_once_and_link_kept() {
    // GIVEN: A connected client with a notification subscriber
    let (transport, mut listener) = MemoryTransport::pair();
    let client = RpcClient::connect(transport, test_config());
    let mut peer = accept(&mut listener).await;
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let _subscription = client.subscribe(move |value| {
        let _ = seen_tx.send(value.clone());
    });

    // WHEN: The backend answers the first request twice
    let backend = async {
        let request = peer.recv().await.expect("request");
        let id = request.correlation_id.expect("id");
        for reply in ["first", "again"] {
            peer.send(Envelope::response(id, json!(reply)))
                .await
                .expect("reply");
        }
    };
    let (reply, _) = tokio::join!(client.request(json!("once")), backend);

    // THEN: The caller saw only the first reply
    assert_eq!(reply.expect("reply"), json!("first"));

    // AND: The next request still gets its own answer and nothing leaked to subscribers
    let backend = async {
        let request = peer.recv().await.expect("next request");
        let id = request.correlation_id.expect("id");
        peer.send(Envelope::response(id, json!("next")))
            .await
            .expect("reply");
    };
    let (next, _) = tokio::join!(client.request(json!("twice")), backend);
    assert_eq!(next.expect("next reply"), json!("next"));
    assert!(seen_rx.try_recv().is_err());
    assert_eq!(client.connection_state(), ConnectionState::Connected);
}

#[tokio::test]
async fn given_error_envelope_when_received_then_caller_gets_typed_error() {
    // GIVEN: A backend that rejects everything with NOT_FOUND
    let (transport, mut listener) = MemoryTransport::pair();
    let client = RpcClient::connect(transport, test_config());
    let mut peer = accept(&mut listener).await;
    tokio::spawn(async move {
        while let Some(envelope) = peer.recv().await {
            if let Some(id) = envelope.correlation_id {
                let _ = peer
                    .send(Envelope::error(id, json!("NOT_FOUND: no such account")))
                    .await;
            }
        }
    });

    // WHEN: A request is made
    let error = client.request(json!({})).await.unwrap_err();

    // THEN: The error arrives typed
    assert_eq!(error.kind(), ErrorKind::NotFound);
    assert_eq!(error.message(), "no such account");
}

/// **VALUE**: Losing the link fails in-flight calls instead of hanging them.
///
/// **WHY THIS MATTERS**: Without the sweep, a caller waiting on a dead link never
/// returns.
///
/// **BUG THIS CATCHES**: Pending entries that survive a disconnect, and ids that
/// restart from 1 after reconnecting.
#[tokio::test]
async fn given_pending_call_when_link_drops_then_transport_lost_and_ids_keep_growing() {
    // GIVEN: A connected client with one call in flight
    let (transport, mut listener) = MemoryTransport::pair();
    let client = RpcClient::connect(transport, test_config());
    let mut peer = accept(&mut listener).await;

    let in_flight = {
        let client = client.clone();
        tokio::spawn(async move { client.request(json!({"type": "GetStateRequest"})).await })
    };
    let first = peer.recv().await.expect("request reaches backend");

    // WHEN: The backend side drops the link
    drop(peer);

    // THEN: The call fails with TransportLost
    let error = in_flight.await.expect("task").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TransportLost);

    // AND: After reconnecting, new ids continue past the old ones
    let mut peer = accept(&mut listener).await;
    let next = {
        let client = client.clone();
        tokio::spawn(async move { client.request(json!({"type": "LockRequest"})).await })
    };
    let second = peer.recv().await.expect("request after reconnect");
    assert!(second.correlation_id > first.correlation_id);

    let id = second.correlation_id.expect("id");
    peer.send(Envelope::response(id, json!({"type": "LockResponse"})))
        .await
        .expect("reply");
    assert_eq!(
        next.await.expect("task").expect("reply"),
        json!({"type": "LockResponse"})
    );
}

/// **VALUE**: Requests issued during an outage go out, in order, once the link is back.
///
/// **WHY THIS MATTERS**: Callers should not have to know about reconnects, and
/// reordering would break sequences like unlock-then-read.
///
/// **BUG THIS CATCHES**: Dropped queue entries, LIFO flushing, or queued calls being
/// swept as TransportLost.
#[tokio::test(start_paused = true)]
async fn given_requests_during_outage_when_reconnected_then_flushed_in_order() {
    // GIVEN: A client whose link dropped while the backend is unreachable
    let (transport, mut listener) = MemoryTransport::pair();
    let client = RpcClient::connect(transport, test_config());
    let peer = accept(&mut listener).await;
    listener.set_online(false);
    drop(peer);
    wait_for_outage(&client).await;

    // WHEN: Three requests are issued offline, then the backend comes back
    let backend = async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        listener.set_online(true);
        let mut peer = accept(&mut listener).await;
        let mut order = Vec::new();
        for _ in 0..3 {
            let envelope = peer.recv().await.expect("queued request");
            order.push(envelope.payload["n"].as_u64().expect("n"));
            let id = envelope.correlation_id.expect("id");
            peer.send(Envelope::response(id, Value::Null))
                .await
                .expect("reply");
        }
        order
    };
    let (first, second, third, order) = tokio::join!(
        client.request(json!({"n": 1})),
        client.request(json!({"n": 2})),
        client.request(json!({"n": 3})),
        backend
    );

    // THEN: All three succeed and reached the backend in issue order
    assert!(first.is_ok() && second.is_ok() && third.is_ok());
    assert_eq!(order, vec![1, 2, 3]);
    assert_eq!(client.connection_state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn given_timeout_when_reply_arrives_late_then_timeout_error_and_reply_ignored() {
    // GIVEN: A connected client
    let (transport, mut listener) = MemoryTransport::pair();
    let client = RpcClient::connect(transport, test_config());
    let mut peer = accept(&mut listener).await;

    // WHEN: The backend holds the reply past the caller's limit
    let (result, late) = tokio::join!(
        client.request_with_timeout(json!("slow"), Duration::from_millis(100)),
        async {
            let envelope = peer.recv().await.expect("request");
            tokio::time::sleep(Duration::from_millis(200)).await;
            envelope
        }
    );

    // THEN: The caller sees Timeout
    assert_eq!(result.unwrap_err().kind(), ErrorKind::Timeout);

    // AND: The late reply is dropped and the link keeps working
    let late_id = late.correlation_id.expect("id");
    peer.send(Envelope::response(late_id, json!("too late")))
        .await
        .expect("late reply");

    let (next, _) = tokio::join!(client.request(json!("fast")), async {
        let envelope = peer.recv().await.expect("request");
        let id = envelope.correlation_id.expect("id");
        peer.send(Envelope::response(id, json!("on time")))
            .await
            .expect("reply");
    });
    assert_eq!(next.expect("reply"), json!("on time"));
}

/// **VALUE**: One faulty subscriber cannot starve the others.
///
/// **BUG THIS CATCHES**: A panic in a callback propagating into the connection actor
/// and killing the link.
#[tokio::test]
async fn given_panicking_subscriber_when_notification_arrives_then_others_still_notified() {
    // GIVEN: Two subscribers, the first of which panics
    let (transport, mut listener) = MemoryTransport::pair();
    let client = RpcClient::connect(transport, test_config());
    let peer = accept(&mut listener).await;

    let _faulty = client.subscribe(|_| panic!("subscriber bug"));
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let _healthy = client.subscribe(move |value| {
        let _ = seen_tx.send(value.clone());
    });

    // WHEN: The backend pushes two notifications
    for n in 0..2 {
        peer.send(Envelope::notification(json!({"type": "StateUpdated", "n": n})))
            .await
            .expect("push");
    }

    // THEN: The healthy subscriber receives both, in order
    assert_eq!(seen_rx.recv().await.expect("first")["n"], 0);
    assert_eq!(seen_rx.recv().await.expect("second")["n"], 1);
    assert_eq!(client.connection_state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn given_queued_request_when_client_closed_then_rejected_with_transport_lost() {
    // GIVEN: A client in an outage
    let (transport, mut listener) = MemoryTransport::pair();
    let client = RpcClient::connect(transport, test_config());
    let peer = accept(&mut listener).await;
    listener.set_online(false);
    drop(peer);
    wait_for_outage(&client).await;

    // WHEN: A request is queued and the client is then closed
    let (result, _) = tokio::join!(client.request(json!("queued")), async {
        client.close()
    });

    // THEN: The queued request fails instead of waiting forever
    assert_eq!(result.unwrap_err().kind(), ErrorKind::TransportLost);

    // AND: Later requests fail immediately
    let after = client.request(json!("after close")).await;
    assert_eq!(after.unwrap_err().kind(), ErrorKind::TransportLost);
}

#[test]
fn given_subscription_when_unsubscribed_twice_then_second_call_is_noop() {
    // GIVEN: Two subscribers
    let subscribers: Subscribers<u32> = Subscribers::new();
    let first = subscribers.add(|_| {});
    let _second = subscribers.add(|_| {});
    assert_eq!(subscribers.len(), 2);

    // WHEN: The first unsubscribes twice
    first.unsubscribe();
    first.unsubscribe();

    // THEN: Only that one is removed
    assert_eq!(subscribers.len(), 1);
}

#[test]
fn given_panicking_callback_when_notified_then_failure_counted() {
    let subscribers: Subscribers<u32> = Subscribers::new();
    let _ok = subscribers.add(|_| {});
    let _bad = subscribers.add(|value| {
        if *value > 1 {
            panic!("too large");
        }
    });

    assert_eq!(subscribers.notify(&1), 0);
    assert_eq!(subscribers.notify(&2), 1);
}
