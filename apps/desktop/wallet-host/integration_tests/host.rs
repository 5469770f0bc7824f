use wallet_host::host::WalletHost;

use bridge_core::config::BridgeConfig;
use bridge_core::error::ErrorKind;
use bridge_core::rpc::{ConnectionState, RpcClient, RpcClientConfig};
use bridge_core::transport::WsTransport;

use serde_json::json;

use std::time::Duration;

// ============================================================================
// Integration tests for the host binary's wiring
// These drive a started WalletHost through a real WebSocket RPC client
// ============================================================================

const TOKEN: &str = "integration-token";

fn ephemeral_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.ipc.port = 0;
    config.ipc.auth_token = Some(TOKEN.to_string());
    config
}

fn client_config() -> RpcClientConfig {
    RpcClientConfig {
        reconnect_delay: Duration::from_millis(50),
        reconnect_max_delay: Duration::from_millis(50),
        request_timeout: None,
    }
}

async fn connected_client(port: u16, token: &str) -> RpcClient {
    let transport = WsTransport::localhost(port, token).expect("Failed to build transport");
    let client = RpcClient::connect(transport, client_config());
    tokio::time::timeout(Duration::from_secs(5), client.wait_until_connected())
        .await
        .expect("Timed out connecting")
        .expect("Client closed");
    client
}

/// **VALUE**: Tests that a UI process can drive the wallet through a started host.
///
/// **WHY THIS MATTERS**: This is the closest we get to end-to-end without a UI:
/// config → host → socket → client, with the same token the binary would log.
///
/// **BUG THIS CATCHES**: Would catch if the host wires the adapter without
/// bootstrapping it, or advertises a port or token it does not serve.
#[tokio::test]
async fn given_started_host_when_client_connects_then_wallet_usable() {
    // GIVEN: A host started from config on a free port
    let host = WalletHost::start(&ephemeral_config()).await.expect("start");
    let info = host.connection_info();

    // WHEN: A client connects with the advertised token
    let client = connected_client(info.address.port(), &info.auth_token).await;

    // THEN: Wallet requests round-trip
    client
        .request(json!({"type": "NewWalletRequest", "password": "hunter22"}))
        .await
        .expect("wallet");
    let state = client
        .request(json!({"type": "GetStateRequest"}))
        .await
        .expect("state");
    assert_eq!(state["state"]["status"], "READY");
    assert_eq!(host.adapter().backend().bootstrap_count(), 1);

    client.close();
    host.shutdown();
}

#[tokio::test]
async fn given_host_shut_down_when_bounded_request_made_then_times_out() {
    // GIVEN: A connected client
    let host = WalletHost::start(&ephemeral_config()).await.expect("start");
    let client = connected_client(host.connection_info().address.port(), TOKEN).await;

    // WHEN: The host goes away
    host.shutdown();
    let mut states = client.state_changes();
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|state| *state != ConnectionState::Connected),
    )
    .await
    .expect("client should notice the outage")
    .expect("state watch");

    // THEN: A bounded request does not hang while the host is gone
    let error = client
        .request_with_timeout(json!({"type": "GetStateRequest"}), Duration::from_millis(200))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Timeout);

    client.close();
}
