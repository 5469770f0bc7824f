//! Test helpers for IPC integration tests.
//!
//! This module provides utilities for testing the IPC WebSocket server:
//! - Starting a host on a free port
//! - Raw socket access for handshake and framing tests
//! - RPC clients connected over the WebSocket transport

use bridge_core::adapter::InProcessAdapter;
use bridge_core::backend::MemoryWalletBackend;
use bridge_core::confirmation::ConfirmationStore;
use bridge_core::envelope::{AuthHandshake, AuthHandshakeResponse, Envelope};
use bridge_core::error::ipc::IpcError;
use bridge_core::ipc::{IpcServerHandle, start_ipc_server};
use bridge_core::rpc::{RpcClient, RpcClientConfig};
use bridge_core::transport::WsTransport;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use std::sync::Arc;
use std::time::Duration;

pub type TestSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type TestAdapter = InProcessAdapter<MemoryWalletBackend>;

/// Test constants for authentication
pub const TEST_AUTH_TOKEN: &str = "test-token-12345";

pub fn adapter_for(backend: MemoryWalletBackend) -> TestAdapter {
    InProcessAdapter::new(Arc::new(backend), ConfirmationStore::default())
}

/// Test helper: Start a host on a free port with the test token.
pub async fn start_test_host(adapter: TestAdapter) -> IpcServerHandle {
    start_ipc_server(0, Some(String::from(TEST_AUTH_TOKEN)), adapter)
        .await
        .expect("Failed to start IPC server")
}

/// Test helper: Restart on a port that was just released.
pub async fn restart_test_host(port: u16, adapter: TestAdapter) -> IpcServerHandle {
    let mut last_error: Option<IpcError> = None;
    for _ in 0..50 {
        match start_ipc_server(port, Some(String::from(TEST_AUTH_TOKEN)), adapter.clone()).await {
            Ok(handle) => return handle,
            Err(e) => last_error = Some(e),
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Failed to restart IPC server on port {port}: {last_error:?}");
}

/// Test helper: Connect to IPC server and return WebSocket stream.
pub async fn connect_to_server(ipc_port: u16) -> TestSocket {
    let url = format!("ws://127.0.0.1:{}", ipc_port);
    let (ws_stream, _) = connect_async(&url)
        .await
        .expect("Failed to connect to WebSocket server");
    ws_stream
}

/// Test helper: Send a raw text frame.
pub async fn send_text(ws: &mut TestSocket, text: &str) {
    ws.send(Message::Text(text.to_string().into()))
        .await
        .expect("Failed to send message");
}

/// Test helper: Receive the next text frame.
pub async fn receive_text(ws: &mut TestSocket) -> String {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("Timed out waiting for a frame")
        .expect("No message received")
        .expect("Error receiving message");

    msg.into_text().expect("Expected a text frame").as_str().to_string()
}

/// Test helper: Receive and decode the next envelope.
pub async fn receive_envelope(ws: &mut TestSocket) -> Envelope {
    Envelope::decode(&receive_text(ws).await).expect("Failed to decode envelope")
}

/// Test helper: Send auth handshake and return response.
pub async fn authenticate(ws: &mut TestSocket, token: &str) -> AuthHandshakeResponse {
    let handshake = AuthHandshake {
        token: token.to_string(),
    };
    send_text(ws, &serde_json::to_string(&handshake).expect("encode")).await;

    serde_json::from_str(&receive_text(ws).await).expect("Expected AuthHandshakeResponse")
}

/// Test helper: Check if WebSocket connection is closed.
pub async fn is_connection_closed(ws: &mut TestSocket) -> bool {
    match tokio::time::timeout(Duration::from_millis(100), ws.next()).await {
        Err(_) => true,
        Ok(None) => true,
        Ok(Some(Ok(Message::Close(_)))) => true,
        Ok(Some(Ok(_))) => false,
        Ok(Some(Err(_))) => true,
    }
}

pub fn fast_reconnect() -> RpcClientConfig {
    RpcClientConfig {
        reconnect_delay: Duration::from_millis(50),
        reconnect_max_delay: Duration::from_millis(50),
        request_timeout: None,
    }
}

/// Test helper: RPC client over the WebSocket transport, already connected.
pub async fn connected_client(ipc_port: u16) -> RpcClient {
    let transport =
        WsTransport::localhost(ipc_port, TEST_AUTH_TOKEN).expect("Failed to build transport");
    let client = RpcClient::connect(transport, fast_reconnect());
    tokio::time::timeout(Duration::from_secs(5), client.wait_until_connected())
        .await
        .expect("Timed out connecting")
        .expect("Client closed");
    client
}
