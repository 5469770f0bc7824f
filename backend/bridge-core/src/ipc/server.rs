//! IPC WebSocket server implementation.
//!
//! The server:
//!
//! - Listens on localhost only (security)
//! - Uses JSON text frames, one [`Envelope`] per frame
//! - Requires an authentication handshake as the first frame (security)
//! - Dispatches requests concurrently, so a slow call never blocks the socket
//! - Forwards adapter notifications to every authenticated connection
//!
//! # Protocol
//!
//! 1. Client sends `{"token": "..."}`
//! 2. Server answers `{"success": true}` or `{"success": false, "error": "..."}`
//! 3. Afterwards both sides exchange envelopes:
//!    `{"kind": "request", "correlationId": 7, "payload": {...}}`

use crate::adapter::InProcessAdapter;
use crate::backend::WalletBackend;
use crate::envelope::{AuthHandshake, AuthHandshakeResponse, Envelope};
use crate::error::bridge::BridgeError;
use crate::error::ipc::IpcError;
use crate::ipc::connection_state::ConnectionState;
use crate::ipc::handle::IpcServerHandle;
use crate::ipc::link::serve_link;
use crate::ipc::shutdown_requested;
use crate::{BRIDGE_HOSTNAME, LINK_CHANNEL_CAPACITY};

use common::ErrorLocation;

use std::net::SocketAddr;
use std::panic::Location;
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn as TokioSpawn;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use uuid::Uuid;

type WsWrite = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Starts the IPC WebSocket server on the specified port.
///
/// Binds `127.0.0.1:<ipc_port>` (port 0 picks a free one) and spawns a
/// background task accepting WebSocket connections. Every authenticated
/// connection is served against `adapter`.
///
/// # Arguments
///
/// * `ipc_port` - Port to bind on localhost
/// * `auth_token` - Token clients must present; generated when `None`
/// * `adapter` - Backend side of the bridge
///
/// # Errors
///
/// Returns [`IpcError::Io`] if the port is in use or cannot be bound.
pub async fn start_ipc_server<B: WalletBackend>(
    ipc_port: u16,
    auth_token: Option<String>,
    adapter: InProcessAdapter<B>,
) -> Result<IpcServerHandle, IpcError> {
    let auth_token = auth_token.unwrap_or_else(|| {
        let token = Uuid::new_v4().to_string();
        info!("Generated IPC auth token");
        token
    });

    let listener = TcpListener::bind((BRIDGE_HOSTNAME, ipc_port)).await?;
    let local_addr = listener.local_addr()?;
    info!("IPC server listening on {}", local_addr);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown = Arc::new(shutdown_tx);

    let accept_token = auth_token.clone();
    // The accept loop owns a sender so a dropped handle does not read as shutdown.
    let accept_shutdown = shutdown.clone();
    TokioSpawn(async move {
        let _sender = accept_shutdown;
        let stop = shutdown_requested(shutdown_rx.clone());
        tokio::pin!(stop);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        info!("Client connecting from {}", addr);
                        let token = accept_token.clone();
                        let adapter = adapter.clone();
                        let shutdown = shutdown_rx.clone();
                        TokioSpawn(async move {
                            if let Err(e) =
                                handle_connection(stream, addr, token, adapter, shutdown).await
                            {
                                warn!("Connection {} ended with error: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },
                _ = &mut stop => break,
            }
        }
        info!("IPC server on {} stopped accepting connections", local_addr);
    });

    Ok(IpcServerHandle {
        local_addr,
        auth_token,
        shutdown,
    })
}

/// Handles a single WebSocket connection.
///
/// 1. **Rejects non-localhost connections** (security)
/// 2. Performs the WebSocket upgrade
/// 3. **Requires auth handshake as first frame** (security)
/// 4. Bridges socket frames to an envelope link served by [`serve_link`]
///
/// # Errors
///
/// - [`IpcError::Handshake`] - WebSocket upgrade failed
/// - [`IpcError::Json`] - Auth frame could not be encoded
/// - [`IpcError::Send`] - Failed to send a frame
/// - [`IpcError::Read`] - Failed to read a frame
/// - [`IpcError::Auth`] - Wrong token or no handshake; the connection is closed
async fn handle_connection<B: WalletBackend>(
    stream: TcpStream,
    addr: SocketAddr,
    auth_token: String,
    adapter: InProcessAdapter<B>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), IpcError> {
    // SECURITY: Reject non-loopback connections
    if !addr.ip().is_loopback() {
        warn!("Rejected non-loopback connection from {}", addr);
        return Ok(());
    }

    let ws_stream = accept_async(stream).await.map_err(|e| IpcError::Handshake {
        message: format!("WebSocket handshake failed: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let (mut write, mut read) = ws_stream.split();
    let mut state = ConnectionState::new(auth_token);

    // SECURITY: First frame MUST be the auth handshake
    match read.next().await {
        Some(Ok(Message::Text(text))) => match serde_json::from_str::<AuthHandshake>(text.as_str()) {
            Ok(auth) if state.validate_token(&auth.token) => {
                info!("Client {} authenticated successfully", addr);
                send_auth_response(&mut write, AuthHandshakeResponse::accepted()).await?;
            }
            Ok(_) => {
                send_auth_response(
                    &mut write,
                    AuthHandshakeResponse::rejected("Invalid authentication token"),
                )
                .await?;
                return Err(IpcError::Auth {
                    message: format!("Client {addr} presented an invalid token"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            Err(_) => {
                return Err(IpcError::Auth {
                    message: format!("Client {addr} sent a first frame that is not an auth handshake"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        },
        Some(Ok(_)) => {
            warn!("Client {} sent non-text first frame", addr);
            return Ok(());
        }
        Some(Err(e)) => {
            return Err(IpcError::Read {
                message: format!("Error reading first frame: {e}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        None => {
            warn!("Client {} disconnected before sending auth", addr);
            return Ok(());
        }
    }
    debug_assert!(state.is_authenticated());

    let (to_socket_tx, mut to_socket_rx) = mpsc::channel::<Envelope>(LINK_CHANNEL_CAPACITY);
    let (from_socket_tx, from_socket_rx) = mpsc::channel::<Envelope>(LINK_CHANNEL_CAPACITY);

    TokioSpawn(serve_link(
        adapter,
        from_socket_rx,
        to_socket_tx.clone(),
        shutdown.clone(),
    ));

    let writer_shutdown = shutdown.clone();
    let writer = TokioSpawn(async move {
        let stop = shutdown_requested(writer_shutdown);
        tokio::pin!(stop);
        loop {
            tokio::select! {
                envelope = to_socket_rx.recv() => match envelope {
                    Some(envelope) => {
                        let text = match envelope.encode() {
                            Ok(text) => text,
                            Err(e) => {
                                error!("Failed to encode envelope: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = write.send(Message::Text(text.into())).await {
                            warn!("Failed to write to client: {}", e);
                            break;
                        }
                    }
                    None => break,
                },
                _ = &mut stop => break,
            }
        }
        let _ = write.close().await;
    });

    let stop = shutdown_requested(shutdown);
    tokio::pin!(stop);

    let result = loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => match Envelope::decode(text.as_str()) {
                    Ok(envelope) => {
                        if from_socket_tx.send(envelope).await.is_err() {
                            break Ok(());
                        }
                    }
                    Err(e) => {
                        warn!("Invalid envelope from {}: {}", addr, e);
                        if let Some(reply) = reject_malformed(text.as_str(), &e.to_string()) {
                            let _ = to_socket_tx.send(reply).await;
                        }
                    }
                },
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => debug!("Ignoring non-text frame from {}", addr),
                Some(Err(e)) => {
                    break Err(IpcError::Read {
                        message: format!("Error reading frame: {e}"),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            },
            _ = &mut stop => {
                info!("Closing connection {} for shutdown", addr);
                break Ok(());
            }
        }
    };

    // Replies still in flight have nobody left to read them.
    writer.abort();
    info!("Client {} disconnected", addr);
    result
}

/// Answers a malformed frame with an `INVALID_PARAMS` error when it carries a
/// usable correlation id.
fn reject_malformed(text: &str, reason: &str) -> Option<Envelope> {
    let id = serde_json::from_str::<Value>(text)
        .ok()?
        .get("correlationId")?
        .as_u64()?;
    let error = BridgeError::invalid_params(format!("Malformed envelope: {reason}"));
    Some(Envelope::error(id, error.to_wire()))
}

async fn send_auth_response(
    write: &mut WsWrite,
    response: AuthHandshakeResponse,
) -> Result<(), IpcError> {
    let text = serde_json::to_string(&response)?;
    write
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| IpcError::Send {
            message: format!("Failed to send auth response: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}
