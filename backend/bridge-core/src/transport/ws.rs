//! WebSocket transport to a wallet host process on the loopback interface.

use crate::envelope::{AuthHandshake, AuthHandshakeResponse, Envelope};
use crate::error::transport::TransportError;
use crate::transport::{Link, Transport};
use crate::{BRIDGE_WS_BASE_URL, LINK_CHANNEL_CAPACITY};

use common::{ErrorLocation, RedactedSecret};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use std::panic::Location;

pub struct WsTransport {
    url: Url,
    auth_token: RedactedSecret,
}

impl WsTransport {
    #[track_caller]
    pub fn new(url: &str, auth_token: impl Into<String>) -> Result<Self, TransportError> {
        let url = Url::parse(url)?;
        if url.scheme() != "ws" {
            return Err(TransportError::InvalidUrl {
                message: format!("unsupported scheme '{}'", url.scheme()),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(Self {
            url,
            auth_token: RedactedSecret::new(auth_token),
        })
    }

    #[track_caller]
    pub fn localhost(port: u16, auth_token: impl Into<String>) -> Result<Self, TransportError> {
        Self::new(&format!("{BRIDGE_WS_BASE_URL}:{port}"), auth_token)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for WsTransport {
    fn name(&self) -> &'static str {
        "websocket"
    }

    async fn connect(&self) -> Result<Link, TransportError> {
        let (ws_stream, _) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        let handshake = serde_json::to_string(&AuthHandshake {
            token: self.auth_token.expose().to_string(),
        })?;
        write.send(Message::Text(handshake.into())).await?;

        let response = match read.next().await {
            Some(Ok(Message::Text(text))) => {
                serde_json::from_str::<AuthHandshakeResponse>(text.as_str())?
            }
            Some(Ok(other)) => {
                return Err(TransportError::Auth {
                    message: format!("unexpected handshake frame: {other:?}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            Some(Err(e)) => return Err(TransportError::from(e)),
            None => {
                return Err(TransportError::Closed {
                    message: "host closed the socket during the handshake".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        if !response.success {
            return Err(TransportError::Auth {
                message: response
                    .error
                    .unwrap_or_else(|| "authentication rejected".to_string()),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        info!("Connected to wallet host at {}", self.url);

        let (outbound, mut to_socket) = mpsc::channel::<Envelope>(LINK_CHANNEL_CAPACITY);
        let (from_socket, inbound) = mpsc::channel::<Envelope>(LINK_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            while let Some(envelope) = to_socket.recv().await {
                let text = match envelope.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Dropping unencodable envelope: {}", e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    warn!("WebSocket write failed: {}", e);
                    break;
                }
            }
            let _ = write.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => match Envelope::decode(text.as_str()) {
                        Ok(envelope) => {
                            if from_socket.send(envelope).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Ignoring malformed envelope: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("WebSocket read failed: {}", e);
                        break;
                    }
                }
            }
            debug!("WebSocket reader finished");
        });

        Ok(Link { outbound, inbound })
    }
}
