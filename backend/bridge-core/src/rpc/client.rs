//! Correlated request/response client over a [`Transport`].
//!
//! A single actor task owns the link, the pending-call table and the queue of
//! requests issued while disconnected. Handles talk to it over a command channel,
//! so every mutation of connection state is serialized.

use crate::envelope::{CorrelationId, Envelope, EnvelopeKind};
use crate::error::bridge::BridgeError;
use crate::rpc::connection_state::ConnectionState;
use crate::rpc::pending::{PendingCalls, Resolver};
use crate::rpc::subscribers::{Subscribers, Subscription};
use crate::transport::{Link, Transport};

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use log::{debug, error, info, trace, warn};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep as TokioSleep, timeout as TokioTimeout};

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcClientConfig {
    /// Delay before the first reconnect attempt.
    pub reconnect_delay: Duration,
    /// Upper bound for the delay between attempts. Equal to `reconnect_delay`
    /// for a fixed schedule.
    pub reconnect_max_delay: Duration,
    /// Applied by [`RpcClient::request`]; `None` waits until the call settles.
    pub request_timeout: Option<Duration>,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_millis(1_000),
            reconnect_max_delay: Duration::from_millis(1_000),
            request_timeout: None,
        }
    }
}

impl RpcClientConfig {
    fn backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.reconnect_delay,
            current_interval: self.reconnect_delay,
            max_interval: self.reconnect_max_delay.max(self.reconnect_delay),
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };
        backoff.reset();
        backoff
    }
}

enum ClientCommand {
    Request {
        id: CorrelationId,
        payload: Value,
        reply: Resolver,
    },
    Abandon {
        id: CorrelationId,
    },
    Close,
}

struct QueuedCall {
    id: CorrelationId,
    payload: Value,
    reply: Resolver,
}

/// Cloneable handle. The actor stops once every handle is dropped or
/// [`RpcClient::close`] is called.
#[derive(Clone)]
pub struct RpcClient {
    commands: mpsc::UnboundedSender<ClientCommand>,
    next_id: Arc<AtomicU64>,
    subscribers: Subscribers<Value>,
    state: watch::Receiver<ConnectionState>,
    request_timeout: Option<Duration>,
}

impl RpcClient {
    /// Spawns the connection actor on the current tokio runtime.
    pub fn connect<T: Transport>(transport: T, config: RpcClientConfig) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Connecting);
        let subscribers = Subscribers::new();

        let actor = ConnectionActor {
            transport,
            commands: command_rx,
            pending: PendingCalls::default(),
            queue: VecDeque::new(),
            subscribers: subscribers.clone(),
            state: state_tx,
            backoff: config.backoff(),
        };
        tokio::spawn(actor.run());

        Self {
            commands,
            // Starts at 1 and is never reset, so ids stay unique across reconnects.
            next_id: Arc::new(AtomicU64::new(1)),
            subscribers,
            state,
            request_timeout: config.request_timeout,
        }
    }

    pub async fn request(&self, payload: Value) -> Result<Value, BridgeError> {
        match self.request_timeout {
            Some(limit) => self.request_with_timeout(payload, limit).await,
            None => {
                let (_, reply) = self.submit(payload)?;
                settle(reply.await)
            }
        }
    }

    /// On expiry the call is dropped from the pending table or the outage
    /// queue, so a late reply is ignored.
    pub async fn request_with_timeout(
        &self,
        payload: Value,
        limit: Duration,
    ) -> Result<Value, BridgeError> {
        let (id, reply) = self.submit(payload)?;
        match TokioTimeout(limit, reply).await {
            Ok(result) => settle(result),
            Err(_) => {
                let _ = self.commands.send(ClientCommand::Abandon { id });
                Err(BridgeError::timeout(format!(
                    "request {id} did not complete within {limit:?}"
                )))
            }
        }
    }

    fn submit(
        &self,
        payload: Value,
    ) -> Result<(CorrelationId, oneshot::Receiver<Result<Value, BridgeError>>), BridgeError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (reply, receiver) = oneshot::channel();
        self.commands
            .send(ClientCommand::Request { id, payload, reply })
            .map_err(|_| BridgeError::transport_lost("rpc client is closed"))?;
        Ok((id, receiver))
    }

    /// Registers a callback for every notification envelope.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribers.add(callback)
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Resolves once the actor reports [`ConnectionState::Connected`].
    pub async fn wait_until_connected(&self) -> Result<(), BridgeError> {
        let mut state = self.state.clone();
        state
            .wait_for(ConnectionState::is_connected)
            .await
            .map(|_| ())
            .map_err(|_| BridgeError::transport_lost("rpc client is closed"))
    }

    /// Rejects everything pending or queued and stops reconnecting.
    pub fn close(&self) {
        let _ = self.commands.send(ClientCommand::Close);
    }
}

fn settle(
    result: Result<Result<Value, BridgeError>, oneshot::error::RecvError>,
) -> Result<Value, BridgeError> {
    result.unwrap_or_else(|_| Err(BridgeError::transport_lost("rpc client stopped")))
}

enum LinkOutcome {
    Lost,
    Closed,
}

struct ConnectionActor<T: Transport> {
    transport: T,
    commands: mpsc::UnboundedReceiver<ClientCommand>,
    pending: PendingCalls,
    queue: VecDeque<QueuedCall>,
    subscribers: Subscribers<Value>,
    state: watch::Sender<ConnectionState>,
    backoff: ExponentialBackoff,
}

impl<T: Transport> ConnectionActor<T> {
    async fn run(mut self) {
        info!("RPC client starting over {} transport", self.transport.name());

        loop {
            match self.transport.connect().await {
                Ok(link) => {
                    self.backoff.reset();
                    self.set_state(ConnectionState::Connected);
                    info!("RPC link established");

                    match self.serve(link).await {
                        LinkOutcome::Closed => break,
                        LinkOutcome::Lost => {
                            self.set_state(ConnectionState::Disconnected);
                            let swept = self
                                .pending
                                .reject_all(|| BridgeError::transport_lost("connection lost"));
                            warn!("RPC link lost, rejected {} pending call(s)", swept);
                        }
                    }
                }
                Err(e) => warn!("RPC connect failed: {}", e),
            }

            let delay = self
                .backoff
                .next_backoff()
                .unwrap_or(self.backoff.max_interval);
            debug!("Reconnecting in {:?}", delay);
            if !self.wait_before_retry(delay).await {
                break;
            }
            self.set_state(ConnectionState::Reconnecting);
        }

        self.shutdown();
    }

    /// Returns `false` when the client is closed while waiting.
    async fn wait_before_retry(&mut self, delay: Duration) -> bool {
        let retry = TokioSleep(delay);
        tokio::pin!(retry);

        loop {
            tokio::select! {
                _ = &mut retry => return true,
                command = self.commands.recv() => match command {
                    None | Some(ClientCommand::Close) => return false,
                    Some(ClientCommand::Request { id, payload, reply }) => {
                        trace!("Queueing request {} while disconnected", id);
                        self.queue.push_back(QueuedCall { id, payload, reply });
                    }
                    Some(ClientCommand::Abandon { id }) => self.queue.retain(|call| call.id != id),
                },
            }
        }
    }

    async fn serve(&mut self, link: Link) -> LinkOutcome {
        let Link {
            outbound,
            mut inbound,
        } = link;

        if !self.queue.is_empty() {
            debug!("Flushing {} queued request(s)", self.queue.len());
        }
        while let Some(call) = self.queue.pop_front() {
            if let Err(call) = self.send_call(&outbound, call).await {
                self.queue.push_front(call);
                return LinkOutcome::Lost;
            }
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    None | Some(ClientCommand::Close) => return LinkOutcome::Closed,
                    Some(ClientCommand::Request { id, payload, reply }) => {
                        let call = QueuedCall { id, payload, reply };
                        if let Err(call) = self.send_call(&outbound, call).await {
                            self.queue.push_front(call);
                            return LinkOutcome::Lost;
                        }
                    }
                    Some(ClientCommand::Abandon { id }) => {
                        if self.pending.remove(id).is_some() {
                            debug!("Request {} abandoned by caller", id);
                        }
                    }
                },
                envelope = inbound.recv() => match envelope {
                    Some(envelope) => self.route(envelope),
                    None => return LinkOutcome::Lost,
                },
            }
        }
    }

    /// Hands the call back when the link refuses it so it can be retried.
    async fn send_call(
        &mut self,
        outbound: &mpsc::Sender<Envelope>,
        call: QueuedCall,
    ) -> Result<(), QueuedCall> {
        let QueuedCall { id, payload, reply } = call;
        if reply.is_closed() {
            trace!("Skipping request {}, caller is gone", id);
            return Ok(());
        }
        if let Err(reply) = self.pending.insert(id, reply) {
            error!("Correlation id {} is already in flight", id);
            let _ = reply.send(Err(BridgeError::unknown(format!(
                "duplicate correlation id {id}"
            ))));
            return Ok(());
        }

        match outbound.send(Envelope::request(id, payload)).await {
            Ok(()) => Ok(()),
            Err(rejected) => match self.pending.remove(id) {
                Some(reply) => Err(QueuedCall {
                    id,
                    payload: rejected.0.payload,
                    reply,
                }),
                None => Ok(()),
            },
        }
    }

    fn route(&mut self, envelope: Envelope) {
        match (envelope.kind, envelope.correlation_id) {
            (EnvelopeKind::Response, Some(id)) => {
                if !self.pending.resolve(id, Ok(envelope.payload)) {
                    debug!("Ignoring response for unknown request {}", id);
                }
            }
            (EnvelopeKind::Error, Some(id)) => {
                let error = BridgeError::from_wire(&envelope.payload);
                if !self.pending.resolve(id, Err(error)) {
                    debug!("Ignoring error for unknown request {}", id);
                }
            }
            (EnvelopeKind::Notification, _) => {
                self.subscribers.notify(&envelope.payload);
            }
            (kind, _) => warn!("Ignoring unexpected {} envelope from backend", kind),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn shutdown(&mut self) {
        let pending = self
            .pending
            .reject_all(|| BridgeError::transport_lost("rpc client closed"));
        let queued = self.queue.len();
        for call in self.queue.drain(..) {
            let _ = call
                .reply
                .send(Err(BridgeError::transport_lost("rpc client closed")));
        }
        self.set_state(ConnectionState::Disconnected);
        info!(
            "RPC client stopped ({} pending, {} queued call(s) rejected)",
            pending, queued
        );
    }
}
