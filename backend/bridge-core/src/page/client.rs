use crate::error::bridge::BridgeError;
use crate::page::bus::PageBus;
use crate::page::errors::classify;
use crate::page::protocol::{
    AllowedPrivateData, ConsumeTransaction, CustomTransaction, DappMetadata, DappRequest,
    DappResponse, PING, PONG, PageMessage, PageMessageType, PermissionInfo, PrivateDataPermission,
    SendTransaction, same_permission,
};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, trace, warn};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{sleep as TokioSleep, timeout as TokioTimeout};
use uuid::Uuid;

use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
    /// Probes run back to back until this many have been attempted.
    pub fast_probe_attempts: u32,
    pub available_poll_interval: Duration,
    pub unavailable_poll_interval: Duration,
    pub permission_poll_interval: Duration,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(300),
            probe_timeout: Duration::from_millis(500),
            fast_probe_attempts: 5,
            available_poll_interval: Duration::from_secs(10),
            unavailable_poll_interval: Duration::from_secs(5),
            permission_poll_interval: Duration::from_secs(10),
        }
    }
}

/// Permission granted to this page, cached until disconnect or until the
/// host reports a different account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub account_id: String,
    pub network: String,
    pub private_data_permission: PrivateDataPermission,
    pub allowed_private_data: AllowedPrivateData,
    pub public_key: Vec<u8>,
}

/// Background poller. Stops when stopped explicitly or dropped.
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn unexpected(response: DappResponse) -> BridgeError {
    BridgeError::unknown(format!("Invalid response received: {response:?}"))
}

/// Page-side API for talking to the wallet host over a [`PageBus`].
#[derive(Clone)]
pub struct PageClient {
    bus: PageBus,
    settings: PageSettings,
    permission: Arc<RwLock<Option<Permission>>>,
}

impl PageClient {
    pub fn new(bus: PageBus, settings: PageSettings) -> Self {
        Self {
            bus,
            settings,
            permission: Arc::new(RwLock::new(None)),
        }
    }

    pub fn settings(&self) -> &PageSettings {
        &self.settings
    }

    pub async fn permission(&self) -> Option<Permission> {
        self.permission.read().await.clone()
    }

    /// Posts `payload` and waits for the reply carrying the same `reqId`.
    pub async fn call(&self, payload: Value, limit: Duration) -> Result<Value, BridgeError> {
        let req_id = Uuid::new_v4().to_string();
        // Listen before posting so a fast reply cannot be missed.
        let mut replies = self.bus.listen();
        self.bus.post(PageMessage::request(payload, req_id.clone()));
        trace!("Page request {} posted", req_id);

        let wait = async {
            loop {
                match replies.recv().await {
                    Ok(message) if message.req_id.as_deref() == Some(req_id.as_str()) => {
                        match message.kind {
                            PageMessageType::Response => return Ok(message.payload),
                            PageMessageType::ErrorResponse => return Err(classify(&message.payload)),
                            PageMessageType::Request => {}
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Page client lagged, {} message(s) skipped", skipped)
                    }
                    Err(RecvError::Closed) => {
                        return Err(BridgeError::transport_lost("page channel closed"));
                    }
                }
            }
        };

        match TokioTimeout(limit, wait).await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::timeout(format!(
                "page request {req_id} timed out after {limit:?}"
            ))),
        }
    }

    pub async fn request(&self, request: &DappRequest) -> Result<DappResponse, BridgeError> {
        let payload = serde_json::to_value(request)
            .map_err(|e| BridgeError::invalid_params(e.to_string()))?;
        let reply = self.call(payload, self.settings.request_timeout).await?;
        serde_json::from_value(reply)
            .map_err(|e| BridgeError::unknown(format!("Invalid response received: {e}")))
    }

    /// True when the host answers `PING` with `PONG` within the probe timeout.
    pub async fn is_available(&self) -> bool {
        match self
            .call(Value::String(PING.to_string()), self.settings.probe_timeout)
            .await
        {
            Ok(Value::String(reply)) => reply == PONG,
            Ok(_) => false,
            Err(e) => {
                trace!("Availability probe failed: {}", e);
                false
            }
        }
    }

    /// Polls availability and calls `callback` on every transition. The page
    /// starts out unavailable, so a first successful probe is a transition.
    pub fn on_availability_change<F>(&self, callback: F) -> PollerHandle
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let client = self.clone();
        let task = tokio::spawn(async move {
            let mut attempts = 0u32;
            let mut available = false;
            loop {
                let fast = attempts < client.settings.fast_probe_attempts;
                attempts = attempts.saturating_add(1);

                let now = client.is_available().await;
                if now != available {
                    available = now;
                    debug!("Wallet availability changed to {}", available);
                    callback(available);
                }

                let delay = if available {
                    client.settings.available_poll_interval
                } else if fast {
                    Duration::ZERO
                } else {
                    client.settings.unavailable_poll_interval
                };
                if !delay.is_zero() {
                    TokioSleep(delay).await;
                }
            }
        });
        PollerHandle { task }
    }

    pub async fn get_current_permission(&self) -> Result<Option<PermissionInfo>, BridgeError> {
        match self.request(&DappRequest::GetCurrentPermissionRequest).await? {
            DappResponse::GetCurrentPermissionResponse { permission } => Ok(permission),
            other => Err(unexpected(other)),
        }
    }

    pub async fn request_permission(
        &self,
        app_meta: DappMetadata,
        network: impl Into<String>,
        force: bool,
        private_data_permission: PrivateDataPermission,
        allowed_private_data: AllowedPrivateData,
    ) -> Result<Permission, BridgeError> {
        let request = DappRequest::PermissionRequest {
            app_meta,
            network: network.into(),
            force,
            private_data_permission,
            allowed_private_data,
        };
        match self.request(&request).await? {
            DappResponse::PermissionResponse {
                account_id,
                network,
                private_data_permission,
                allowed_private_data,
                public_key,
            } => {
                let public_key = BASE64
                    .decode(public_key)
                    .map_err(|e| BridgeError::unknown(format!("Invalid public key: {e}")))?;
                let permission = Permission {
                    account_id,
                    network,
                    private_data_permission,
                    allowed_private_data,
                    public_key,
                };
                *self.permission.write().await = Some(permission.clone());
                Ok(permission)
            }
            other => Err(unexpected(other)),
        }
    }

    pub async fn request_disconnect(&self) -> Result<(), BridgeError> {
        match self.request(&DappRequest::DisconnectRequest).await? {
            DappResponse::DisconnectResponse => {
                *self.permission.write().await = None;
                Ok(())
            }
            other => Err(unexpected(other)),
        }
    }

    /// Polls the current permission and calls `callback` whenever the bound
    /// account or rpc endpoint changes. Failed polls are skipped.
    pub fn on_permission_change<F>(&self, callback: F) -> PollerHandle
    where
        F: Fn(Option<PermissionInfo>) + Send + Sync + 'static,
    {
        let client = self.clone();
        let task = tokio::spawn(async move {
            let mut current: Option<PermissionInfo> = None;
            loop {
                match client.get_current_permission().await {
                    Ok(latest) => {
                        if !same_permission(latest.as_ref(), current.as_ref()) {
                            client.forget_if_rebound(latest.as_ref()).await;
                            callback(latest.clone());
                            current = latest;
                        }
                    }
                    Err(e) => debug!("Permission poll failed: {}", e),
                }
                TokioSleep(client.settings.permission_poll_interval).await;
            }
        });
        PollerHandle { task }
    }

    async fn forget_if_rebound(&self, latest: Option<&PermissionInfo>) {
        let mut cached = self.permission.write().await;
        let stale = match (cached.as_ref(), latest) {
            (Some(cached), Some(latest)) => cached.account_id != latest.account_id,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if stale {
            *cached = None;
        }
    }

    pub async fn request_transaction(
        &self,
        source_public_key: impl Into<String>,
        transaction: CustomTransaction,
    ) -> Result<Option<String>, BridgeError> {
        let request = DappRequest::TransactionRequest {
            source_public_key: source_public_key.into(),
            transaction,
        };
        match self.request(&request).await? {
            DappResponse::TransactionResponse { transaction_id } => Ok(transaction_id),
            other => Err(unexpected(other)),
        }
    }

    pub async fn request_send(
        &self,
        source_public_key: impl Into<String>,
        transaction: SendTransaction,
    ) -> Result<Option<String>, BridgeError> {
        let request = DappRequest::SendTransactionRequest {
            source_public_key: source_public_key.into(),
            transaction,
        };
        match self.request(&request).await? {
            DappResponse::SendTransactionResponse { transaction_id } => Ok(transaction_id),
            other => Err(unexpected(other)),
        }
    }

    pub async fn request_consume(
        &self,
        source_public_key: impl Into<String>,
        transaction: ConsumeTransaction,
    ) -> Result<Option<String>, BridgeError> {
        let request = DappRequest::ConsumeRequest {
            source_public_key: source_public_key.into(),
            transaction,
        };
        match self.request(&request).await? {
            DappResponse::ConsumeResponse { transaction_id } => Ok(transaction_id),
            other => Err(unexpected(other)),
        }
    }

    pub async fn request_sign(
        &self,
        source_account_id: impl Into<String>,
        source_public_key: impl Into<String>,
        payload: &[u8],
        kind: impl Into<String>,
    ) -> Result<Vec<u8>, BridgeError> {
        let request = DappRequest::SignRequest {
            source_account_id: source_account_id.into(),
            source_public_key: source_public_key.into(),
            payload: BASE64.encode(payload),
            kind: kind.into(),
        };
        match self.request(&request).await? {
            DappResponse::SignResponse { signature } => BASE64
                .decode(signature)
                .map_err(|e| BridgeError::unknown(format!("Invalid signature: {e}"))),
            other => Err(unexpected(other)),
        }
    }

    pub async fn request_private_notes(
        &self,
        source_public_key: impl Into<String>,
        notefilter_type: impl Into<String>,
        note_ids: Option<Vec<String>>,
    ) -> Result<Vec<Value>, BridgeError> {
        let request = DappRequest::PrivateNotesRequest {
            source_public_key: source_public_key.into(),
            notefilter_type: notefilter_type.into(),
            note_ids,
        };
        match self.request(&request).await? {
            DappResponse::PrivateNotesResponse { private_notes } => Ok(private_notes),
            other => Err(unexpected(other)),
        }
    }

    pub async fn request_assets(
        &self,
        source_public_key: impl Into<String>,
    ) -> Result<Vec<Value>, BridgeError> {
        let request = DappRequest::AssetsRequest {
            source_public_key: source_public_key.into(),
        };
        match self.request(&request).await? {
            DappResponse::AssetsResponse { assets } => Ok(assets),
            other => Err(unexpected(other)),
        }
    }

    pub async fn request_consumable_notes(
        &self,
        source_public_key: impl Into<String>,
    ) -> Result<Vec<Value>, BridgeError> {
        let request = DappRequest::ConsumableNotesRequest {
            source_public_key: source_public_key.into(),
        };
        match self.request(&request).await? {
            DappResponse::ConsumableNotesResponse { consumable_notes } => Ok(consumable_notes),
            other => Err(unexpected(other)),
        }
    }

    pub async fn import_private_note(
        &self,
        source_public_key: impl Into<String>,
        note: &[u8],
    ) -> Result<String, BridgeError> {
        let request = DappRequest::ImportPrivateNoteRequest {
            source_public_key: source_public_key.into(),
            note: BASE64.encode(note),
        };
        match self.request(&request).await? {
            DappResponse::ImportPrivateNoteResponse { note_id } => Ok(note_id),
            other => Err(unexpected(other)),
        }
    }

    pub async fn wait_for_transaction(&self, tx_id: impl Into<String>) -> Result<Value, BridgeError> {
        let request = DappRequest::WaitForTransactionRequest {
            tx_id: tx_id.into(),
        };
        match self.request(&request).await? {
            DappResponse::WaitForTransactionResponse { transaction_output } => {
                Ok(transaction_output)
            }
            other => Err(unexpected(other)),
        }
    }
}
