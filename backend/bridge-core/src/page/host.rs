use crate::backend::{DappSession, TransactionIntent, WalletBackend, WalletStatus};
use crate::confirmation::{
    ConfirmationKind, ConfirmationRequest, ConfirmationResult, ConfirmationStore,
};
use crate::error::backend::BackendError;
use crate::page::bus::PageBus;
use crate::page::protocol::{
    AllowedPrivateData, CustomTransaction, DappMetadata, DappRequest, DappResponse, PING, PONG,
    PageMessage, PageMessageType, PermissionInfo, PrivateDataPermission,
};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use uuid::Uuid;

use std::sync::Arc;

/// Answers page requests on behalf of one wallet backend.
pub struct PageHost<B: WalletBackend> {
    backend: Arc<B>,
    confirmations: ConfirmationStore,
}

impl<B: WalletBackend> Clone for PageHost<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            confirmations: self.confirmations.clone(),
        }
    }
}

struct ConnectParams {
    app_meta: DappMetadata,
    network: String,
    force: bool,
    private_data_permission: PrivateDataPermission,
    allowed_private_data: AllowedPrivateData,
}

fn permission_response(session: &DappSession, network: &str) -> DappResponse {
    DappResponse::PermissionResponse {
        account_id: session.account_id.clone(),
        network: network.to_string(),
        private_data_permission: session.private_data_permission,
        allowed_private_data: session.allowed_private_data,
        public_key: session.public_key.clone(),
    }
}

fn describe(intent: &TransactionIntent) -> (ConfirmationKind, Vec<String>) {
    match intent {
        TransactionIntent::Send(send) => {
            let mut messages = vec![
                format!(
                    "Send {} of {} to {}",
                    send.amount, send.faucet_id, send.recipient_account_id
                ),
                format!("Note type: {}", send.note_type),
            ];
            if let Some(blocks) = send.recall_blocks {
                messages.push(format!("Recallable after {blocks} blocks"));
            }
            (ConfirmationKind::Transaction, messages)
        }
        TransactionIntent::Consume(consume) => (
            ConfirmationKind::Consume,
            vec![
                format!("Consume note {}", consume.note_id),
                format!("Receive {} of {}", consume.amount, consume.faucet_id),
            ],
        ),
        TransactionIntent::Custom(custom) => (
            ConfirmationKind::Transaction,
            vec![
                format!("Custom transaction for {}", custom.account_id),
                format!(
                    "Input notes: {}",
                    custom.input_note_ids.as_ref().map_or(0, Vec::len)
                ),
            ],
        ),
    }
}

fn validate_custom(custom: &CustomTransaction) -> Result<(), BackendError> {
    BASE64
        .decode(&custom.transaction_request)
        .map(|_| ())
        .map_err(|e| BackendError::invalid_params(format!("transactionRequest is not base64: {e}")))
}

impl<B: WalletBackend> PageHost<B> {
    pub fn new(backend: Arc<B>, confirmations: ConfirmationStore) -> Self {
        Self {
            backend,
            confirmations,
        }
    }

    pub fn confirmations(&self) -> &ConfirmationStore {
        &self.confirmations
    }

    /// Answers one page payload. `PING` gets `PONG` while dApp support is on.
    pub async fn handle(&self, origin: &str, payload: Value) -> Result<Value, BackendError> {
        if !self.backend.is_dapp_enabled().await? {
            return Err(BackendError::not_granted("dApp support is disabled"));
        }
        if payload.as_str() == Some(PING) {
            return Ok(Value::String(PONG.to_string()));
        }

        let request: DappRequest = serde_json::from_value(payload)?;
        let response = self.process(origin, request).await?;
        serde_json::to_value(response).map_err(|e| BackendError::failed(e.to_string()))
    }

    pub async fn process(
        &self,
        origin: &str,
        request: DappRequest,
    ) -> Result<DappResponse, BackendError> {
        match request {
            DappRequest::GetCurrentPermissionRequest => {
                let permission = self.current_permission(origin).await?;
                Ok(DappResponse::GetCurrentPermissionResponse { permission })
            }
            DappRequest::PermissionRequest {
                app_meta,
                network,
                force,
                private_data_permission,
                allowed_private_data,
            } => {
                self.connect(
                    origin,
                    ConnectParams {
                        app_meta,
                        network,
                        force,
                        private_data_permission,
                        allowed_private_data,
                    },
                )
                .await
            }
            DappRequest::DisconnectRequest => {
                let account = self
                    .backend
                    .current_account_public_key()
                    .await?
                    .ok_or_else(|| BackendError::not_found("No account is selected"))?;
                if self.backend.dapp_session(origin, &account).await?.is_none() {
                    return Err(BackendError::not_found(format!("{origin} is not connected")));
                }
                self.backend
                    .remove_dapp_session(origin, Some(&account))
                    .await?;
                info!("Disconnected {}", origin);
                Ok(DappResponse::DisconnectResponse)
            }
            DappRequest::TransactionRequest {
                source_public_key,
                transaction,
            } => {
                validate_custom(&transaction)?;
                let transaction_id = self
                    .transact(
                        origin,
                        &source_public_key,
                        TransactionIntent::Custom(transaction),
                    )
                    .await?;
                Ok(DappResponse::TransactionResponse { transaction_id })
            }
            DappRequest::SendTransactionRequest {
                source_public_key,
                transaction,
            } => {
                let transaction_id = self
                    .transact(
                        origin,
                        &source_public_key,
                        TransactionIntent::Send(transaction),
                    )
                    .await?;
                Ok(DappResponse::SendTransactionResponse { transaction_id })
            }
            DappRequest::ConsumeRequest {
                source_public_key,
                transaction,
            } => {
                let transaction_id = self
                    .transact(
                        origin,
                        &source_public_key,
                        TransactionIntent::Consume(transaction),
                    )
                    .await?;
                Ok(DappResponse::ConsumeResponse { transaction_id })
            }
            DappRequest::PrivateNotesRequest {
                source_public_key,
                notefilter_type,
                note_ids,
            } => {
                let session = self
                    .readable_session(
                        origin,
                        &source_public_key,
                        AllowedPrivateData::NOTES,
                        ConfirmationKind::PrivateNotes,
                        format!("Share private notes ({notefilter_type})"),
                    )
                    .await?;
                let private_notes = self
                    .backend
                    .private_notes(&session.account_id, &notefilter_type, note_ids.as_deref())
                    .await?;
                Ok(DappResponse::PrivateNotesResponse { private_notes })
            }
            DappRequest::SignRequest {
                source_account_id,
                source_public_key,
                payload,
                kind,
            } => {
                let session = self.authorized_session(origin, &source_public_key).await?;
                if session.account_id != source_account_id {
                    return Err(BackendError::not_found(format!(
                        "Account {source_account_id} is not connected to {origin}"
                    )));
                }
                let messages = vec![format!("Sign {kind} payload"), payload.clone()];
                self.confirm(
                    self.confirmation_for(ConfirmationKind::Sign, origin, &session, messages)
                        .await?,
                )
                .await?;
                let signature = self
                    .backend
                    .sign_payload(&session.account_id, &payload, &kind)
                    .await?;
                Ok(DappResponse::SignResponse { signature })
            }
            DappRequest::AssetsRequest { source_public_key } => {
                let session = self
                    .readable_session(
                        origin,
                        &source_public_key,
                        AllowedPrivateData::ASSETS,
                        ConfirmationKind::Assets,
                        "Share account assets".to_string(),
                    )
                    .await?;
                let assets = self.backend.assets(&session.account_id).await?;
                Ok(DappResponse::AssetsResponse { assets })
            }
            DappRequest::ImportPrivateNoteRequest {
                source_public_key,
                note,
            } => {
                if note.is_empty() {
                    return Err(BackendError::invalid_params("note is required"));
                }
                let session = self.authorized_session(origin, &source_public_key).await?;
                let note_id = self
                    .backend
                    .import_private_note(&session.account_id, &note)
                    .await?;
                Ok(DappResponse::ImportPrivateNoteResponse { note_id })
            }
            DappRequest::ConsumableNotesRequest { source_public_key } => {
                let session = self
                    .readable_session(
                        origin,
                        &source_public_key,
                        AllowedPrivateData::NOTES,
                        ConfirmationKind::ConsumableNotes,
                        "Share consumable notes".to_string(),
                    )
                    .await?;
                let consumable_notes = self.backend.consumable_notes(&session.account_id).await?;
                Ok(DappResponse::ConsumableNotesResponse { consumable_notes })
            }
            DappRequest::WaitForTransactionRequest { tx_id } => {
                if tx_id.is_empty() {
                    return Err(BackendError::invalid_params("txId is required"));
                }
                let transaction_output = self.backend.wait_for_transaction(&tx_id).await?;
                Ok(DappResponse::WaitForTransactionResponse { transaction_output })
            }
        }
    }

    /// Serves every request posted on `bus` as coming from `origin`.
    pub fn serve(&self, bus: PageBus, origin: impl Into<String>) -> JoinHandle<()> {
        let host = self.clone();
        let origin = origin.into();
        let mut messages = bus.listen();

        tokio::spawn(async move {
            loop {
                match messages.recv().await {
                    Ok(message) if message.kind == PageMessageType::Request => {
                        let host = host.clone();
                        let bus = bus.clone();
                        let origin = origin.clone();
                        tokio::spawn(async move {
                            let reply = match host.handle(&origin, message.payload).await {
                                Ok(payload) => PageMessage::response(payload, message.req_id),
                                Err(e) => {
                                    debug!("Page request from {} failed: {}", origin, e);
                                    PageMessage::error_response(e.to_wire(), message.req_id)
                                }
                            };
                            bus.post(reply);
                        });
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Page host lagged, {} message(s) skipped", skipped)
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    async fn current_permission(
        &self,
        origin: &str,
    ) -> Result<Option<PermissionInfo>, BackendError> {
        let Some(account) = self.backend.current_account_public_key().await? else {
            return Ok(None);
        };
        let Some(session) = self.backend.dapp_session(origin, &account).await? else {
            return Ok(None);
        };
        let rpc = self.backend.network_rpc(&session.network).await.ok();
        Ok(Some(PermissionInfo {
            rpc,
            account_id: session.account_id,
            private_data_permission: session.private_data_permission,
            allowed_private_data: session.allowed_private_data,
        }))
    }

    async fn connect(
        &self,
        origin: &str,
        params: ConnectParams,
    ) -> Result<DappResponse, BackendError> {
        if params.app_meta.name.trim().is_empty() {
            return Err(BackendError::invalid_params("appMeta.name is required"));
        }
        let network_rpc = self.backend.network_rpc(&params.network).await?;
        let status = self.backend.get_state().await?.status;

        let existing = match self.backend.current_account_public_key().await? {
            Some(account) => self.backend.dapp_session(origin, &account).await?,
            None => None,
        };
        let reusable = existing
            .as_ref()
            .filter(|session| !params.force && session.app_meta.name == params.app_meta.name);
        // A locked wallet re-prompts with what the stored session was granted
        let (app_meta, private_data_permission, allowed_private_data) = match reusable {
            Some(session) if status == WalletStatus::Ready => {
                debug!("Reusing session of {} for {}", session.account_id, origin);
                return Ok(permission_response(session, &params.network));
            }
            Some(session) => (
                session.app_meta.clone(),
                session.private_data_permission,
                session.allowed_private_data,
            ),
            None => (
                params.app_meta,
                params.private_data_permission,
                params.allowed_private_data,
            ),
        };

        let result = self
            .confirm(ConfirmationRequest {
                id: Uuid::new_v4().to_string(),
                kind: ConfirmationKind::Connect,
                origin: origin.to_string(),
                app_meta: app_meta.clone(),
                network: params.network.clone(),
                network_rpc,
                private_data_permission,
                allowed_private_data,
                existing_permission: existing.is_some(),
                source_public_key: None,
                transaction_messages: None,
            })
            .await?;

        let account_id = result
            .account_public_key
            .ok_or_else(|| BackendError::not_granted("No account was selected"))?;
        let public_key = BASE64.encode(self.backend.account_public_key_bytes(&account_id).await?);
        let session = DappSession {
            network: params.network,
            app_meta,
            account_id,
            private_data_permission: result
                .private_data_permission
                .unwrap_or(private_data_permission),
            allowed_private_data,
            public_key,
        };
        self.backend.save_dapp_session(origin, session.clone()).await?;
        info!("{} connected to {}", origin, session.account_id);
        Ok(permission_response(&session, &session.network))
    }

    async fn transact(
        &self,
        origin: &str,
        source_public_key: &str,
        intent: TransactionIntent,
    ) -> Result<Option<String>, BackendError> {
        let session = self.authorized_session(origin, source_public_key).await?;
        let (kind, messages) = describe(&intent);
        let result = self
            .confirm(self.confirmation_for(kind, origin, &session, messages).await?)
            .await?;
        let transaction_id = self
            .backend
            .submit_transaction(&session.account_id, &intent, result.delegate)
            .await?;
        Ok(Some(transaction_id))
    }

    async fn confirmation_for(
        &self,
        kind: ConfirmationKind,
        origin: &str,
        session: &DappSession,
        messages: Vec<String>,
    ) -> Result<ConfirmationRequest, BackendError> {
        Ok(ConfirmationRequest {
            id: Uuid::new_v4().to_string(),
            kind,
            origin: origin.to_string(),
            app_meta: session.app_meta.clone(),
            network: session.network.clone(),
            network_rpc: self.backend.network_rpc(&session.network).await?,
            private_data_permission: session.private_data_permission,
            allowed_private_data: session.allowed_private_data,
            existing_permission: true,
            source_public_key: Some(session.account_id.clone()),
            transaction_messages: Some(messages),
        })
    }

    /// Declines, supersessions and timeouts all surface to the page as `NOT_GRANTED`.
    async fn confirm(
        &self,
        request: ConfirmationRequest,
    ) -> Result<ConfirmationResult, BackendError> {
        match self.confirmations.request_confirmation(request).await {
            Ok(result) if result.confirmed => Ok(result),
            Ok(_) => Err(BackendError::not_granted("Declined by user")),
            Err(e) => Err(BackendError::not_granted(format!(
                "Confirmation {}: {}",
                e.kind(),
                e.message()
            ))),
        }
    }

    async fn authorized_session(
        &self,
        origin: &str,
        source_public_key: &str,
    ) -> Result<DappSession, BackendError> {
        if source_public_key.trim().is_empty() {
            return Err(BackendError::invalid_params("sourcePublicKey is required"));
        }
        let account = self
            .backend
            .current_account_public_key()
            .await?
            .ok_or_else(|| BackendError::not_granted("No account is selected"))?;
        let session = self
            .backend
            .dapp_session(origin, &account)
            .await?
            .ok_or_else(|| BackendError::not_granted(format!("{origin} is not connected")))?;
        if session.account_id != source_public_key {
            return Err(BackendError::not_found(format!(
                "Account {source_public_key} is not connected to {origin}"
            )));
        }
        Ok(session)
    }

    /// Private data is served silently only to `AUTO` sessions holding the
    /// `category` bit. Anything else asks the user first.
    async fn readable_session(
        &self,
        origin: &str,
        source_public_key: &str,
        category: AllowedPrivateData,
        kind: ConfirmationKind,
        message: String,
    ) -> Result<DappSession, BackendError> {
        let session = self.authorized_session(origin, source_public_key).await?;
        let automatic = session.private_data_permission == PrivateDataPermission::Auto
            && session.allowed_private_data.allows(category);
        if !automatic {
            self.confirm(
                self.confirmation_for(kind, origin, &session, vec![message])
                    .await?,
            )
            .await?;
        }
        Ok(session)
    }
}
