//! In-process adapter: the backend side of the bridge.
//!
//! Validates request payloads, routes them through an exhaustive dispatch table
//! to a [`WalletBackend`] and fans backend state changes out to subscribers.

pub mod messages;

pub use messages::{WalletNotification, WalletRequest, WalletRequestType, WalletResponse};

use crate::backend::{AnalyticsEvent, WalletBackend};
use crate::confirmation::ConfirmationStore;
use crate::error::bridge::BridgeError;
use crate::page::host::PageHost;
use crate::rpc::subscribers::{Subscribers, Subscription};

use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::OnceCell;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use std::sync::{Arc, Mutex, PoisonError};

struct AdapterInner<B: WalletBackend> {
    backend: Arc<B>,
    page_host: PageHost<B>,
    initialized: OnceCell<()>,
    subscribers: Subscribers<Value>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl<B: WalletBackend> Drop for AdapterInner<B> {
    fn drop(&mut self) {
        let watcher = self
            .watcher
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watcher) = watcher {
            watcher.abort();
        }
    }
}

pub struct InProcessAdapter<B: WalletBackend> {
    inner: Arc<AdapterInner<B>>,
}

impl<B: WalletBackend> Clone for InProcessAdapter<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B: WalletBackend> InProcessAdapter<B> {
    pub fn new(backend: Arc<B>, confirmations: ConfirmationStore) -> Self {
        Self {
            inner: Arc::new(AdapterInner {
                page_host: PageHost::new(backend.clone(), confirmations),
                backend,
                initialized: OnceCell::new(),
                subscribers: Subscribers::new(),
                watcher: Mutex::new(None),
            }),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.inner.backend
    }

    pub fn page_host(&self) -> &PageHost<B> {
        &self.inner.page_host
    }

    pub fn confirmations(&self) -> &ConfirmationStore {
        self.inner.page_host.confirmations()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.initialized()
    }

    /// Bootstraps the backend and attaches the state watcher. Concurrent and
    /// repeated calls share a single bootstrap; a failed one may be retried.
    pub async fn init(&self) -> Result<(), BridgeError> {
        self.inner
            .initialized
            .get_or_try_init(|| async {
                info!("Initializing wallet backend");
                self.inner.backend.init().await?;
                self.attach_watcher();
                Ok::<(), BridgeError>(())
            })
            .await
            .map(|_| ())
    }

    fn attach_watcher(&self) {
        let mut changes = self.inner.backend.state_changes();
        let subscribers = self.inner.subscribers.clone();
        let notification = match serde_json::to_value(WalletNotification::StateUpdated) {
            Ok(notification) => notification,
            Err(e) => {
                warn!("Cannot encode state notification, watcher disabled: {}", e);
                return;
            }
        };

        let watcher = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(()) | Err(RecvError::Lagged(_)) => {
                        subscribers.notify(&notification);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Wallet state watcher stopped");
        });
        *self
            .inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(watcher);
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.subscribers.add(callback)
    }

    /// Handles a raw payload. Unknown request types yield `Ok(None)`; a known
    /// type with missing or mistyped fields is `InvalidParams`.
    pub async fn request(&self, payload: Value) -> Result<Option<Value>, BridgeError> {
        self.init().await?;

        let type_name = payload.get("type").and_then(Value::as_str);
        let Some(request_type) = type_name.and_then(WalletRequestType::from_name) else {
            warn!("Ignoring request of unknown type {:?}", type_name);
            return Ok(None);
        };

        let request: WalletRequest = serde_json::from_value(payload).map_err(|e| {
            BridgeError::invalid_params(format!("Malformed {}: {e}", request_type.name()))
        })?;
        let response = self.dispatch(request).await?;
        serde_json::to_value(response)
            .map(Some)
            .map_err(|e| BridgeError::unknown(format!("Cannot encode response: {e}")))
    }

    pub async fn dispatch(&self, request: WalletRequest) -> Result<WalletResponse, BridgeError> {
        self.init().await?;
        debug!("Dispatching {}", request.request_type().name());
        let backend = &self.inner.backend;

        let response = match request {
            WalletRequest::GetStateRequest => WalletResponse::GetStateResponse {
                state: backend.get_state().await?,
            },
            WalletRequest::NewWalletRequest {
                password,
                mnemonic,
                own_mnemonic,
            } => {
                backend
                    .register_new_wallet(&password, mnemonic.as_ref(), own_mnemonic)
                    .await?;
                WalletResponse::NewWalletResponse
            }
            WalletRequest::ImportFromClientRequest { password, mnemonic } => {
                backend
                    .register_imported_wallet(&password, &mnemonic)
                    .await?;
                WalletResponse::ImportFromClientResponse
            }
            WalletRequest::UnlockRequest { password } => {
                backend.unlock(&password).await?;
                WalletResponse::UnlockResponse
            }
            WalletRequest::LockRequest => {
                backend.lock().await?;
                WalletResponse::LockResponse
            }
            WalletRequest::CreateAccountRequest { wallet_type, name } => {
                backend
                    .create_account(wallet_type.as_deref(), name.as_deref())
                    .await?;
                WalletResponse::CreateAccountResponse
            }
            WalletRequest::UpdateCurrentAccountRequest { account_public_key } => {
                backend.update_current_account(&account_public_key).await?;
                WalletResponse::UpdateCurrentAccountResponse
            }
            WalletRequest::RevealMnemonicRequest { password } => {
                WalletResponse::RevealMnemonicResponse {
                    mnemonic: backend.reveal_mnemonic(&password).await?,
                }
            }
            WalletRequest::RevealPrivateKeyRequest {
                account_public_key,
                password,
            } => WalletResponse::RevealPrivateKeyResponse {
                private_key: backend
                    .reveal_private_key(&account_public_key, &password)
                    .await?,
            },
            WalletRequest::RemoveAccountRequest {
                account_public_key,
                password,
            } => {
                backend
                    .remove_account(&account_public_key, &password)
                    .await?;
                WalletResponse::RemoveAccountResponse
            }
            WalletRequest::EditAccountRequest {
                account_public_key,
                name,
            } => {
                backend
                    .edit_account_name(&account_public_key, &name)
                    .await?;
                WalletResponse::EditAccountResponse
            }
            WalletRequest::ImportAccountRequest {
                private_key,
                enc_password,
            } => {
                backend
                    .import_account(&private_key, enc_password.as_ref())
                    .await?;
                WalletResponse::ImportAccountResponse
            }
            WalletRequest::UpdateSettingsRequest { settings } => {
                backend.update_settings(&settings).await?;
                WalletResponse::UpdateSettingsResponse
            }
            WalletRequest::SignTransactionRequest {
                public_key,
                signing_inputs,
            } => WalletResponse::SignTransactionResponse {
                signature: backend
                    .sign_transaction(&public_key, &signing_inputs)
                    .await?,
            },
            WalletRequest::GetAuthSecretKeyRequest { key } => {
                WalletResponse::GetAuthSecretKeyResponse {
                    key: backend.get_auth_secret_key(&key).await?,
                }
            }
            WalletRequest::DAppGetAllSessionsRequest => WalletResponse::DAppGetAllSessionsResponse {
                sessions: backend.dapp_sessions().await?,
            },
            WalletRequest::DAppRemoveSessionRequest { origin, account_id } => {
                WalletResponse::DAppRemoveSessionResponse {
                    sessions: backend
                        .remove_dapp_session(&origin, account_id.as_deref())
                        .await?,
                }
            }
            WalletRequest::PageRequest { origin, payload } => WalletResponse::PageResponse {
                payload: self.inner.page_host.handle(&origin, payload).await?,
            },
            WalletRequest::SendTrackEventRequest { event, properties } => {
                backend
                    .record_event(AnalyticsEvent::Track { event, properties })
                    .await?;
                WalletResponse::SendTrackEventResponse
            }
            WalletRequest::SendPageEventRequest { path, properties } => {
                backend
                    .record_event(AnalyticsEvent::Page { path, properties })
                    .await?;
                WalletResponse::SendPageEventResponse
            }
            WalletRequest::SendPerformanceEventRequest { event, properties } => {
                backend
                    .record_event(AnalyticsEvent::Performance { event, properties })
                    .await?;
                WalletResponse::SendPerformanceEventResponse
            }
        };

        Ok(response)
    }
}
