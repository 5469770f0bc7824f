//! Wallet capabilities the bridge dispatches to.
//!
//! The bridge treats the backend as opaque: it routes validated requests here
//! and relays whatever comes back. Implementations own persistence, key
//! management and ledger access.

pub mod memory;
pub mod types;

pub use memory::MemoryWalletBackend;
pub use types::{
    AnalyticsEvent, DappSession, DappSessions, TransactionIntent, WalletAccount, WalletNetwork,
    WalletState, WalletStatus,
};

use crate::error::backend::BackendError;

use common::RedactedSecret;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

#[async_trait]
pub trait WalletBackend: Send + Sync + 'static {
    /// Loads persisted state. Called once per adapter.
    async fn init(&self) -> Result<(), BackendError>;

    /// Fires after every state mutation.
    fn state_changes(&self) -> broadcast::Receiver<()>;

    async fn get_state(&self) -> Result<WalletState, BackendError>;

    // Wallet lifecycle

    async fn register_new_wallet(
        &self,
        password: &RedactedSecret,
        mnemonic: Option<&RedactedSecret>,
        own_mnemonic: bool,
    ) -> Result<(), BackendError>;

    async fn register_imported_wallet(
        &self,
        password: &RedactedSecret,
        mnemonic: &RedactedSecret,
    ) -> Result<(), BackendError>;

    async fn unlock(&self, password: &RedactedSecret) -> Result<(), BackendError>;

    async fn lock(&self) -> Result<(), BackendError>;

    // Accounts

    async fn create_account(
        &self,
        wallet_type: Option<&str>,
        name: Option<&str>,
    ) -> Result<(), BackendError>;

    async fn update_current_account(&self, account_public_key: &str) -> Result<(), BackendError>;

    async fn edit_account_name(
        &self,
        account_public_key: &str,
        name: &str,
    ) -> Result<(), BackendError>;

    async fn remove_account(
        &self,
        account_public_key: &str,
        password: &RedactedSecret,
    ) -> Result<(), BackendError>;

    async fn import_account(
        &self,
        private_key: &RedactedSecret,
        enc_password: Option<&RedactedSecret>,
    ) -> Result<(), BackendError>;

    async fn reveal_mnemonic(&self, password: &RedactedSecret) -> Result<String, BackendError>;

    async fn reveal_private_key(
        &self,
        account_public_key: &str,
        password: &RedactedSecret,
    ) -> Result<String, BackendError>;

    // Settings, signing and analytics

    async fn update_settings(&self, settings: &Value) -> Result<(), BackendError>;

    async fn sign_transaction(
        &self,
        public_key: &str,
        signing_inputs: &str,
    ) -> Result<String, BackendError>;

    async fn get_auth_secret_key(&self, key: &str) -> Result<String, BackendError>;

    async fn record_event(&self, event: AnalyticsEvent) -> Result<(), BackendError>;

    // dApp sessions

    async fn is_dapp_enabled(&self) -> Result<bool, BackendError>;

    async fn dapp_sessions(&self) -> Result<DappSessions, BackendError>;

    async fn dapp_session(
        &self,
        origin: &str,
        account_id: &str,
    ) -> Result<Option<DappSession>, BackendError>;

    async fn save_dapp_session(
        &self,
        origin: &str,
        session: DappSession,
    ) -> Result<(), BackendError>;

    /// Removes one account's session, or every session of `origin` when
    /// `account_id` is `None`. Returns what is left.
    async fn remove_dapp_session(
        &self,
        origin: &str,
        account_id: Option<&str>,
    ) -> Result<DappSessions, BackendError>;

    // dApp capabilities

    async fn current_account_public_key(&self) -> Result<Option<String>, BackendError>;

    async fn account_public_key_bytes(&self, account_id: &str) -> Result<Vec<u8>, BackendError>;

    /// RPC endpoint for a network id. Unknown networks are `InvalidParams`.
    async fn network_rpc(&self, network: &str) -> Result<String, BackendError>;

    async fn sign_payload(
        &self,
        account_id: &str,
        payload: &str,
        kind: &str,
    ) -> Result<String, BackendError>;

    /// Returns the transaction id.
    async fn submit_transaction(
        &self,
        account_id: &str,
        intent: &TransactionIntent,
        delegate: bool,
    ) -> Result<String, BackendError>;

    async fn assets(&self, account_id: &str) -> Result<Vec<Value>, BackendError>;

    async fn private_notes(
        &self,
        account_id: &str,
        filter: &str,
        note_ids: Option<&[String]>,
    ) -> Result<Vec<Value>, BackendError>;

    async fn consumable_notes(&self, account_id: &str) -> Result<Vec<Value>, BackendError>;

    /// Returns the imported note id.
    async fn import_private_note(&self, account_id: &str, note: &str)
    -> Result<String, BackendError>;

    async fn wait_for_transaction(&self, tx_id: &str) -> Result<Value, BackendError>;
}
