use crate::page::protocol::{
    AllowedPrivateData, ConsumeTransaction, CustomTransaction, DappMetadata, PrivateDataPermission,
    SendTransaction,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletStatus {
    Idle,
    Locked,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    pub public_key: String,
    pub name: String,
    pub is_public: bool,
    pub hd_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletNetwork {
    pub id: String,
    pub name: String,
    pub rpc_base_url: String,
}

/// Snapshot returned by `GetStateRequest`. Never carries key material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletState {
    pub status: WalletStatus,
    pub accounts: Vec<WalletAccount>,
    pub current_account: Option<WalletAccount>,
    pub networks: Vec<WalletNetwork>,
    pub settings: Value,
    pub own_mnemonic: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DappSession {
    pub network: String,
    pub app_meta: DappMetadata,
    pub account_id: String,
    pub private_data_permission: PrivateDataPermission,
    pub allowed_private_data: AllowedPrivateData,
    /// Base64 encoded.
    pub public_key: String,
}

/// Sessions keyed by page origin.
pub type DappSessions = BTreeMap<String, Vec<DappSession>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnalyticsEvent {
    Track { event: String, properties: Value },
    Page { path: String, properties: Value },
    Performance { event: String, properties: Value },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionIntent {
    Send(SendTransaction),
    Consume(ConsumeTransaction),
    Custom(CustomTransaction),
}
