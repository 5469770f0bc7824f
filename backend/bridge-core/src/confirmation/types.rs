use crate::page::protocol::{AllowedPrivateData, DappMetadata, PrivateDataPermission};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfirmationKind {
    Connect,
    Sign,
    Transaction,
    Consume,
    /// Reads gated by a session without automatic private data access.
    PrivateNotes,
    Assets,
    ConsumableNotes,
}

/// What the approval UI renders for one pending dApp action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequest {
    pub id: String,
    pub kind: ConfirmationKind,
    pub origin: String,
    pub app_meta: DappMetadata,
    pub network: String,
    pub network_rpc: String,
    pub private_data_permission: PrivateDataPermission,
    pub allowed_private_data: AllowedPrivateData,
    pub existing_permission: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_public_key: Option<String>,
    /// Human-readable lines describing what the user is approving.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_messages: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResult {
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_data_permission: Option<PrivateDataPermission>,
    #[serde(default)]
    pub delegate: bool,
}

impl ConfirmationResult {
    pub fn approve(account_public_key: impl Into<String>) -> Self {
        Self {
            confirmed: true,
            account_public_key: Some(account_public_key.into()),
            ..Self::default()
        }
    }

    pub fn deny() -> Self {
        Self::default()
    }

    pub fn with_delegate(mut self, delegate: bool) -> Self {
        self.delegate = delegate;
        self
    }
}
