//! Messages exchanged between an untrusted page and the wallet host.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PING: &str = "PING";
pub const PONG: &str = "PONG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageMessageType {
    #[serde(rename = "WALLET_PAGE_REQUEST")]
    Request,
    #[serde(rename = "WALLET_PAGE_RESPONSE")]
    Response,
    #[serde(rename = "WALLET_PAGE_ERROR_RESPONSE")]
    ErrorResponse,
}

/// Envelope posted on the page channel. `req_id` is absent only on legacy
/// probes; responses echo the id of the request they answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMessage {
    #[serde(rename = "type")]
    pub kind: PageMessageType,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "reqId", default, skip_serializing_if = "Option::is_none")]
    pub req_id: Option<String>,
}

impl PageMessage {
    pub fn request(payload: Value, req_id: impl Into<String>) -> Self {
        Self {
            kind: PageMessageType::Request,
            payload,
            req_id: Some(req_id.into()),
        }
    }

    pub fn response(payload: Value, req_id: Option<String>) -> Self {
        Self {
            kind: PageMessageType::Response,
            payload,
            req_id,
        }
    }

    pub fn error_response(payload: Value, req_id: Option<String>) -> Self {
        Self {
            kind: PageMessageType::ErrorResponse,
            payload,
            req_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DappErrorType {
    #[serde(rename = "NOT_GRANTED")]
    NotGranted,
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    #[serde(rename = "INVALID_PARAMS")]
    InvalidParams,
    #[serde(rename = "NETWORK_NOT_GRANTED")]
    NetworkNotGranted,
}

impl DappErrorType {
    /// Checked in this order; `NETWORK_NOT_GRANTED` contains `NOT_GRANTED`.
    pub const ALL: [DappErrorType; 4] = [
        DappErrorType::NetworkNotGranted,
        DappErrorType::NotGranted,
        DappErrorType::NotFound,
        DappErrorType::InvalidParams,
    ];

    pub const fn code(&self) -> &'static str {
        match self {
            DappErrorType::NotGranted => "NOT_GRANTED",
            DappErrorType::NotFound => "NOT_FOUND",
            DappErrorType::InvalidParams => "INVALID_PARAMS",
            DappErrorType::NetworkNotGranted => "NETWORK_NOT_GRANTED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DappMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivateDataPermission {
    #[default]
    #[serde(rename = "UPON_REQUEST")]
    UponRequest,
    #[serde(rename = "AUTO")]
    Auto,
}

/// Bit set of private data categories a session may read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowedPrivateData(pub u8);

impl AllowedPrivateData {
    pub const NONE: AllowedPrivateData = AllowedPrivateData(0);
    pub const ASSETS: AllowedPrivateData = AllowedPrivateData(1);
    pub const NOTES: AllowedPrivateData = AllowedPrivateData(1 << 1);
    pub const STORAGE: AllowedPrivateData = AllowedPrivateData(1 << 2);
    pub const ALL: AllowedPrivateData = AllowedPrivateData(0b111);

    pub const fn allows(&self, category: AllowedPrivateData) -> bool {
        self.0 & category.0 == category.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransaction {
    pub sender_account_id: String,
    pub recipient_account_id: String,
    pub faucet_id: String,
    pub note_type: String,
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recall_blocks: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeTransaction {
    pub faucet_id: String,
    pub note_id: String,
    pub note_type: String,
    pub amount: u64,
}

/// Opaque, pre-built transaction. `transaction_request` is base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTransaction {
    pub account_id: String,
    pub transaction_request: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_note_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum DappRequest {
    GetCurrentPermissionRequest,
    PermissionRequest {
        app_meta: DappMetadata,
        network: String,
        #[serde(default)]
        force: bool,
        #[serde(default)]
        private_data_permission: PrivateDataPermission,
        #[serde(default)]
        allowed_private_data: AllowedPrivateData,
    },
    DisconnectRequest,
    TransactionRequest {
        source_public_key: String,
        transaction: CustomTransaction,
    },
    SendTransactionRequest {
        source_public_key: String,
        transaction: SendTransaction,
    },
    ConsumeRequest {
        source_public_key: String,
        transaction: ConsumeTransaction,
    },
    PrivateNotesRequest {
        source_public_key: String,
        notefilter_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note_ids: Option<Vec<String>>,
    },
    SignRequest {
        source_account_id: String,
        source_public_key: String,
        payload: String,
        kind: String,
    },
    AssetsRequest {
        source_public_key: String,
    },
    ImportPrivateNoteRequest {
        source_public_key: String,
        note: String,
    },
    ConsumableNotesRequest {
        source_public_key: String,
    },
    WaitForTransactionRequest {
        tx_id: String,
    },
}

/// What the host reports for an origin's current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc: Option<String>,
    pub account_id: String,
    pub private_data_permission: PrivateDataPermission,
    pub allowed_private_data: AllowedPrivateData,
}

/// Compares the fields that decide whether a page must re-bind: address and rpc.
pub fn same_permission(left: Option<&PermissionInfo>, right: Option<&PermissionInfo>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(left), Some(right)) => left.account_id == right.account_id && left.rpc == right.rpc,
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum DappResponse {
    GetCurrentPermissionResponse {
        permission: Option<PermissionInfo>,
    },
    PermissionResponse {
        account_id: String,
        network: String,
        private_data_permission: PrivateDataPermission,
        allowed_private_data: AllowedPrivateData,
        /// Base64 encoded.
        public_key: String,
    },
    DisconnectResponse,
    TransactionResponse {
        transaction_id: Option<String>,
    },
    SendTransactionResponse {
        transaction_id: Option<String>,
    },
    ConsumeResponse {
        transaction_id: Option<String>,
    },
    PrivateNotesResponse {
        private_notes: Vec<Value>,
    },
    SignResponse {
        signature: String,
    },
    AssetsResponse {
        assets: Vec<Value>,
    },
    ImportPrivateNoteResponse {
        note_id: String,
    },
    ConsumableNotesResponse {
        consumable_notes: Vec<Value>,
    },
    WaitForTransactionResponse {
        transaction_output: Value,
    },
}
