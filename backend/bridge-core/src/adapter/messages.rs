//! Typed wallet requests and responses carried in envelope payloads.
//!
//! Every payload is a JSON object tagged by `type`. Responses use the request's
//! type with the `Request` suffix replaced by `Response`.

use crate::backend::{DappSessions, WalletState};

use common::RedactedSecret;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum WalletRequest {
    GetStateRequest,
    NewWalletRequest {
        password: RedactedSecret,
        #[serde(default)]
        mnemonic: Option<RedactedSecret>,
        #[serde(default)]
        own_mnemonic: bool,
    },
    ImportFromClientRequest {
        password: RedactedSecret,
        mnemonic: RedactedSecret,
    },
    UnlockRequest {
        password: RedactedSecret,
    },
    LockRequest,
    CreateAccountRequest {
        #[serde(default)]
        wallet_type: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
    UpdateCurrentAccountRequest {
        account_public_key: String,
    },
    RevealMnemonicRequest {
        password: RedactedSecret,
    },
    RevealPrivateKeyRequest {
        account_public_key: String,
        password: RedactedSecret,
    },
    RemoveAccountRequest {
        account_public_key: String,
        password: RedactedSecret,
    },
    EditAccountRequest {
        account_public_key: String,
        name: String,
    },
    ImportAccountRequest {
        private_key: RedactedSecret,
        #[serde(default)]
        enc_password: Option<RedactedSecret>,
    },
    UpdateSettingsRequest {
        settings: Value,
    },
    SignTransactionRequest {
        public_key: String,
        signing_inputs: String,
    },
    GetAuthSecretKeyRequest {
        key: String,
    },
    DAppGetAllSessionsRequest,
    DAppRemoveSessionRequest {
        origin: String,
        #[serde(default)]
        account_id: Option<String>,
    },
    PageRequest {
        origin: String,
        payload: Value,
    },
    SendTrackEventRequest {
        event: String,
        #[serde(default)]
        properties: Value,
    },
    SendPageEventRequest {
        path: String,
        #[serde(default)]
        properties: Value,
    },
    SendPerformanceEventRequest {
        event: String,
        #[serde(default)]
        properties: Value,
    },
}

/// Discriminant of [`WalletRequest`], used to tell unknown types from malformed ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletRequestType {
    GetState,
    NewWallet,
    ImportFromClient,
    Unlock,
    Lock,
    CreateAccount,
    UpdateCurrentAccount,
    RevealMnemonic,
    RevealPrivateKey,
    RemoveAccount,
    EditAccount,
    ImportAccount,
    UpdateSettings,
    SignTransaction,
    GetAuthSecretKey,
    DAppGetAllSessions,
    DAppRemoveSession,
    Page,
    SendTrackEvent,
    SendPageEvent,
    SendPerformanceEvent,
}

impl WalletRequestType {
    pub const ALL: [WalletRequestType; 21] = [
        WalletRequestType::GetState,
        WalletRequestType::NewWallet,
        WalletRequestType::ImportFromClient,
        WalletRequestType::Unlock,
        WalletRequestType::Lock,
        WalletRequestType::CreateAccount,
        WalletRequestType::UpdateCurrentAccount,
        WalletRequestType::RevealMnemonic,
        WalletRequestType::RevealPrivateKey,
        WalletRequestType::RemoveAccount,
        WalletRequestType::EditAccount,
        WalletRequestType::ImportAccount,
        WalletRequestType::UpdateSettings,
        WalletRequestType::SignTransaction,
        WalletRequestType::GetAuthSecretKey,
        WalletRequestType::DAppGetAllSessions,
        WalletRequestType::DAppRemoveSession,
        WalletRequestType::Page,
        WalletRequestType::SendTrackEvent,
        WalletRequestType::SendPageEvent,
        WalletRequestType::SendPerformanceEvent,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            WalletRequestType::GetState => "GetStateRequest",
            WalletRequestType::NewWallet => "NewWalletRequest",
            WalletRequestType::ImportFromClient => "ImportFromClientRequest",
            WalletRequestType::Unlock => "UnlockRequest",
            WalletRequestType::Lock => "LockRequest",
            WalletRequestType::CreateAccount => "CreateAccountRequest",
            WalletRequestType::UpdateCurrentAccount => "UpdateCurrentAccountRequest",
            WalletRequestType::RevealMnemonic => "RevealMnemonicRequest",
            WalletRequestType::RevealPrivateKey => "RevealPrivateKeyRequest",
            WalletRequestType::RemoveAccount => "RemoveAccountRequest",
            WalletRequestType::EditAccount => "EditAccountRequest",
            WalletRequestType::ImportAccount => "ImportAccountRequest",
            WalletRequestType::UpdateSettings => "UpdateSettingsRequest",
            WalletRequestType::SignTransaction => "SignTransactionRequest",
            WalletRequestType::GetAuthSecretKey => "GetAuthSecretKeyRequest",
            WalletRequestType::DAppGetAllSessions => "DAppGetAllSessionsRequest",
            WalletRequestType::DAppRemoveSession => "DAppRemoveSessionRequest",
            WalletRequestType::Page => "PageRequest",
            WalletRequestType::SendTrackEvent => "SendTrackEventRequest",
            WalletRequestType::SendPageEvent => "SendPageEventRequest",
            WalletRequestType::SendPerformanceEvent => "SendPerformanceEventRequest",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl WalletRequest {
    pub fn request_type(&self) -> WalletRequestType {
        match self {
            WalletRequest::GetStateRequest => WalletRequestType::GetState,
            WalletRequest::NewWalletRequest { .. } => WalletRequestType::NewWallet,
            WalletRequest::ImportFromClientRequest { .. } => WalletRequestType::ImportFromClient,
            WalletRequest::UnlockRequest { .. } => WalletRequestType::Unlock,
            WalletRequest::LockRequest => WalletRequestType::Lock,
            WalletRequest::CreateAccountRequest { .. } => WalletRequestType::CreateAccount,
            WalletRequest::UpdateCurrentAccountRequest { .. } => {
                WalletRequestType::UpdateCurrentAccount
            }
            WalletRequest::RevealMnemonicRequest { .. } => WalletRequestType::RevealMnemonic,
            WalletRequest::RevealPrivateKeyRequest { .. } => WalletRequestType::RevealPrivateKey,
            WalletRequest::RemoveAccountRequest { .. } => WalletRequestType::RemoveAccount,
            WalletRequest::EditAccountRequest { .. } => WalletRequestType::EditAccount,
            WalletRequest::ImportAccountRequest { .. } => WalletRequestType::ImportAccount,
            WalletRequest::UpdateSettingsRequest { .. } => WalletRequestType::UpdateSettings,
            WalletRequest::SignTransactionRequest { .. } => WalletRequestType::SignTransaction,
            WalletRequest::GetAuthSecretKeyRequest { .. } => WalletRequestType::GetAuthSecretKey,
            WalletRequest::DAppGetAllSessionsRequest => WalletRequestType::DAppGetAllSessions,
            WalletRequest::DAppRemoveSessionRequest { .. } => WalletRequestType::DAppRemoveSession,
            WalletRequest::PageRequest { .. } => WalletRequestType::Page,
            WalletRequest::SendTrackEventRequest { .. } => WalletRequestType::SendTrackEvent,
            WalletRequest::SendPageEventRequest { .. } => WalletRequestType::SendPageEvent,
            WalletRequest::SendPerformanceEventRequest { .. } => {
                WalletRequestType::SendPerformanceEvent
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum WalletResponse {
    GetStateResponse { state: WalletState },
    NewWalletResponse,
    ImportFromClientResponse,
    UnlockResponse,
    LockResponse,
    CreateAccountResponse,
    UpdateCurrentAccountResponse,
    RevealMnemonicResponse { mnemonic: String },
    RevealPrivateKeyResponse { private_key: String },
    RemoveAccountResponse,
    EditAccountResponse,
    ImportAccountResponse,
    UpdateSettingsResponse,
    SignTransactionResponse { signature: String },
    GetAuthSecretKeyResponse { key: String },
    DAppGetAllSessionsResponse { sessions: DappSessions },
    DAppRemoveSessionResponse { sessions: DappSessions },
    PageResponse { payload: Value },
    SendTrackEventResponse,
    SendPageEventResponse,
    SendPerformanceEventResponse,
}

/// Pushed to every subscriber without a correlation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WalletNotification {
    StateUpdated,
}
