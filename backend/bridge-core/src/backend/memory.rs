//! Volatile wallet backend for the demo host and tests.
//!
//! Keys and signatures here are deterministic placeholders, not cryptography.

use crate::backend::WalletBackend;
use crate::backend::types::{
    AnalyticsEvent, DappSession, DappSessions, TransactionIntent, WalletAccount, WalletNetwork,
    WalletState, WalletStatus,
};
use crate::error::backend::BackendError;

use common::RedactedSecret;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, info};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use uuid::Uuid;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

const STATE_CHANNEL_CAPACITY: usize = 64;
const MNEMONIC_LENGTH: usize = 12;
const MNEMONIC_WORDS: [&str; 16] = [
    "amber", "bridge", "cedar", "delta", "ember", "fable", "garnet", "harbor", "island", "jungle",
    "kettle", "lantern", "meadow", "nickel", "orbit", "pepper",
];

struct StoredAccount {
    account: WalletAccount,
    secret: String,
}

#[derive(Default)]
struct Vault {
    password: Option<String>,
    mnemonic: Option<String>,
    unlocked: bool,
    own_mnemonic: Option<bool>,
    accounts: Vec<StoredAccount>,
    current: Option<String>,
    settings: Value,
    sessions: DappSessions,
    auth_keys: HashMap<String, String>,
    assets: HashMap<String, Vec<Value>>,
    notes: HashMap<String, Vec<Value>>,
    transactions: HashMap<String, Value>,
    events: Vec<AnalyticsEvent>,
    next_tx: u64,
}

fn fingerprint(input: &str) -> u64 {
    input.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

fn derive_account(mnemonic: &str, index: u32, name: String) -> StoredAccount {
    let seed = fingerprint(&format!("{mnemonic}/{index}"));
    StoredAccount {
        account: WalletAccount {
            public_key: format!("0x{seed:016x}"),
            name,
            is_public: true,
            hd_index: index,
        },
        secret: format!("{:016x}{seed:016x}", fingerprint(mnemonic)),
    }
}

fn generate_mnemonic() -> String {
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(MNEMONIC_LENGTH)
        .map(|byte| MNEMONIC_WORDS[usize::from(*byte) % MNEMONIC_WORDS.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

impl Vault {
    fn status(&self) -> WalletStatus {
        match (&self.password, self.unlocked) {
            (None, _) => WalletStatus::Idle,
            (Some(_), false) => WalletStatus::Locked,
            (Some(_), true) => WalletStatus::Ready,
        }
    }

    fn check_password(&self, password: &RedactedSecret) -> Result<(), BackendError> {
        match &self.password {
            None => Err(BackendError::failed("Wallet is not initialized")),
            Some(stored) if stored == password.expose() => Ok(()),
            Some(_) => Err(BackendError::failed("Invalid password")),
        }
    }

    fn require_ready(&self) -> Result<(), BackendError> {
        match self.status() {
            WalletStatus::Ready => Ok(()),
            WalletStatus::Locked => Err(BackendError::failed("Wallet is locked")),
            WalletStatus::Idle => Err(BackendError::failed("Wallet is not initialized")),
        }
    }

    fn account(&self, public_key: &str) -> Result<&StoredAccount, BackendError> {
        self.accounts
            .iter()
            .find(|stored| stored.account.public_key == public_key)
            .ok_or_else(|| BackendError::not_found(format!("Account {public_key} not found")))
    }

    fn reset_wallet(&mut self, password: &RedactedSecret, mnemonic: String, own_mnemonic: bool) {
        let first = derive_account(&mnemonic, 0, "Account 1".to_string());
        self.current = Some(first.account.public_key.clone());
        self.accounts = vec![first];
        self.password = Some(password.expose().to_string());
        self.mnemonic = Some(mnemonic);
        self.own_mnemonic = Some(own_mnemonic);
        self.unlocked = true;
        self.sessions.clear();
    }
}

pub struct MemoryWalletBackend {
    vault: Mutex<Vault>,
    networks: Vec<WalletNetwork>,
    dapp_enabled: AtomicBool,
    bootstraps: AtomicUsize,
    changes: broadcast::Sender<()>,
}

impl Default for MemoryWalletBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWalletBackend {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        Self {
            vault: Mutex::new(Vault {
                settings: json!({}),
                ..Vault::default()
            }),
            networks: vec![
                WalletNetwork {
                    id: "testnet".to_string(),
                    name: "Testnet".to_string(),
                    rpc_base_url: "https://rpc.testnet.example.org".to_string(),
                },
                WalletNetwork {
                    id: "localnet".to_string(),
                    name: "Localnet".to_string(),
                    rpc_base_url: "http://127.0.0.1:57291".to_string(),
                },
            ],
            dapp_enabled: AtomicBool::new(true),
            bootstraps: AtomicUsize::new(0),
            changes,
        }
    }

    /// Pre-registered wallet in the locked state.
    pub fn with_locked_wallet(password: &str) -> Self {
        let backend = Self::new();
        {
            let mut vault = backend.vault();
            vault.reset_wallet(&RedactedSecret::new(password), generate_mnemonic(), false);
            vault.unlocked = false;
        }
        backend
    }

    /// Number of times [`WalletBackend::init`] ran.
    pub fn bootstrap_count(&self) -> usize {
        self.bootstraps.load(Ordering::SeqCst)
    }

    pub fn set_dapp_enabled(&self, enabled: bool) {
        self.dapp_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_assets(&self, account_id: &str, assets: Vec<Value>) {
        self.vault().assets.insert(account_id.to_string(), assets);
    }

    pub fn recorded_events(&self) -> Vec<AnalyticsEvent> {
        self.vault().events.clone()
    }

    fn vault(&self) -> MutexGuard<'_, Vault> {
        self.vault.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<R>(&self, f: impl FnOnce(&Vault) -> Result<R, BackendError>) -> Result<R, BackendError> {
        f(&self.vault())
    }

    /// Runs `f` and announces a state change when it succeeds.
    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Vault) -> Result<R, BackendError>,
    ) -> Result<R, BackendError> {
        let result = f(&mut self.vault())?;
        // No receivers simply means nobody is watching yet.
        let _ = self.changes.send(());
        Ok(result)
    }
}

#[async_trait]
impl WalletBackend for MemoryWalletBackend {
    async fn init(&self) -> Result<(), BackendError> {
        let count = self.bootstraps.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Memory wallet backend initialized (bootstrap #{})", count);
        Ok(())
    }

    fn state_changes(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }

    async fn get_state(&self) -> Result<WalletState, BackendError> {
        self.read(|vault| {
            let accounts: Vec<WalletAccount> = vault
                .accounts
                .iter()
                .map(|stored| stored.account.clone())
                .collect();
            let current_account = vault.current.as_ref().and_then(|current| {
                accounts
                    .iter()
                    .find(|account| &account.public_key == current)
                    .cloned()
            });
            Ok(WalletState {
                status: vault.status(),
                accounts,
                current_account,
                networks: self.networks.clone(),
                settings: vault.settings.clone(),
                own_mnemonic: vault.own_mnemonic,
            })
        })
    }

    async fn register_new_wallet(
        &self,
        password: &RedactedSecret,
        mnemonic: Option<&RedactedSecret>,
        own_mnemonic: bool,
    ) -> Result<(), BackendError> {
        if password.is_empty() {
            return Err(BackendError::invalid_params("Password must not be empty"));
        }
        let mnemonic = match mnemonic {
            Some(mnemonic) if !mnemonic.is_empty() => mnemonic.expose().to_string(),
            _ => generate_mnemonic(),
        };
        self.mutate(|vault| {
            vault.reset_wallet(password, mnemonic, own_mnemonic);
            Ok(())
        })
    }

    async fn register_imported_wallet(
        &self,
        password: &RedactedSecret,
        mnemonic: &RedactedSecret,
    ) -> Result<(), BackendError> {
        if password.is_empty() {
            return Err(BackendError::invalid_params("Password must not be empty"));
        }
        if mnemonic.expose().split_whitespace().count() < MNEMONIC_LENGTH {
            return Err(BackendError::invalid_params(format!(
                "Mnemonic must have at least {MNEMONIC_LENGTH} words"
            )));
        }
        let mnemonic = mnemonic.expose().to_string();
        self.mutate(|vault| {
            vault.reset_wallet(password, mnemonic, true);
            Ok(())
        })
    }

    async fn unlock(&self, password: &RedactedSecret) -> Result<(), BackendError> {
        self.mutate(|vault| {
            vault.check_password(password)?;
            vault.unlocked = true;
            Ok(())
        })
    }

    async fn lock(&self) -> Result<(), BackendError> {
        self.mutate(|vault| {
            if vault.password.is_none() {
                return Err(BackendError::failed("Wallet is not initialized"));
            }
            vault.unlocked = false;
            Ok(())
        })
    }

    async fn create_account(
        &self,
        wallet_type: Option<&str>,
        name: Option<&str>,
    ) -> Result<(), BackendError> {
        self.mutate(|vault| {
            vault.require_ready()?;
            let mnemonic = vault.mnemonic.clone().unwrap_or_default();
            let index = u32::try_from(vault.accounts.len())
                .map_err(|_| BackendError::failed("Too many accounts"))?;
            let name = name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Account {}", index + 1));
            let mut stored = derive_account(&mnemonic, index, name);
            stored.account.is_public =
                wallet_type.is_none_or(|kind| kind.eq_ignore_ascii_case("public"));
            vault.current = Some(stored.account.public_key.clone());
            vault.accounts.push(stored);
            Ok(())
        })
    }

    async fn update_current_account(&self, account_public_key: &str) -> Result<(), BackendError> {
        self.mutate(|vault| {
            vault.account(account_public_key)?;
            vault.current = Some(account_public_key.to_string());
            Ok(())
        })
    }

    async fn edit_account_name(
        &self,
        account_public_key: &str,
        name: &str,
    ) -> Result<(), BackendError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BackendError::invalid_params("Account name must not be empty"));
        }
        self.mutate(|vault| {
            let stored = vault
                .accounts
                .iter_mut()
                .find(|stored| stored.account.public_key == account_public_key)
                .ok_or_else(|| {
                    BackendError::not_found(format!("Account {account_public_key} not found"))
                })?;
            stored.account.name = name.to_string();
            Ok(())
        })
    }

    async fn remove_account(
        &self,
        account_public_key: &str,
        password: &RedactedSecret,
    ) -> Result<(), BackendError> {
        self.mutate(|vault| {
            vault.check_password(password)?;
            vault.account(account_public_key)?;
            if vault.accounts.len() == 1 {
                return Err(BackendError::failed("Cannot remove the last account"));
            }
            vault
                .accounts
                .retain(|stored| stored.account.public_key != account_public_key);
            if vault.current.as_deref() == Some(account_public_key) {
                vault.current = vault
                    .accounts
                    .first()
                    .map(|stored| stored.account.public_key.clone());
            }
            Ok(())
        })
    }

    async fn import_account(
        &self,
        private_key: &RedactedSecret,
        enc_password: Option<&RedactedSecret>,
    ) -> Result<(), BackendError> {
        if private_key.is_empty() {
            return Err(BackendError::invalid_params("Private key must not be empty"));
        }
        let secret = match enc_password {
            Some(password) => format!("{}:{}", password.expose(), private_key.expose()),
            None => private_key.expose().to_string(),
        };
        self.mutate(|vault| {
            vault.require_ready()?;
            let public_key = format!("0x{:016x}", fingerprint(&secret));
            if vault.account(&public_key).is_ok() {
                return Err(BackendError::failed("Account already exists"));
            }
            let index = u32::try_from(vault.accounts.len())
                .map_err(|_| BackendError::failed("Too many accounts"))?;
            vault.accounts.push(StoredAccount {
                account: WalletAccount {
                    public_key,
                    name: format!("Imported Account {}", index + 1),
                    is_public: true,
                    hd_index: index,
                },
                secret,
            });
            Ok(())
        })
    }

    async fn reveal_mnemonic(&self, password: &RedactedSecret) -> Result<String, BackendError> {
        self.read(|vault| {
            vault.check_password(password)?;
            vault
                .mnemonic
                .clone()
                .ok_or_else(|| BackendError::failed("Wallet has no mnemonic"))
        })
    }

    async fn reveal_private_key(
        &self,
        account_public_key: &str,
        password: &RedactedSecret,
    ) -> Result<String, BackendError> {
        self.read(|vault| {
            vault.check_password(password)?;
            Ok(vault.account(account_public_key)?.secret.clone())
        })
    }

    async fn update_settings(&self, settings: &Value) -> Result<(), BackendError> {
        self.mutate(|vault| {
            match (&mut vault.settings, settings) {
                (Value::Object(current), Value::Object(update)) => {
                    for (key, value) in update {
                        current.insert(key.clone(), value.clone());
                    }
                }
                (current, update) => *current = update.clone(),
            }
            Ok(())
        })
    }

    async fn sign_transaction(
        &self,
        public_key: &str,
        signing_inputs: &str,
    ) -> Result<String, BackendError> {
        self.read(|vault| {
            vault.require_ready()?;
            let secret = &vault.account(public_key)?.secret;
            Ok(format!("{:016x}", fingerprint(&format!("{secret}:{signing_inputs}"))))
        })
    }

    async fn get_auth_secret_key(&self, key: &str) -> Result<String, BackendError> {
        let mut vault = self.vault();
        vault.require_ready()?;
        Ok(vault
            .auth_keys
            .entry(key.to_string())
            .or_insert_with(|| Uuid::new_v4().simple().to_string())
            .clone())
    }

    async fn record_event(&self, event: AnalyticsEvent) -> Result<(), BackendError> {
        debug!("Analytics event recorded: {:?}", event);
        self.vault().events.push(event);
        Ok(())
    }

    async fn is_dapp_enabled(&self) -> Result<bool, BackendError> {
        Ok(self.dapp_enabled.load(Ordering::SeqCst))
    }

    async fn dapp_sessions(&self) -> Result<DappSessions, BackendError> {
        self.read(|vault| Ok(vault.sessions.clone()))
    }

    async fn dapp_session(
        &self,
        origin: &str,
        account_id: &str,
    ) -> Result<Option<DappSession>, BackendError> {
        self.read(|vault| {
            Ok(vault.sessions.get(origin).and_then(|sessions| {
                sessions
                    .iter()
                    .find(|session| session.account_id == account_id)
                    .cloned()
            }))
        })
    }

    async fn save_dapp_session(
        &self,
        origin: &str,
        session: DappSession,
    ) -> Result<(), BackendError> {
        self.mutate(|vault| {
            let sessions = vault.sessions.entry(origin.to_string()).or_default();
            sessions.retain(|existing| existing.account_id != session.account_id);
            sessions.push(session);
            Ok(())
        })
    }

    async fn remove_dapp_session(
        &self,
        origin: &str,
        account_id: Option<&str>,
    ) -> Result<DappSessions, BackendError> {
        self.mutate(|vault| {
            match account_id {
                Some(account_id) => {
                    if let Some(sessions) = vault.sessions.get_mut(origin) {
                        sessions.retain(|session| session.account_id != account_id);
                        if sessions.is_empty() {
                            vault.sessions.remove(origin);
                        }
                    }
                }
                None => {
                    vault.sessions.remove(origin);
                }
            }
            Ok(vault.sessions.clone())
        })
    }

    async fn current_account_public_key(&self) -> Result<Option<String>, BackendError> {
        self.read(|vault| Ok(vault.current.clone()))
    }

    async fn account_public_key_bytes(&self, account_id: &str) -> Result<Vec<u8>, BackendError> {
        self.read(|vault| Ok(vault.account(account_id)?.account.public_key.as_bytes().to_vec()))
    }

    async fn network_rpc(&self, network: &str) -> Result<String, BackendError> {
        self.networks
            .iter()
            .find(|candidate| candidate.id == network)
            .map(|candidate| candidate.rpc_base_url.clone())
            .ok_or_else(|| BackendError::invalid_params(format!("Unknown network '{network}'")))
    }

    async fn sign_payload(
        &self,
        account_id: &str,
        payload: &str,
        kind: &str,
    ) -> Result<String, BackendError> {
        let bytes = BASE64
            .decode(payload)
            .map_err(|e| BackendError::invalid_params(format!("Payload is not base64: {e}")))?;
        self.read(|vault| {
            vault.require_ready()?;
            let secret = &vault.account(account_id)?.secret;
            let digest = fingerprint(&format!("{secret}:{kind}:{}", BASE64.encode(&bytes)));
            Ok(BASE64.encode(digest.to_be_bytes()))
        })
    }

    async fn submit_transaction(
        &self,
        account_id: &str,
        intent: &TransactionIntent,
        delegate: bool,
    ) -> Result<String, BackendError> {
        if let TransactionIntent::Send(send) = intent {
            if send.amount == 0 {
                return Err(BackendError::invalid_params("Amount must be positive"));
            }
        }
        self.mutate(|vault| {
            vault.require_ready()?;
            vault.account(account_id)?;
            vault.next_tx += 1;
            let transaction_id = format!("tx-{:06}", vault.next_tx);
            let kind = match intent {
                TransactionIntent::Send(_) => "send",
                TransactionIntent::Consume(_) => "consume",
                TransactionIntent::Custom(_) => "custom",
            };
            vault.transactions.insert(
                transaction_id.clone(),
                json!({
                    "transactionId": transaction_id,
                    "accountId": account_id,
                    "kind": kind,
                    "delegated": delegate,
                    "status": "committed",
                }),
            );
            Ok(transaction_id)
        })
    }

    async fn assets(&self, account_id: &str) -> Result<Vec<Value>, BackendError> {
        self.read(|vault| {
            vault.account(account_id)?;
            Ok(vault.assets.get(account_id).cloned().unwrap_or_default())
        })
    }

    async fn private_notes(
        &self,
        account_id: &str,
        filter: &str,
        note_ids: Option<&[String]>,
    ) -> Result<Vec<Value>, BackendError> {
        self.read(|vault| {
            vault.account(account_id)?;
            let notes = vault.notes.get(account_id).cloned().unwrap_or_default();
            match (filter, note_ids) {
                ("ids", Some(ids)) => Ok(notes
                    .into_iter()
                    .filter(|note| {
                        note.get("noteId")
                            .and_then(Value::as_str)
                            .is_some_and(|id| ids.iter().any(|wanted| wanted == id))
                    })
                    .collect()),
                ("ids", None) => Err(BackendError::invalid_params("noteIds required for 'ids' filter")),
                _ => Ok(notes),
            }
        })
    }

    async fn consumable_notes(&self, account_id: &str) -> Result<Vec<Value>, BackendError> {
        self.read(|vault| {
            vault.account(account_id)?;
            Ok(vault
                .notes
                .get(account_id)
                .map(|notes| {
                    notes
                        .iter()
                        .filter(|note| note.get("consumable").and_then(Value::as_bool) == Some(true))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    async fn import_private_note(
        &self,
        account_id: &str,
        note: &str,
    ) -> Result<String, BackendError> {
        BASE64
            .decode(note)
            .map_err(|e| BackendError::invalid_params(format!("Note is not base64: {e}")))?;
        self.mutate(|vault| {
            vault.account(account_id)?;
            let note_id = format!("0x{:016x}", fingerprint(note));
            vault.notes.entry(account_id.to_string()).or_default().push(json!({
                "noteId": note_id,
                "consumable": true,
            }));
            Ok(note_id)
        })
    }

    async fn wait_for_transaction(&self, tx_id: &str) -> Result<Value, BackendError> {
        self.read(|vault| {
            vault
                .transactions
                .get(tx_id)
                .cloned()
                .ok_or_else(|| BackendError::not_found(format!("Transaction {tx_id} not found")))
        })
    }
}
