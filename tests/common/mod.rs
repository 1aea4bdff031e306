//! In-memory store, ledger and storage used by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, NaiveDate, Utc};
use k256::ecdsa::SigningKey;
use secrecy::Secret;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use credmint::api::{self, middleware::state::AppState};
use credmint::config::Config;
use credmint::db::CredentialStore;
use credmint::models::{
    credential::{CreateCredentialData, Credential},
    institution::Institution,
    issuance_intent::{CreateIntentData, IntentStatus, IssuanceIntent},
    student::Student,
    verification_log::VerificationLog,
};
use credmint::services::contracts::{
    ChainError, CredentialLedger, EvmConfig, EvmContracts, MintReceipt,
};
use credmint::services::credential_service::{
    CredentialDocument, CredentialService, IssueCredentialRequest,
};
use credmint::services::ipfs::{ContentStorage, StorageError};
use credmint::services::metadata::SubjectMark;
use credmint::services::verifier::Verifier;
use credmint::services::wallet_auth::{address_of, eip191_hash, WalletAuthenticator};

pub const OWNER: &str = "0x00000000000000000000000000000000000000aa";
pub const ISSUER: &str = "0xabcdef1111111111111111111111111111111111";
pub const OTHER: &str = "0x2222222222222222222222222222222222222222";
pub const STUDENT: &str = "0xAbC0000000000000000000000000000000000123";

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    institutions: Vec<Institution>,
    students: Vec<Student>,
    credentials: Vec<Credential>,
    intents: Vec<IssuanceIntent>,
    logs: Vec<VerificationLog>,
    nonces: Vec<(String, String, DateTime<Utc>)>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    pub fail_inserts: AtomicBool,
    pub fail_mark_revoked: AtomicBool,
}

fn db_down() -> sqlx::Error {
    sqlx::Error::PoolTimedOut
}

impl MemoryStore {
    /// Institutions with a wallet start out verified.
    pub fn add_institution(&self, name: &str, wallet: Option<&str>) -> Institution {
        let institution = Institution {
            id: Uuid::new_v4(),
            email: "registrar@example.edu".to_string(),
            name: name.to_string(),
            wallet_address: wallet.map(str::to_string),
            verified: wallet.is_some(),
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().institutions.push(institution.clone());
        institution
    }

    pub fn set_verified(&self, id: Uuid, verified: bool) {
        let mut state = self.state.lock().unwrap();
        if let Some(i) = state.institutions.iter_mut().find(|i| i.id == id) {
            i.verified = verified;
        }
    }

    pub fn institution(&self, id: Uuid) -> Option<Institution> {
        let state = self.state.lock().unwrap();
        state.institutions.iter().find(|i| i.id == id).cloned()
    }

    pub fn set_revocation_requested_at(&self, id: Uuid, at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        if let Some(c) = state.credentials.iter_mut().find(|c| c.id == id) {
            c.revocation_requested_at = Some(at);
        }
    }

    pub fn nonce_count(&self) -> usize {
        self.state.lock().unwrap().nonces.len()
    }

    pub fn add_student(&self, name: &str, wallet: &str) -> Student {
        let student = Student {
            id: Uuid::new_v4(),
            email: "student@example.edu".to_string(),
            name: name.to_string(),
            wallet_address: Some(wallet.to_string()),
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().students.push(student.clone());
        student
    }

    pub fn credentials(&self) -> Vec<Credential> {
        self.state.lock().unwrap().credentials.clone()
    }

    pub fn intents(&self) -> Vec<IssuanceIntent> {
        self.state.lock().unwrap().intents.clone()
    }

    pub fn logs(&self) -> Vec<VerificationLog> {
        self.state.lock().unwrap().logs.clone()
    }

    fn update_intent(&self, id: Uuid, f: impl FnOnce(&mut IssuanceIntent)) {
        let mut state = self.state.lock().unwrap();
        if let Some(intent) = state.intents.iter_mut().find(|i| i.id == id) {
            f(intent);
            intent.updated_at = Utc::now();
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_institution(&self, id: Uuid) -> Result<Option<Institution>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state.institutions.iter().find(|i| i.id == id).cloned())
    }

    async fn bind_institution_wallet(
        &self,
        id: Uuid,
        wallet: &str,
    ) -> Result<Option<Institution>, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let Some(institution) = state.institutions.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        match &institution.wallet_address {
            Some(bound) if bound.eq_ignore_ascii_case(wallet) => {}
            Some(_) => return Ok(None),
            None => {
                institution.wallet_address = Some(wallet.to_string());
                institution.verified = false;
            }
        }
        Ok(Some(institution.clone()))
    }

    async fn find_student_by_wallet(&self, wallet: &str) -> Result<Option<Student>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state
            .students
            .iter()
            .find(|s| {
                s.wallet_address
                    .as_deref()
                    .is_some_and(|w| w.eq_ignore_ascii_case(wallet))
            })
            .cloned())
    }

    async fn insert_credential(&self, data: CreateCredentialData) -> Result<Credential, sqlx::Error> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(db_down());
        }
        let mut state = self.state.lock().unwrap();
        if state.credentials.iter().any(|c| c.token_id == data.token_id) {
            return Err(sqlx::Error::Protocol("duplicate token_id".to_string()));
        }
        let credential = Credential {
            id: Uuid::new_v4(),
            student_id: data.student_id,
            institution_id: data.institution_id,
            token_id: data.token_id,
            ipfs_hash: data.ipfs_hash,
            blockchain_hash: data.blockchain_hash,
            metadata: data.metadata,
            issued_at: Utc::now(),
            revoked: false,
            revoked_at: None,
            revocation_requested_at: None,
            student_wallet_address: data.student_wallet_address,
            issuer_wallet_address: data.issuer_wallet_address,
        };
        state.credentials.push(credential.clone());
        Ok(credential)
    }

    async fn find_credential(&self, id: Uuid) -> Result<Option<Credential>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state.credentials.iter().find(|c| c.id == id).cloned())
    }

    async fn find_credential_by_token_id(
        &self,
        token_id: &str,
    ) -> Result<Option<Credential>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state.credentials.iter().find(|c| c.token_id == token_id).cloned())
    }

    async fn list_credentials_by_institution(
        &self,
        institution_id: Uuid,
    ) -> Result<Vec<Credential>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state
            .credentials
            .iter()
            .rev()
            .filter(|c| c.institution_id == institution_id)
            .cloned()
            .collect())
    }

    async fn list_credentials_by_student(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<Credential>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state
            .credentials
            .iter()
            .rev()
            .filter(|c| c.student_id == Some(student_id))
            .cloned()
            .collect())
    }

    async fn list_credentials_by_wallet(
        &self,
        wallet: &str,
    ) -> Result<Vec<Credential>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state
            .credentials
            .iter()
            .rev()
            .filter(|c| c.student_wallet_address.eq_ignore_ascii_case(wallet))
            .cloned()
            .collect())
    }

    async fn mark_revocation_requested(&self, id: Uuid) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        if let Some(c) = state.credentials.iter_mut().find(|c| c.id == id && !c.revoked) {
            c.revocation_requested_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn clear_revocation_requested(&self, id: Uuid) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        if let Some(c) = state.credentials.iter_mut().find(|c| c.id == id && !c.revoked) {
            c.revocation_requested_at = None;
        }
        Ok(())
    }

    async fn mark_revoked(
        &self,
        id: Uuid,
        revoked_at: DateTime<Utc>,
    ) -> Result<Option<Credential>, sqlx::Error> {
        if self.fail_mark_revoked.load(Ordering::SeqCst) {
            return Err(db_down());
        }
        let mut state = self.state.lock().unwrap();
        match state.credentials.iter_mut().find(|c| c.id == id && !c.revoked) {
            Some(c) => {
                c.revoked = true;
                c.revoked_at = Some(revoked_at);
                Ok(Some(c.clone()))
            }
            None => Ok(None),
        }
    }

    async fn list_pending_revocations(&self, limit: i64) -> Result<Vec<Credential>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state
            .credentials
            .iter()
            .filter(|c| c.revocation_requested_at.is_some() && !c.revoked)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn create_intent(&self, data: CreateIntentData) -> Result<IssuanceIntent, sqlx::Error> {
        let now = Utc::now();
        let intent = IssuanceIntent {
            id: Uuid::new_v4(),
            institution_id: data.institution_id,
            student_wallet_address: data.student_wallet_address,
            issuer_wallet_address: data.issuer_wallet_address,
            metadata: data.metadata,
            metadata_uri: data.metadata_uri,
            credential_hash: data.credential_hash,
            status: IntentStatus::Pending.as_str().to_string(),
            token_id: None,
            transaction_hash: None,
            credential_id: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().intents.push(intent.clone());
        Ok(intent)
    }

    async fn mark_intent_minted(
        &self,
        id: Uuid,
        token_id: &str,
        transaction_hash: &str,
    ) -> Result<(), sqlx::Error> {
        self.update_intent(id, |i| {
            i.status = IntentStatus::Minted.as_str().to_string();
            i.token_id = Some(token_id.to_string());
            i.transaction_hash = Some(transaction_hash.to_string());
        });
        Ok(())
    }

    async fn mark_intent_confirmed(&self, id: Uuid, credential_id: Uuid) -> Result<(), sqlx::Error> {
        self.update_intent(id, |i| {
            i.status = IntentStatus::Confirmed.as_str().to_string();
            i.credential_id = Some(credential_id);
            i.error = None;
        });
        Ok(())
    }

    async fn mark_intent_needs_review(
        &self,
        id: Uuid,
        error: &str,
        transaction_hash: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        self.update_intent(id, |i| {
            i.status = IntentStatus::NeedsReview.as_str().to_string();
            i.error = Some(error.to_string());
            if let Some(hash) = transaction_hash {
                i.transaction_hash = Some(hash.to_string());
            }
        });
        Ok(())
    }

    async fn mark_intent_failed(
        &self,
        id: Uuid,
        error: &str,
        transaction_hash: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        self.update_intent(id, |i| {
            i.status = IntentStatus::Failed.as_str().to_string();
            i.error = Some(error.to_string());
            if let Some(hash) = transaction_hash {
                i.transaction_hash = Some(hash.to_string());
            }
        });
        Ok(())
    }

    async fn record_intent_error(&self, id: Uuid, error: &str) -> Result<(), sqlx::Error> {
        self.update_intent(id, |i| i.error = Some(error.to_string()));
        Ok(())
    }

    async fn list_stale_intents(
        &self,
        status: IntentStatus,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<IssuanceIntent>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state
            .intents
            .iter()
            .filter(|i| i.status() == Some(status) && i.updated_at <= older_than)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn append_verification_log(
        &self,
        credential_id: Uuid,
        verification_result: JsonValue,
    ) -> Result<(), sqlx::Error> {
        self.state.lock().unwrap().logs.push(VerificationLog {
            id: Uuid::new_v4(),
            credential_id,
            verification_result,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn create_wallet_nonce(
        &self,
        wallet: &str,
        nonce: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        self.state
            .lock()
            .unwrap()
            .nonces
            .push((wallet.to_lowercase(), nonce.to_string(), expires_at));
        Ok(())
    }

    async fn consume_wallet_nonce(
        &self,
        wallet: &str,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let position = state.nonces.iter().position(|(w, n, expires_at)| {
            w.eq_ignore_ascii_case(wallet) && n == nonce && *expires_at > now
        });
        Ok(match position {
            Some(index) => {
                state.nonces.remove(index);
                true
            }
            None => false,
        })
    }

    async fn purge_expired_wallet_nonces(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let before = state.nonces.len();
        state.nonces.retain(|(_, _, expires_at)| *expires_at > now);
        Ok((before - state.nonces.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LedgerState {
    authorized: HashSet<String>,
    issuers: HashMap<String, String>,
    revoked: HashSet<String>,
    token_uris: HashMap<String, String>,
    calls: Vec<String>,
    mint_failure: Option<ChainError>,
    revoke_failure: Option<ChainError>,
}

pub struct FakeLedger {
    state: Mutex<LedgerState>,
    next_token: AtomicUsize,
    pub fail_register: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl FakeLedger {
    pub fn new(first_token: usize) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            next_token: AtomicUsize::new(first_token),
            fail_register: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn authorize(&self, wallet: &str) {
        self.state.lock().unwrap().authorized.insert(wallet.to_lowercase());
    }

    pub fn fail_next_mint(&self, error: ChainError) {
        self.state.lock().unwrap().mint_failure = Some(error);
    }

    pub fn fail_next_revoke(&self, error: ChainError) {
        self.state.lock().unwrap().revoke_failure = Some(error);
    }

    pub fn set_token_uri(&self, token_id: &str, uri: &str) {
        self.state
            .lock()
            .unwrap()
            .token_uris
            .insert(token_id.to_string(), uri.to_string());
    }

    /// Overrides the recorded issuer of a token.
    pub fn set_issuer(&self, token_id: &str, wallet: &str) {
        self.state
            .lock()
            .unwrap()
            .issuers
            .insert(token_id.to_string(), wallet.to_lowercase());
    }

    pub fn revoke(&self, token_id: &str) {
        self.state.lock().unwrap().revoked.insert(token_id.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls().iter().any(|c| c == name)
    }

    fn record(&self, name: &str) {
        self.state.lock().unwrap().calls.push(name.to_string());
    }

    fn read_guard(&self) -> Result<(), ChainError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(ChainError::HttpStatus(503))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CredentialLedger for FakeLedger {
    async fn issue_credential(
        &self,
        signer: &str,
        _student: &str,
        _credential_hash: [u8; 32],
        metadata_uri: &str,
    ) -> Result<MintReceipt, ChainError> {
        self.record("issueCredential");
        if let Some(error) = self.state.lock().unwrap().mint_failure.take() {
            return Err(error);
        }
        let token_id = self.next_token.fetch_add(1, Ordering::SeqCst).to_string();
        self.set_issuer(&token_id, signer);
        self.set_token_uri(&token_id, metadata_uri);
        Ok(MintReceipt {
            transaction_hash: format!("0xmint{token_id}"),
            token_id,
        })
    }

    async fn revoke_credential(&self, _signer: &str, token_id: &str) -> Result<String, ChainError> {
        self.record("revokeCredential");
        if let Some(error) = self.state.lock().unwrap().revoke_failure.take() {
            return Err(error);
        }
        self.revoke(token_id);
        Ok(format!("0xrevoke{token_id}"))
    }

    async fn register_credential(
        &self,
        _signer: &str,
        token_id: &str,
        _student: &str,
        _credential_hash: [u8; 32],
    ) -> Result<String, ChainError> {
        self.record("registerCredential");
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc("execution reverted".to_string()));
        }
        Ok(format!("0xregister{token_id}"))
    }

    async fn authorize_issuer(&self, _signer: &str, issuer: &str) -> Result<String, ChainError> {
        self.record("authorizeIssuer");
        self.authorize(issuer);
        Ok("0xauthorize".to_string())
    }

    async fn credential_issuer(&self, token_id: &str) -> Result<String, ChainError> {
        self.record("credentialIssuers");
        self.read_guard()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .issuers
            .get(token_id)
            .cloned()
            .unwrap_or_else(|| "0x0000000000000000000000000000000000000000".to_string()))
    }

    async fn is_authorized_issuer(&self, wallet: &str) -> Result<bool, ChainError> {
        self.record("authorizedIssuers");
        self.read_guard()?;
        Ok(self.state.lock().unwrap().authorized.contains(&wallet.to_lowercase()))
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool, ChainError> {
        self.record("revokedCredentials");
        self.read_guard()?;
        Ok(self.state.lock().unwrap().revoked.contains(token_id))
    }

    async fn token_uri(&self, token_id: &str) -> Result<String, ChainError> {
        self.record("tokenURI");
        self.read_guard()?;
        self.state
            .lock()
            .unwrap()
            .token_uris
            .get(token_id)
            .cloned()
            .ok_or_else(|| ChainError::Rpc("execution reverted: nonexistent token".to_string()))
    }

    async fn owner(&self) -> Result<String, ChainError> {
        self.record("owner");
        self.read_guard()?;
        Ok(OWNER.to_string())
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeStorage {
    uploads: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl FakeStorage {
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl ContentStorage for FakeStorage {
    async fn upload_file(
        &self,
        file_name: &str,
        _content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::FallbackNotConfigured {
                primary: "storage upload failed with status 500".to_string(),
            });
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(file_name.to_string());
        Ok(format!("bafyfile{}", uploads.len()))
    }

    async fn upload_json(&self, _value: &JsonValue) -> Result<String, StorageError> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push("metadata.json".to_string());
        Ok(format!("bafymeta{}", uploads.len()))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub ledger: Arc<FakeLedger>,
    pub storage: Arc<FakeStorage>,
    pub service: CredentialService,
    pub verifier: Verifier,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let ledger = Arc::new(FakeLedger::new(1));
        let storage = Arc::new(FakeStorage::default());
        ledger.authorize(ISSUER);

        let service = CredentialService::new(store.clone(), ledger.clone(), storage.clone());
        let verifier = Verifier::new(store.clone(), ledger.clone(), "ipfs.io");

        Self {
            store,
            ledger,
            storage,
            service,
            verifier,
        }
    }
}

impl Harness {
    /// Router state over the in-memory fakes. The pool never connects.
    pub fn app_state(&self) -> AppState {
        let config = test_config();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let evm = EvmContracts::new(EvmConfig::from_config(&config)).unwrap();

        AppState::from_parts(
            pool,
            config,
            evm,
            self.store.clone(),
            self.ledger.clone(),
            self.storage.clone(),
        )
    }

    pub fn app(&self) -> Router {
        api::router().with_state(self.app_state())
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://credmint@localhost/credmint_test".to_string(),
        base_url: "https://credmint.example".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        rpc_url: "http://127.0.0.1:1".to_string(),
        chain_id: 11_155_111,
        chain_name: "sepolia".to_string(),
        token_contract_address: "0x1111111111111111111111111111111111111111".to_string(),
        registry_contract_address: "0x3333333333333333333333333333333333333333".to_string(),
        receipt_timeout_secs: 1,
        storage_client_id: Secret::new("test-client".to_string()),
        storage_upload_url: "http://127.0.0.1:1/upload".to_string(),
        fallback_storage_url: "http://127.0.0.1:1".to_string(),
        fallback_storage_jwt: None,
        ipfs_gateway: "ipfs.io".to_string(),
        reconcile_cron: "0 */10 * * * *".to_string(),
    }
}

/// A wallet with a real key, for requests that need a signed challenge.
pub struct TestWallet {
    key: SigningKey,
    pub address: String,
}

impl TestWallet {
    pub fn new(seed: u8) -> Self {
        let key = SigningKey::from_slice(&[seed; 32]).unwrap();
        let address = address_of(key.verifying_key());
        Self { key, address }
    }

    /// `personal_sign` over `message`, hex encoded with v = 27/28.
    pub fn sign(&self, message: &str) -> String {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&eip191_hash(message))
            .unwrap();
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);
        format!("0x{}", hex::encode(bytes))
    }

    /// Fetches a fresh challenge and returns the `X-Wallet-*` headers.
    pub async fn auth_headers(&self, auth: &WalletAuthenticator) -> Vec<(&'static str, String)> {
        let challenge = auth.issue_challenge(&self.address).await.unwrap();
        vec![
            ("x-wallet-address", self.address.clone()),
            ("x-wallet-nonce", challenge.nonce),
            ("x-wallet-signature", self.sign(&challenge.message)),
        ]
    }
}

pub fn subject(name: &str, marks: f64) -> SubjectMark {
    SubjectMark {
        name: name.to_string(),
        marks,
        max_marks: 100.0,
    }
}

pub fn degree_request(institution_id: Uuid) -> IssueCredentialRequest {
    IssueCredentialRequest {
        institution_id,
        student_name: "Ada Lovelace".to_string(),
        student_wallet: STUDENT.to_string(),
        credential_type: "Degree".to_string(),
        title: "B.Sc. Computer Science".to_string(),
        description: None,
        field_of_study: Some("Computer Science".to_string()),
        grade: Some("First Class".to_string()),
        issue_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        subjects: vec![subject("Math", 85.0), subject("Physics", 78.0)],
    }
}

pub fn document() -> CredentialDocument {
    CredentialDocument {
        file_name: "degree.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.7 degree".to_vec(),
    }
}
