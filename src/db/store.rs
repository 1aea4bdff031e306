//! Store seam used by the issuance, revocation, verification and
//! reconciliation flows. [`PgStore`] delegates to the model queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    credential::{CreateCredentialData, Credential},
    institution::Institution,
    issuance_intent::{CreateIntentData, IntentStatus, IssuanceIntent},
    student::Student,
    verification_log::VerificationLog,
    wallet_nonce::WalletNonce,
};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_institution(&self, id: Uuid) -> Result<Option<Institution>, sqlx::Error>;

    /// `None` when the institution is missing or bound to a different wallet.
    async fn bind_institution_wallet(
        &self,
        id: Uuid,
        wallet: &str,
    ) -> Result<Option<Institution>, sqlx::Error>;

    async fn find_student_by_wallet(&self, wallet: &str) -> Result<Option<Student>, sqlx::Error>;

    async fn insert_credential(&self, data: CreateCredentialData) -> Result<Credential, sqlx::Error>;

    async fn find_credential(&self, id: Uuid) -> Result<Option<Credential>, sqlx::Error>;

    async fn find_credential_by_token_id(
        &self,
        token_id: &str,
    ) -> Result<Option<Credential>, sqlx::Error>;

    async fn list_credentials_by_institution(
        &self,
        institution_id: Uuid,
    ) -> Result<Vec<Credential>, sqlx::Error>;

    async fn list_credentials_by_student(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<Credential>, sqlx::Error>;

    async fn list_credentials_by_wallet(&self, wallet: &str)
        -> Result<Vec<Credential>, sqlx::Error>;

    async fn mark_revocation_requested(&self, id: Uuid) -> Result<(), sqlx::Error>;

    async fn clear_revocation_requested(&self, id: Uuid) -> Result<(), sqlx::Error>;

    /// Returns `None` when the row is missing or already revoked.
    async fn mark_revoked(
        &self,
        id: Uuid,
        revoked_at: DateTime<Utc>,
    ) -> Result<Option<Credential>, sqlx::Error>;

    async fn list_pending_revocations(&self, limit: i64) -> Result<Vec<Credential>, sqlx::Error>;

    async fn create_intent(&self, data: CreateIntentData) -> Result<IssuanceIntent, sqlx::Error>;

    async fn mark_intent_minted(
        &self,
        id: Uuid,
        token_id: &str,
        transaction_hash: &str,
    ) -> Result<(), sqlx::Error>;

    async fn mark_intent_confirmed(&self, id: Uuid, credential_id: Uuid) -> Result<(), sqlx::Error>;

    async fn mark_intent_needs_review(
        &self,
        id: Uuid,
        error: &str,
        transaction_hash: Option<&str>,
    ) -> Result<(), sqlx::Error>;

    async fn mark_intent_failed(
        &self,
        id: Uuid,
        error: &str,
        transaction_hash: Option<&str>,
    ) -> Result<(), sqlx::Error>;

    async fn record_intent_error(&self, id: Uuid, error: &str) -> Result<(), sqlx::Error>;

    async fn list_stale_intents(
        &self,
        status: IntentStatus,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<IssuanceIntent>, sqlx::Error>;

    async fn append_verification_log(
        &self,
        credential_id: Uuid,
        verification_result: JsonValue,
    ) -> Result<(), sqlx::Error>;

    async fn create_wallet_nonce(
        &self,
        wallet: &str,
        nonce: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>;

    /// Deletes the nonce if it was issued to `wallet` and is unexpired at `now`.
    /// Returns whether a nonce was consumed.
    async fn consume_wallet_nonce(
        &self,
        wallet: &str,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error>;

    async fn purge_expired_wallet_nonces(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error>;
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_institution(&self, id: Uuid) -> Result<Option<Institution>, sqlx::Error> {
        Institution::find_by_id(&self.pool, id).await
    }

    async fn bind_institution_wallet(
        &self,
        id: Uuid,
        wallet: &str,
    ) -> Result<Option<Institution>, sqlx::Error> {
        Institution::bind_wallet(&self.pool, id, wallet).await
    }

    async fn find_student_by_wallet(&self, wallet: &str) -> Result<Option<Student>, sqlx::Error> {
        Student::find_by_wallet(&self.pool, wallet).await
    }

    async fn insert_credential(&self, data: CreateCredentialData) -> Result<Credential, sqlx::Error> {
        Credential::create(&self.pool, data).await
    }

    async fn find_credential(&self, id: Uuid) -> Result<Option<Credential>, sqlx::Error> {
        Credential::find_by_id(&self.pool, id).await
    }

    async fn find_credential_by_token_id(
        &self,
        token_id: &str,
    ) -> Result<Option<Credential>, sqlx::Error> {
        Credential::find_by_token_id(&self.pool, token_id).await
    }

    async fn list_credentials_by_institution(
        &self,
        institution_id: Uuid,
    ) -> Result<Vec<Credential>, sqlx::Error> {
        Credential::list_by_institution(&self.pool, institution_id).await
    }

    async fn list_credentials_by_student(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<Credential>, sqlx::Error> {
        Credential::list_by_student(&self.pool, student_id).await
    }

    async fn list_credentials_by_wallet(
        &self,
        wallet: &str,
    ) -> Result<Vec<Credential>, sqlx::Error> {
        Credential::list_by_student_wallet(&self.pool, wallet).await
    }

    async fn mark_revocation_requested(&self, id: Uuid) -> Result<(), sqlx::Error> {
        Credential::mark_revocation_requested(&self.pool, id).await
    }

    async fn clear_revocation_requested(&self, id: Uuid) -> Result<(), sqlx::Error> {
        Credential::clear_revocation_requested(&self.pool, id).await
    }

    async fn mark_revoked(
        &self,
        id: Uuid,
        revoked_at: DateTime<Utc>,
    ) -> Result<Option<Credential>, sqlx::Error> {
        Credential::mark_revoked(&self.pool, id, revoked_at).await
    }

    async fn list_pending_revocations(&self, limit: i64) -> Result<Vec<Credential>, sqlx::Error> {
        Credential::list_pending_revocations(&self.pool, limit).await
    }

    async fn create_intent(&self, data: CreateIntentData) -> Result<IssuanceIntent, sqlx::Error> {
        IssuanceIntent::create(&self.pool, data).await
    }

    async fn mark_intent_minted(
        &self,
        id: Uuid,
        token_id: &str,
        transaction_hash: &str,
    ) -> Result<(), sqlx::Error> {
        IssuanceIntent::mark_minted(&self.pool, id, token_id, transaction_hash).await
    }

    async fn mark_intent_confirmed(&self, id: Uuid, credential_id: Uuid) -> Result<(), sqlx::Error> {
        IssuanceIntent::mark_confirmed(&self.pool, id, credential_id).await
    }

    async fn mark_intent_needs_review(
        &self,
        id: Uuid,
        error: &str,
        transaction_hash: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        IssuanceIntent::mark_needs_review(&self.pool, id, error, transaction_hash).await
    }

    async fn mark_intent_failed(
        &self,
        id: Uuid,
        error: &str,
        transaction_hash: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        IssuanceIntent::mark_failed(&self.pool, id, error, transaction_hash).await
    }

    async fn record_intent_error(&self, id: Uuid, error: &str) -> Result<(), sqlx::Error> {
        IssuanceIntent::record_error(&self.pool, id, error).await
    }

    async fn list_stale_intents(
        &self,
        status: IntentStatus,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<IssuanceIntent>, sqlx::Error> {
        IssuanceIntent::list_stale(&self.pool, status, older_than, limit).await
    }

    async fn append_verification_log(
        &self,
        credential_id: Uuid,
        verification_result: JsonValue,
    ) -> Result<(), sqlx::Error> {
        VerificationLog::create(&self.pool, credential_id, verification_result).await?;
        Ok(())
    }

    async fn create_wallet_nonce(
        &self,
        wallet: &str,
        nonce: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        WalletNonce::create(&self.pool, wallet, nonce, expires_at).await?;
        Ok(())
    }

    async fn consume_wallet_nonce(
        &self,
        wallet: &str,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        WalletNonce::consume(&self.pool, wallet, nonce, now).await
    }

    async fn purge_expired_wallet_nonces(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        WalletNonce::delete_expired(&self.pool, now).await
    }
}
