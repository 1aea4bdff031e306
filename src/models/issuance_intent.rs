use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Lifecycle of an issuance: `pending` before the mint, `minted` once the
/// chain returned a token id, `confirmed` once the credential row exists.
/// `failed` means nothing reached the chain; `needs_review` means it may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Pending,
    Minted,
    Confirmed,
    Failed,
    NeedsReview,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Pending => "pending",
            IntentStatus::Minted => "minted",
            IntentStatus::Confirmed => "confirmed",
            IntentStatus::Failed => "failed",
            IntentStatus::NeedsReview => "needs_review",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(IntentStatus::Pending),
            "minted" => Some(IntentStatus::Minted),
            "confirmed" => Some(IntentStatus::Confirmed),
            "failed" => Some(IntentStatus::Failed),
            "needs_review" => Some(IntentStatus::NeedsReview),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IssuanceIntent {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub student_wallet_address: String,
    pub issuer_wallet_address: String,
    pub metadata: JsonValue,
    pub metadata_uri: String,
    pub credential_hash: String, // 0x-prefixed keccak-256
    pub status: String,          // see IntentStatus
    pub token_id: Option<String>,
    pub transaction_hash: Option<String>,
    pub credential_id: Option<Uuid>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateIntentData {
    pub institution_id: Uuid,
    pub student_wallet_address: String,
    pub issuer_wallet_address: String,
    pub metadata: JsonValue,
    pub metadata_uri: String,
    pub credential_hash: String,
}

impl IssuanceIntent {
    pub fn status(&self) -> Option<IntentStatus> {
        IntentStatus::parse(&self.status)
    }

    pub async fn create(pool: &PgPool, data: CreateIntentData) -> Result<Self, sqlx::Error> {
        let intent = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO issuance_intents (
                institution_id, student_wallet_address, issuer_wallet_address,
                metadata, metadata_uri, credential_hash, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'pending')
            RETURNING *
            "#,
        )
        .bind(data.institution_id)
        .bind(&data.student_wallet_address)
        .bind(&data.issuer_wallet_address)
        .bind(&data.metadata)
        .bind(&data.metadata_uri)
        .bind(&data.credential_hash)
        .fetch_one(pool)
        .await?;

        Ok(intent)
    }

    pub async fn mark_minted(
        pool: &PgPool,
        id: Uuid,
        token_id: &str,
        transaction_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE issuance_intents
            SET status = 'minted', token_id = $2, transaction_hash = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_id)
        .bind(transaction_hash)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn mark_confirmed(
        pool: &PgPool,
        id: Uuid,
        credential_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE issuance_intents
            SET status = 'confirmed', credential_id = $2, error = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(credential_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Flags an intent for manual follow-up, keeping the last error and the
    /// submitted transaction hash when one is known
    pub async fn mark_needs_review(
        pool: &PgPool,
        id: Uuid,
        error: &str,
        transaction_hash: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE issuance_intents
            SET status = 'needs_review',
                error = $2,
                transaction_hash = COALESCE($3, transaction_hash),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(transaction_hash)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Closes an intent whose mint never reached the chain
    pub async fn mark_failed(
        pool: &PgPool,
        id: Uuid,
        error: &str,
        transaction_hash: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE issuance_intents
            SET status = 'failed',
                error = $2,
                transaction_hash = COALESCE($3, transaction_hash),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(transaction_hash)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Records the latest failure without changing status
    pub async fn record_error(pool: &PgPool, id: Uuid, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE issuance_intents
            SET error = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Intents in `status` last touched before `older_than`
    pub async fn list_stale(
        pool: &PgPool,
        status: IntentStatus,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let intents = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM issuance_intents
            WHERE status = $1 AND updated_at < $2
            ORDER BY updated_at ASC
            LIMIT $3
            "#,
        )
        .bind(status.as_str())
        .bind(older_than)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(intents)
    }

    pub async fn count_by_status(pool: &PgPool, status: IntentStatus) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM issuance_intents WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(pool)
            .await
    }
}
