use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Credential {
    pub id: Uuid,
    pub student_id: Option<Uuid>, // resolved by wallet at issuance, may stay NULL
    pub institution_id: Uuid,
    pub token_id: String, // uint256 as decimal
    pub ipfs_hash: String, // metadata CID
    pub blockchain_hash: String, // mint transaction hash
    pub metadata: JsonValue, // JSONB mirror of the IPFS metadata
    pub issued_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revocation_requested_at: Option<DateTime<Utc>>,
    pub student_wallet_address: String,
    pub issuer_wallet_address: String,
}

#[derive(Debug, Clone)]
pub struct CreateCredentialData {
    pub student_id: Option<Uuid>,
    pub institution_id: Uuid,
    pub token_id: String,
    pub ipfs_hash: String,
    pub blockchain_hash: String,
    pub metadata: JsonValue,
    pub student_wallet_address: String,
    pub issuer_wallet_address: String,
}

impl Credential {
    pub async fn create(pool: &PgPool, data: CreateCredentialData) -> Result<Self, sqlx::Error> {
        let credential = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO credentials (
                student_id, institution_id, token_id, ipfs_hash, blockchain_hash,
                metadata, student_wallet_address, issuer_wallet_address
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(data.student_id)
        .bind(data.institution_id)
        .bind(&data.token_id)
        .bind(&data.ipfs_hash)
        .bind(&data.blockchain_hash)
        .bind(&data.metadata)
        .bind(&data.student_wallet_address)
        .bind(&data.issuer_wallet_address)
        .fetch_one(pool)
        .await?;

        Ok(credential)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let credential = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM credentials WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(credential)
    }

    pub async fn find_by_token_id(
        pool: &PgPool,
        token_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let credential = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM credentials WHERE token_id = $1
            "#,
        )
        .bind(token_id)
        .fetch_optional(pool)
        .await?;

        Ok(credential)
    }

    pub async fn list_by_institution(
        pool: &PgPool,
        institution_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let credentials = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM credentials
            WHERE institution_id = $1
            ORDER BY issued_at DESC
            "#,
        )
        .bind(institution_id)
        .fetch_all(pool)
        .await?;

        Ok(credentials)
    }

    pub async fn list_by_student(
        pool: &PgPool,
        student_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let credentials = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM credentials
            WHERE student_id = $1
            ORDER BY issued_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(pool)
        .await?;

        Ok(credentials)
    }

    /// Credentials issued to a wallet, including ones never linked to a student row
    pub async fn list_by_student_wallet(
        pool: &PgPool,
        wallet_address: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let credentials = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM credentials
            WHERE LOWER(student_wallet_address) = LOWER($1)
            ORDER BY issued_at DESC
            "#,
        )
        .bind(wallet_address)
        .fetch_all(pool)
        .await?;

        Ok(credentials)
    }

    /// Records that an on-chain revoke is about to be submitted
    pub async fn mark_revocation_requested(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE credentials
            SET revocation_requested_at = NOW()
            WHERE id = $1 AND revoked = FALSE
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Drops the revocation marker once the chain revoke is known not to have landed
    pub async fn clear_revocation_requested(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE credentials
            SET revocation_requested_at = NULL
            WHERE id = $1 AND revoked = FALSE
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Flips `revoked` to true. Never touches already revoked rows, so the
    /// flag cannot go back and `revoked_at` keeps its first value.
    pub async fn mark_revoked(
        pool: &PgPool,
        id: Uuid,
        revoked_at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let credential = sqlx::query_as::<_, Self>(
            r#"
            UPDATE credentials
            SET revoked = TRUE, revoked_at = $2
            WHERE id = $1 AND revoked = FALSE
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(revoked_at)
        .fetch_optional(pool)
        .await?;

        Ok(credential)
    }

    /// Rows whose chain revoke was requested but not mirrored yet
    pub async fn list_pending_revocations(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let credentials = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM credentials
            WHERE revocation_requested_at IS NOT NULL AND revoked = FALSE
            ORDER BY revocation_requested_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(credentials)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM credentials")
            .fetch_one(pool)
            .await
    }

    pub async fn count_revoked(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM credentials WHERE revoked = TRUE")
            .fetch_one(pool)
            .await
    }
}
