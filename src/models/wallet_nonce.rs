use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WalletNonce {
    pub nonce: String,
    pub wallet_address: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl WalletNonce {
    pub async fn create(
        pool: &PgPool,
        wallet_address: &str,
        nonce: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let row = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO wallet_nonces (nonce, wallet_address, expires_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(nonce)
        .bind(wallet_address)
        .bind(expires_at)
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    /// Deletes a live nonce issued to `wallet_address`; true when one matched
    pub async fn consume(
        pool: &PgPool,
        wallet_address: &str,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM wallet_nonces
            WHERE nonce = $1
              AND LOWER(wallet_address) = LOWER($2)
              AND expires_at > $3
            "#,
        )
        .bind(nonce)
        .bind(wallet_address)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_expired(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM wallet_nonces WHERE expires_at <= $1")
            .bind(now)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
