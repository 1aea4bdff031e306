use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Institution {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub wallet_address: Option<String>,
    pub verified: bool, // flipped by the admin authorization sync
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateInstitutionData {
    pub email: String,
    pub name: String,
    pub wallet_address: Option<String>,
}

impl Institution {
    /// Registers a new institution
    pub async fn create(pool: &PgPool, data: CreateInstitutionData) -> Result<Self, sqlx::Error> {
        let institution = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO institutions (email, name, wallet_address)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&data.email)
        .bind(&data.name)
        .bind(&data.wallet_address)
        .fetch_one(pool)
        .await?;

        Ok(institution)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let institution = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM institutions WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(institution)
    }

    /// Finds an institution by connected wallet (case-insensitive)
    pub async fn find_by_wallet(
        pool: &PgPool,
        wallet_address: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let institution = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM institutions
            WHERE LOWER(wallet_address) = LOWER($1)
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(wallet_address)
        .fetch_optional(pool)
        .await?;

        Ok(institution)
    }

    /// Binds a wallet to the institution. A wallet that is already bound is
    /// never replaced: `None` means the row is missing or holds another
    /// wallet. Binding a new wallet clears `verified`.
    pub async fn bind_wallet(
        pool: &PgPool,
        id: Uuid,
        wallet_address: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let institution = sqlx::query_as::<_, Self>(
            r#"
            UPDATE institutions
            SET wallet_address = $2,
                verified = verified AND COALESCE(LOWER(wallet_address) = LOWER($2), FALSE)
            WHERE id = $1
              AND (wallet_address IS NULL OR LOWER(wallet_address) = LOWER($2))
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(wallet_address)
        .fetch_optional(pool)
        .await?;

        Ok(institution)
    }

    /// Marks every institution using `wallet_address` as verified.
    /// Returns the updated rows.
    pub async fn mark_verified_by_wallet(
        pool: &PgPool,
        wallet_address: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let institutions = sqlx::query_as::<_, Self>(
            r#"
            UPDATE institutions
            SET verified = TRUE
            WHERE LOWER(wallet_address) = LOWER($1)
            RETURNING *
            "#,
        )
        .bind(wallet_address)
        .fetch_all(pool)
        .await?;

        Ok(institutions)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM institutions")
            .fetch_one(pool)
            .await
    }

    pub async fn count_verified(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM institutions WHERE verified = TRUE")
            .fetch_one(pool)
            .await
    }
}
