use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VerificationLog {
    pub id: Uuid,
    pub credential_id: Uuid,
    pub verification_result: JsonValue, // JSONB snapshot of the outcome
    pub created_at: DateTime<Utc>,
}

impl VerificationLog {
    /// Appends a verification attempt
    pub async fn create(
        pool: &PgPool,
        credential_id: Uuid,
        verification_result: JsonValue,
    ) -> Result<Self, sqlx::Error> {
        let log = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO verification_logs (credential_id, verification_result)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(credential_id)
        .bind(verification_result)
        .fetch_one(pool)
        .await?;

        Ok(log)
    }

    pub async fn list_by_credential(
        pool: &PgPool,
        credential_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let logs = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM verification_logs
            WHERE credential_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(credential_id)
        .fetch_all(pool)
        .await?;

        Ok(logs)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM verification_logs")
            .fetch_one(pool)
            .await
    }
}
