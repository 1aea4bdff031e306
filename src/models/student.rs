use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub wallet_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateStudentData {
    pub email: String,
    pub name: String,
    pub wallet_address: Option<String>,
}

impl Student {
    pub async fn create(pool: &PgPool, data: CreateStudentData) -> Result<Self, sqlx::Error> {
        let student = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO students (email, name, wallet_address)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&data.email)
        .bind(&data.name)
        .bind(&data.wallet_address)
        .fetch_one(pool)
        .await?;

        Ok(student)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let student = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM students WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(student)
    }

    /// Finds a student by wallet (case-insensitive)
    pub async fn find_by_wallet(
        pool: &PgPool,
        wallet_address: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let student = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM students
            WHERE LOWER(wallet_address) = LOWER($1)
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(wallet_address)
        .fetch_optional(pool)
        .await?;

        Ok(student)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students")
            .fetch_one(pool)
            .await
    }
}
