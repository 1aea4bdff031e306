use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::state::AppState;
use crate::error::{AppError, Result};
use crate::models::{
    credential::Credential,
    student::{CreateStudentData, Student},
};
use crate::services::validation::{is_valid_address, is_valid_email, require};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudentRequest {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/students", post(register_student))
        .route("/api/students/:id", get(get_student))
        .route("/api/students/:id/credentials", get(list_credentials))
}

async fn register_student(
    State(state): State<AppState>,
    Json(request): Json<RegisterStudentRequest>,
) -> Result<(StatusCode, Json<Student>)> {
    let name = require("Name", &request.name).map_err(AppError::Validation)?;
    if !is_valid_email(&request.email) {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }

    let wallet_address = request
        .wallet_address
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty());
    if wallet_address.as_deref().is_some_and(|w| !is_valid_address(w)) {
        return Err(AppError::Validation("Invalid wallet address".to_string()));
    }

    let student = Student::create(
        &state.pool,
        CreateStudentData {
            email: request.email.trim().to_string(),
            name,
            wallet_address,
        },
    )
    .await?;

    tracing::info!(student_id = %student.id, "Student registered");

    Ok((StatusCode::CREATED, Json(student)))
}

async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Student>> {
    Student::find_by_id(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))
}

async fn list_credentials(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Credential>>> {
    Ok(Json(state.credentials.get_student_credentials(id).await?))
}
