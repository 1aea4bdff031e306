use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{state::AppState, wallet::AdminWallet};
use crate::error::{AppError, Result};
use crate::models::{
    credential::Credential,
    institution::Institution,
    issuance_intent::{IntentStatus, IssuanceIntent},
    student::Student,
    verification_log::VerificationLog,
};
use crate::services::{
    issuer_admin::{self, AuthorizationOutcome},
    validation::is_valid_address,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub institutions: i64,
    pub verified_institutions: i64,
    pub students: i64,
    pub credentials: i64,
    pub revoked_credentials: i64,
    pub verifications: i64,
    pub intents_needing_review: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeIssuerRequest {
    pub wallet_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeIssuerResponse {
    pub wallet_address: String,
    pub already_authorized: bool,
    pub transaction_hash: Option<String>,
    pub institutions: Vec<Institution>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/authorize-issuer", post(authorize_issuer))
}

async fn stats(
    State(state): State<AppState>,
    AdminWallet(_admin): AdminWallet,
) -> Result<Json<StatsResponse>> {
    let pool = &state.pool;

    Ok(Json(StatsResponse {
        institutions: Institution::count(pool).await?,
        verified_institutions: Institution::count_verified(pool).await?,
        students: Student::count(pool).await?,
        credentials: Credential::count(pool).await?,
        revoked_credentials: Credential::count_revoked(pool).await?,
        verifications: VerificationLog::count(pool).await?,
        intents_needing_review: IssuanceIntent::count_by_status(pool, IntentStatus::NeedsReview)
            .await?,
    }))
}

/// Grants the issuer role on chain if needed, then marks the institutions
/// using that wallet as verified.
#[tracing::instrument(skip(state, request), fields(admin = %admin))]
async fn authorize_issuer(
    State(state): State<AppState>,
    AdminWallet(admin): AdminWallet,
    Json(request): Json<AuthorizeIssuerRequest>,
) -> Result<Json<AuthorizeIssuerResponse>> {
    let wallet = request.wallet_address.trim().to_string();
    if !is_valid_address(&wallet) {
        return Err(AppError::Validation("Invalid wallet address".to_string()));
    }

    let outcome =
        issuer_admin::ensure_issuer_authorized(state.ledger.as_ref(), &admin, &wallet).await?;

    let institutions = Institution::mark_verified_by_wallet(&state.pool, &wallet).await?;

    tracing::info!(
        issuer = %wallet,
        institutions = institutions.len(),
        "Issuer authorization synced"
    );

    let (already_authorized, transaction_hash) = match outcome {
        AuthorizationOutcome::AlreadyAuthorized => (true, None),
        AuthorizationOutcome::Authorized { transaction_hash } => (false, Some(transaction_hash)),
    };

    Ok(Json(AuthorizeIssuerResponse {
        wallet_address: wallet,
        already_authorized,
        transaction_hash,
        institutions,
    }))
}
