use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::{state::AppState, wallet::ConnectedWallet};
use crate::error::{AppError, Result};
use crate::models::{
    credential::Credential,
    institution::{CreateInstitutionData, Institution},
};
use crate::services::validation::{is_valid_address, is_valid_email, require, same_wallet};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInstitutionRequest {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectWalletRequest {
    pub wallet_address: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/institutions", post(register_institution))
        .route("/api/institutions/me", get(get_connected_institution))
        .route("/api/institutions/:id", get(get_institution))
        .route("/api/institutions/:id/wallet", put(connect_wallet))
        .route("/api/institutions/:id/credentials", get(list_credentials))
}

/// Registers an institution profile. A wallet given at registration must be
/// proven with the `X-Wallet-*` headers.
async fn register_institution(
    State(state): State<AppState>,
    signer: Option<ConnectedWallet>,
    Json(request): Json<RegisterInstitutionRequest>,
) -> Result<(StatusCode, Json<Institution>)> {
    let name = require("Institution name", &request.name).map_err(AppError::Validation)?;
    if !is_valid_email(&request.email) {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }

    let wallet_address = request
        .wallet_address
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty());
    if let Some(wallet) = &wallet_address {
        if !is_valid_address(wallet) {
            return Err(AppError::Validation("Invalid wallet address".to_string()));
        }
        match &signer {
            Some(ConnectedWallet(signer)) if same_wallet(wallet, signer) => {}
            Some(_) => {
                return Err(AppError::Forbidden(
                    "Wallet must match the connected wallet".to_string(),
                ))
            }
            None => {
                return Err(AppError::Unauthorized(
                    "Sign a wallet challenge to register a wallet".to_string(),
                ))
            }
        }
    }

    let institution = Institution::create(
        &state.pool,
        CreateInstitutionData {
            email: request.email.trim().to_string(),
            name,
            wallet_address,
        },
    )
    .await?;

    tracing::info!(institution_id = %institution.id, "Institution registered");

    Ok((StatusCode::CREATED, Json(institution)))
}

async fn get_institution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Institution>> {
    let institution = Institution::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Institution not found".to_string()))?;

    Ok(Json(institution))
}

/// Institution profile linked to the connected wallet
async fn get_connected_institution(
    State(state): State<AppState>,
    ConnectedWallet(wallet): ConnectedWallet,
) -> Result<Json<Institution>> {
    let institution = Institution::find_by_wallet(&state.pool, &wallet)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("No institution is linked to this wallet".to_string())
        })?;

    Ok(Json(institution))
}

/// Binds the connected wallet to the institution. A bound wallet is never
/// replaced; binding clears `verified` until an admin authorizes the wallet.
async fn connect_wallet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ConnectedWallet(signer): ConnectedWallet,
    Json(request): Json<ConnectWalletRequest>,
) -> Result<Json<Institution>> {
    let wallet = request.wallet_address.trim();
    if !is_valid_address(wallet) {
        return Err(AppError::Validation("Invalid wallet address".to_string()));
    }
    if !same_wallet(wallet, &signer) {
        return Err(AppError::Forbidden(
            "Wallet must match the connected wallet".to_string(),
        ));
    }

    let existing = state
        .store
        .find_institution(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Institution not found".to_string()))?;
    let already_bound = || {
        AppError::Conflict("Institution is already bound to another wallet".to_string())
    };
    if let Some(bound) = &existing.wallet_address {
        if !same_wallet(bound, wallet) {
            tracing::warn!(institution_id = %id, wallet = %wallet, "Rejected wallet rebind");
            return Err(already_bound());
        }
    }

    let institution = state
        .store
        .bind_institution_wallet(id, wallet)
        .await?
        .ok_or_else(already_bound)?;

    tracing::info!(institution_id = %institution.id, wallet = %wallet, "Institution wallet connected");

    Ok(Json(institution))
}

async fn list_credentials(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Credential>>> {
    let credentials = state.credentials.get_institution_credentials(id).await?;
    Ok(Json(credentials))
}
