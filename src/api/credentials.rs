use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::middleware::{state::AppState, wallet::ConnectedWallet};
use crate::error::{AppError, Result};
use crate::models::{credential::Credential, verification_log::VerificationLog};
use crate::services::{
    credential_service::{CredentialDocument, IssueCredentialRequest},
    ipfs::gateway_url,
    metadata::CredentialMetadata,
};

const MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCredentialResponse {
    pub credential: Credential,
    pub metadata: CredentialMetadata,
    pub metadata_uri: String,
    pub metadata_url: String,
    pub verification_url: String,
    pub registry_transaction: Option<String>,
    pub average_percentage: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeCredentialResponse {
    pub credential: Credential,
    pub transaction_hash: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/credentials",
            post(issue_credential).layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES)),
        )
        .route("/api/credentials/:id", get(get_credential))
        .route("/api/credentials/:id/revoke", post(revoke_credential))
        .route("/api/credentials/:id/verifications", get(list_verifications))
        .route("/api/wallets/:address/credentials", get(list_wallet_credentials))
}

/// Issues a credential from a multipart form: a `document` file plus a
/// `data` part holding the credential fields as JSON.
async fn issue_credential(
    State(state): State<AppState>,
    ConnectedWallet(signer): ConnectedWallet,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<IssueCredentialResponse>)> {
    let mut document: Option<CredentialDocument> = None;
    let mut request: Option<IssueCredentialRequest> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("document") => {
                let file_name = field.file_name().unwrap_or("document").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read document: {e}")))?;
                document = Some(CredentialDocument {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("data") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read data: {e}")))?;
                request = Some(
                    serde_json::from_str(&text)
                        .map_err(|e| AppError::Validation(format!("Invalid credential data: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let document = document.ok_or_else(|| {
        AppError::Validation("Please select a credential document to upload".to_string())
    })?;
    let request =
        request.ok_or_else(|| AppError::Validation("Credential data is required".to_string()))?;

    let result = state
        .credentials
        .issue_credential(request, document, &signer)
        .await?;

    let verification_url = state.config.verification_url(&result.credential.token_id);
    let metadata_url = gateway_url(&state.config.ipfs_gateway, Some(&result.metadata_uri));

    Ok((
        StatusCode::CREATED,
        Json(IssueCredentialResponse {
            average_percentage: result.metadata.average_percentage(),
            credential: result.credential,
            metadata: result.metadata,
            metadata_uri: result.metadata_uri,
            metadata_url,
            verification_url,
            registry_transaction: result.registry_transaction,
        }),
    ))
}

async fn get_credential(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Credential>> {
    Ok(Json(state.credentials.get_credential_by_id(id).await?))
}

async fn revoke_credential(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ConnectedWallet(signer): ConnectedWallet,
) -> Result<Json<RevokeCredentialResponse>> {
    let result = state.credentials.revoke_credential_by_id(id, &signer).await?;

    Ok(Json(RevokeCredentialResponse {
        credential: result.credential,
        transaction_hash: result.transaction_hash,
    }))
}

async fn list_wallet_credentials(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Vec<Credential>>> {
    Ok(Json(state.credentials.get_wallet_credentials(&address).await?))
}

/// Verification history of a credential, newest first
async fn list_verifications(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<VerificationLog>>> {
    let credential = state.credentials.get_credential_by_id(id).await?;
    let logs = VerificationLog::list_by_credential(&state.pool, credential.id).await?;
    Ok(Json(logs))
}
