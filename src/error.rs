use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{
    contracts::ChainError, credential_service::CredentialError, ipfs::StorageError,
    verifier::VerificationError, wallet_auth::WalletAuthError,
};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Blockchain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Validation(msg) => AppError::Validation(msg),
            CredentialError::InstitutionNotFound => {
                AppError::NotFound("Institution not found".to_string())
            }
            CredentialError::NotFound => AppError::NotFound("Credential not found".to_string()),
            CredentialError::AlreadyRevoked => {
                AppError::Conflict("Credential is already revoked".to_string())
            }
            e @ (CredentialError::WalletMismatch
            | CredentialError::ChainIssuerMismatch { .. }
            | CredentialError::InstitutionWalletMismatch { .. }
            | CredentialError::InstitutionWalletMissing
            | CredentialError::InstitutionNotVerified
            | CredentialError::NotAuthorizedIssuer(_)) => AppError::Forbidden(e.to_string()),
            CredentialError::Storage(e) => AppError::Storage(e),
            CredentialError::Chain(e) => AppError::Chain(e),
            CredentialError::Database(e) => AppError::Database(e),
            CredentialError::Serialization(e) => AppError::Internal(e.into()),
        }
    }
}

impl From<VerificationError> for AppError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::Database(e) => AppError::Database(e),
            VerificationError::InvalidPayload(msg) => AppError::Validation(msg),
        }
    }
}

impl From<WalletAuthError> for AppError {
    fn from(err: WalletAuthError) -> Self {
        match err {
            WalletAuthError::InvalidAddress => {
                AppError::Validation("Invalid wallet address".to_string())
            }
            WalletAuthError::Database(e) => AppError::Database(e),
            e @ (WalletAuthError::UnknownNonce
            | WalletAuthError::MalformedSignature(_)
            | WalletAuthError::SignerMismatch(_)) => AppError::Unauthorized(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_debug = format!("{:?}", self);

        let (status, error_message) = match self {
            AppError::Storage(e) => {
                tracing::error!(error = %e, "Storage upload failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Failed to upload to IPFS. Please try again.".to_string(),
                )
            }
            AppError::Chain(e) => {
                tracing::error!(error = %e, "Blockchain call failed");
                let message = if e.may_have_landed() {
                    "Blockchain transaction may have been submitted but was not confirmed; it will be reconciled. Do not retry."
                        .to_string()
                } else if e.is_retryable() {
                    format!("Blockchain transaction did not complete: {e}. Please retry.")
                } else {
                    "Blockchain transaction failed".to_string()
                };
                (StatusCode::BAD_GATEWAY, message)
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_debug,
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
