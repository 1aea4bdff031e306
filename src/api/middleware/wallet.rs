use anyhow::Context;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::state::AppState;
use crate::error::AppError;
use crate::services::{issuer_admin, validation::is_valid_address};

/// Header carrying the wallet the client is connected with
pub const WALLET_HEADER: &str = "x-wallet-address";
/// Nonce from `POST /api/auth/nonce`
pub const NONCE_HEADER: &str = "x-wallet-nonce";
/// `personal_sign` signature over the nonce's challenge message
pub const SIGNATURE_HEADER: &str = "x-wallet-signature";

/// A wallet the caller proved it controls by signing a fresh nonce.
#[derive(Debug, Clone)]
pub struct ConnectedWallet(pub String);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for ConnectedWallet {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let wallet = header(parts, WALLET_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Connect a wallet to continue".to_string()))?;

        if !is_valid_address(wallet) {
            return Err(AppError::Validation(
                "X-Wallet-Address is not a valid wallet address".to_string(),
            ));
        }

        let (nonce, signature) = match (header(parts, NONCE_HEADER), header(parts, SIGNATURE_HEADER)) {
            (Some(nonce), Some(signature)) => (nonce, signature),
            _ => {
                return Err(AppError::Unauthorized(
                    "Sign a wallet challenge to continue".to_string(),
                ))
            }
        };

        let wallet = state.wallet_auth.authenticate(wallet, nonce, signature).await?;

        Ok(ConnectedWallet(wallet))
    }
}

/// A connected wallet that owns the token contract
#[derive(Debug, Clone)]
pub struct AdminWallet(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AdminWallet {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ConnectedWallet(wallet) = ConnectedWallet::from_request_parts(parts, state).await?;

        let is_admin = issuer_admin::is_admin(state.ledger.as_ref(), &wallet)
            .await
            .context("Could not read contract owner")?;
        if !is_admin {
            tracing::warn!(wallet = %wallet, "Admin route called by non-owner wallet");
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(AdminWallet(wallet))
    }
}
