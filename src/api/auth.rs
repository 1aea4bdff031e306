use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::api::middleware::state::AppState;
use crate::error::Result;
use crate::services::wallet_auth::WalletChallenge;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceRequest {
    pub wallet_address: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/auth/nonce", post(issue_nonce))
}

/// Issues a single-use challenge; the client signs `message` with the wallet
/// and sends it back in the `X-Wallet-*` headers.
async fn issue_nonce(
    State(state): State<AppState>,
    Json(request): Json<NonceRequest>,
) -> Result<Json<WalletChallenge>> {
    let challenge = state
        .wallet_auth
        .issue_challenge(&request.wallet_address)
        .await?;

    tracing::debug!(wallet = %challenge.wallet_address, "Wallet challenge issued");

    Ok(Json(challenge))
}
