//! Admin-side role checks and issuer authorization against the token contract.

use crate::services::contracts::{ChainError, CredentialLedger};
use crate::services::validation::same_wallet;

/// Whether `wallet` is the token contract owner, read from chain.
pub async fn is_admin(ledger: &dyn CredentialLedger, wallet: &str) -> Result<bool, ChainError> {
    let owner = ledger.owner().await?;
    Ok(same_wallet(&owner, wallet))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    AlreadyAuthorized,
    Authorized { transaction_hash: String },
}

/// Grants the issuer role to `issuer` unless the contract already lists it.
#[tracing::instrument(skip(ledger))]
pub async fn ensure_issuer_authorized(
    ledger: &dyn CredentialLedger,
    admin: &str,
    issuer: &str,
) -> Result<AuthorizationOutcome, ChainError> {
    if ledger.is_authorized_issuer(issuer).await? {
        tracing::info!("Issuer already authorized on chain");
        return Ok(AuthorizationOutcome::AlreadyAuthorized);
    }

    let transaction_hash = ledger.authorize_issuer(admin, issuer).await?;
    tracing::info!(tx_hash = %transaction_hash, "Authorized issuer on chain");

    Ok(AuthorizationOutcome::Authorized { transaction_hash })
}
