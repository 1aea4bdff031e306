//! Proof that a caller controls the wallet it names.
//!
//! The client asks for a nonce, signs [`challenge_message`] with
//! `personal_sign` (EIP-191) and sends wallet, nonce and signature with the
//! request. A nonce is spent by the first request that presents it.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::Serialize;
use uuid::Uuid;

use crate::db::CredentialStore;
use crate::services::abi::{decode_hex, keccak256};
use crate::services::validation::{is_valid_address, same_wallet};

const NONCE_TTL_MINUTES: i64 = 5;

#[derive(thiserror::Error, Debug)]
pub enum WalletAuthError {
    #[error("Invalid wallet address")]
    InvalidAddress,

    #[error("Unknown, used or expired nonce")]
    UnknownNonce,

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Signature was not made by {0}")]
    SignerMismatch(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletChallenge {
    pub wallet_address: String,
    pub nonce: String,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct WalletAuthenticator {
    store: Arc<dyn CredentialStore>,
}

impl WalletAuthenticator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub async fn issue_challenge(&self, wallet: &str) -> Result<WalletChallenge, WalletAuthError> {
        let wallet = wallet.trim();
        if !is_valid_address(wallet) {
            return Err(WalletAuthError::InvalidAddress);
        }

        let nonce = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + Duration::minutes(NONCE_TTL_MINUTES);
        self.store
            .create_wallet_nonce(&wallet.to_lowercase(), &nonce, expires_at)
            .await?;

        Ok(WalletChallenge {
            wallet_address: wallet.to_string(),
            message: challenge_message(&nonce),
            nonce,
            expires_at,
        })
    }

    /// Spends the nonce, then checks the signature over its challenge.
    /// Returns the wallet as the caller sent it.
    pub async fn authenticate(
        &self,
        wallet: &str,
        nonce: &str,
        signature: &str,
    ) -> Result<String, WalletAuthError> {
        let wallet = wallet.trim();
        if !is_valid_address(wallet) {
            return Err(WalletAuthError::InvalidAddress);
        }

        if !self
            .store
            .consume_wallet_nonce(wallet, nonce.trim(), Utc::now())
            .await?
        {
            return Err(WalletAuthError::UnknownNonce);
        }

        let signer = recover_signer(&challenge_message(nonce.trim()), signature)?;
        if !same_wallet(&signer, wallet) {
            tracing::warn!(wallet = %wallet, signer = %signer, "Wallet signature from another key");
            return Err(WalletAuthError::SignerMismatch(wallet.to_string()));
        }

        Ok(wallet.to_string())
    }
}

pub fn challenge_message(nonce: &str) -> String {
    format!("Sign in to credmint\n\nNonce: {nonce}")
}

/// Digest that `personal_sign` signs.
pub fn eip191_hash(message: &str) -> [u8; 32] {
    let mut data = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    data.extend_from_slice(message.as_bytes());
    keccak256(&data)
}

pub fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Recovers the lowercase address behind a 65-byte `r || s || v` signature.
pub fn recover_signer(message: &str, signature_hex: &str) -> Result<String, WalletAuthError> {
    let malformed = |e: &dyn std::fmt::Display| WalletAuthError::MalformedSignature(e.to_string());

    let bytes = decode_hex(signature_hex.trim()).map_err(|e| malformed(&e))?;
    if bytes.len() != 65 {
        return Err(WalletAuthError::MalformedSignature(format!(
            "expected 65 bytes, got {}",
            bytes.len()
        )));
    }

    let v = match bytes[64] {
        27 | 28 => bytes[64] - 27,
        v @ (0 | 1) => v,
        other => {
            return Err(WalletAuthError::MalformedSignature(format!(
                "invalid recovery byte {other}"
            )))
        }
    };

    let mut signature = Signature::from_slice(&bytes[..64]).map_err(|e| malformed(&e))?;
    let mut recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| WalletAuthError::MalformedSignature("invalid recovery id".to_string()))?;

    // Wallets may hand out high-s signatures; flip parity with s
    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let key = VerifyingKey::recover_from_prehash(&eip191_hash(message), &signature, recovery_id)
        .map_err(|e| malformed(&e))?;

    Ok(address_of(&key))
}
