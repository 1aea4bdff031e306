use std::sync::Arc;

use chrono::{DateTime, Utc};
use primitive_types::U256;
use serde::Serialize;
use serde_json::json;

use crate::db::CredentialStore;
use crate::models::credential::Credential;
use crate::services::contracts::CredentialLedger;
use crate::services::ipfs::gateway_url;
use crate::services::metadata::CredentialMetadata;

#[derive(thiserror::Error, Debug)]
pub enum VerificationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid QR payload: {0}")]
    InvalidPayload(String),
}

/// Display-ready view of a credential's metadata
#[derive(Debug, Clone, Serialize)]
pub struct CredentialDetails {
    pub metadata: Option<CredentialMetadata>,
    pub average_percentage: Option<f64>,
    pub document_url: String,
    pub metadata_url: String,
    /// Whether the token's on-chain `tokenURI` points at the stored metadata;
    /// `None` when the chain could not be read.
    pub metadata_matches_chain: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Valid {
        credential: Credential,
        details: CredentialDetails,
    },
    Revoked {
        credential: Credential,
        details: CredentialDetails,
        revoked_at: Option<DateTime<Utc>>,
    },
    NotFound {
        token_id: String,
    },
}

impl VerificationOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            VerificationOutcome::Valid { .. } => "valid",
            VerificationOutcome::Revoked { .. } => "revoked",
            VerificationOutcome::NotFound { .. } => "not_found",
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        match self {
            VerificationOutcome::Valid { credential, .. }
            | VerificationOutcome::Revoked { credential, .. } => Some(credential),
            VerificationOutcome::NotFound { .. } => None,
        }
    }
}

/// Public credential verification by token id or QR payload.
#[derive(Clone)]
pub struct Verifier {
    store: Arc<dyn CredentialStore>,
    ledger: Arc<dyn CredentialLedger>,
    gateway: String,
}

impl Verifier {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        ledger: Arc<dyn CredentialLedger>,
        gateway: impl Into<String>,
    ) -> Self {
        Self {
            store,
            ledger,
            gateway: gateway.into(),
        }
    }

    /// Verifies a credential by token id
    ///
    /// This function:
    /// 1. Looks up the credential row by token id (leading zeros ignored)
    /// 2. Cross-checks the revocation flag and metadata URI on chain
    /// 3. Appends a verification log entry (best effort)
    #[tracing::instrument(skip(self))]
    pub async fn verify_by_token_id(
        &self,
        token_id: &str,
    ) -> Result<VerificationOutcome, VerificationError> {
        let requested = token_id.trim();
        let token_id = match canonical_token_id(requested) {
            Some(token_id) => token_id,
            None => {
                tracing::debug!("Malformed token id");
                return Ok(VerificationOutcome::NotFound {
                    token_id: requested.to_string(),
                });
            }
        };
        let token_id = token_id.as_str();

        let credential = match self.store.find_credential_by_token_id(token_id).await? {
            Some(c) => c,
            None => {
                tracing::info!("Credential not found");
                return Ok(VerificationOutcome::NotFound {
                    token_id: token_id.to_string(),
                });
            }
        };

        // The chain is authoritative for revocation; fall back to the row when it is unreachable.
        let chain_revoked = match self.ledger.is_revoked(token_id).await {
            Ok(revoked) => Some(revoked),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read revocation status from chain");
                None
            }
        };

        let metadata_matches_chain = match self.ledger.token_uri(token_id).await {
            Ok(uri) => {
                let matches = same_content(&uri, &credential.ipfs_hash);
                if !matches {
                    tracing::warn!(
                        credential_id = %credential.id,
                        chain_uri = %uri,
                        "Token metadata URI on chain differs from the stored record"
                    );
                }
                Some(matches)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not read token URI from chain");
                None
            }
        };

        let mut details = self.details(&credential);
        details.metadata_matches_chain = metadata_matches_chain;
        let outcome = if credential.revoked || chain_revoked == Some(true) {
            if !credential.revoked {
                tracing::warn!(
                    credential_id = %credential.id,
                    "Credential revoked on chain but not in database"
                );
            }
            VerificationOutcome::Revoked {
                revoked_at: credential.revoked_at,
                credential,
                details,
            }
        } else {
            VerificationOutcome::Valid {
                credential,
                details,
            }
        };

        if let Some(credential) = outcome.credential() {
            let entry = json!({
                "status": outcome.status(),
                "token_id": token_id,
                "chain_revoked": chain_revoked,
                "metadata_matches_chain": metadata_matches_chain,
                "checked_at": Utc::now(),
            });
            if let Err(e) = self.store.append_verification_log(credential.id, entry).await {
                tracing::warn!(error = %e, "Failed to write verification log");
            }
        }

        tracing::info!(status = outcome.status(), "Verification completed");

        Ok(outcome)
    }

    /// Verifies the credential referenced by a scanned QR code
    #[tracing::instrument(skip(self, payload))]
    pub async fn verify_qr_payload(
        &self,
        payload: &str,
    ) -> Result<VerificationOutcome, VerificationError> {
        tracing::debug!(payload_len = payload.len(), "Parsing QR payload");

        let token_id = extract_token_id_from_qr(payload).ok_or_else(|| {
            VerificationError::InvalidPayload(
                "QR code does not contain a credential verification link".to_string(),
            )
        })?;

        self.verify_by_token_id(&token_id).await
    }

    fn details(&self, credential: &Credential) -> CredentialDetails {
        let metadata: Option<CredentialMetadata> =
            serde_json::from_value(credential.metadata.clone())
                .map_err(|e| {
                    tracing::warn!(credential_id = %credential.id, error = %e, "Unreadable credential metadata");
                })
                .ok();

        CredentialDetails {
            average_percentage: metadata.as_ref().and_then(CredentialMetadata::average_percentage),
            document_url: gateway_url(
                &self.gateway,
                metadata.as_ref().map(|m| m.credential_data.document_uri.as_str()),
            ),
            metadata_url: gateway_url(&self.gateway, Some(&credential.ipfs_hash)),
            metadata,
            metadata_matches_chain: None,
        }
    }
}

fn is_token_id(s: &str) -> bool {
    !s.is_empty() && s.len() <= 78 && s.chars().all(|c| c.is_ascii_digit())
}

/// Decimal token id without leading zeros, or `None` if it is not a uint256.
fn canonical_token_id(s: &str) -> Option<String> {
    if !is_token_id(s) {
        return None;
    }
    U256::from_dec_str(s).ok().map(|value| value.to_string())
}

fn same_content(uri: &str, ipfs_hash: &str) -> bool {
    uri.trim().trim_start_matches("ipfs://") == ipfs_hash.trim().trim_start_matches("ipfs://")
}

/// Extracts the token id from a scanned QR payload.
///
/// Accepts the verification URL (`.../verify/<token_id>`) or a bare
/// decimal token id.
pub fn extract_token_id_from_qr(payload: &str) -> Option<String> {
    let payload = payload.trim();

    if is_token_id(payload) {
        return Some(payload.to_string());
    }

    let url = url::Url::parse(payload).ok()?;
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    let position = segments.iter().rposition(|s| *s == "verify")?;
    let candidate = segments.get(position + 1)?;

    is_token_id(candidate).then(|| candidate.to_string())
}
