use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::CredentialStore;
use crate::models::{
    credential::{CreateCredentialData, Credential},
    issuance_intent::CreateIntentData,
};
use crate::services::contracts::{ChainError, CredentialLedger};
use crate::services::ipfs::{ipfs_uri, ContentStorage, StorageError};
use crate::services::metadata::{validate_subjects, CredentialData, CredentialMetadata, SubjectMark};
use crate::services::validation::{is_valid_address, require, same_wallet};

#[derive(thiserror::Error, Debug)]
pub enum CredentialError {
    #[error("{0}")]
    Validation(String),

    #[error("Institution not found")]
    InstitutionNotFound,

    #[error("Credential not found")]
    NotFound,

    #[error("Credential is already revoked")]
    AlreadyRevoked,

    #[error("You can only revoke credentials issued from your connected wallet")]
    WalletMismatch,

    #[error("Only the original issuer can revoke this credential. Please connect wallet {expected}")]
    ChainIssuerMismatch { expected: String },

    #[error("Connected wallet does not match the institution's registered wallet {expected}")]
    InstitutionWalletMismatch { expected: String },

    #[error("Institution has no connected wallet")]
    InstitutionWalletMissing,

    #[error("Institution has not been verified by an administrator")]
    InstitutionNotVerified,

    #[error("Wallet {0} is not authorized to issue credentials")]
    NotAuthorizedIssuer(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Blockchain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Credential fields submitted by an institution
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCredentialRequest {
    pub institution_id: Uuid,
    pub student_name: String,
    pub student_wallet: String,
    pub credential_type: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub field_of_study: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub subjects: Vec<SubjectMark>,
}

/// The uploaded credential document
#[derive(Debug, Clone)]
pub struct CredentialDocument {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct IssueCredentialResult {
    pub credential: Credential,
    pub metadata: CredentialMetadata,
    pub metadata_uri: String,
    /// `None` when the registry call failed; the mint still stands.
    pub registry_transaction: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RevokeCredentialResult {
    pub credential: Credential,
    pub transaction_hash: String,
}

/// Issuance and revocation orchestration over storage, chain and database.
#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn CredentialStore>,
    ledger: Arc<dyn CredentialLedger>,
    storage: Arc<dyn ContentStorage>,
}

impl CredentialService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        ledger: Arc<dyn CredentialLedger>,
        storage: Arc<dyn ContentStorage>,
    ) -> Self {
        Self {
            store,
            ledger,
            storage,
        }
    }

    /// Issues a credential
    ///
    /// 1. Validates input and the signer's standing: the institution must be
    ///    verified and bound to the signer, and the signer must hold the
    ///    issuer role on chain
    /// 2. Uploads the document, then the metadata JSON, to IPFS
    /// 3. Records an issuance intent
    /// 4. Mints the token and registers it in the registry (best effort)
    /// 5. Stores the credential row and confirms the intent
    #[tracing::instrument(
        skip(self, request, document),
        fields(institution_id = %request.institution_id, signer = %signer)
    )]
    pub async fn issue_credential(
        &self,
        request: IssueCredentialRequest,
        document: CredentialDocument,
        signer: &str,
    ) -> Result<IssueCredentialResult, CredentialError> {
        let start_time = Instant::now();

        tracing::info!("Starting credential issuance");

        // 0. Validation, all before any network call
        let student_name = require("Student name", &request.student_name)
            .map_err(CredentialError::Validation)?;
        let title = require("Title", &request.title).map_err(CredentialError::Validation)?;
        let credential_type = require("Credential type", &request.credential_type)
            .map_err(CredentialError::Validation)?;
        let student_wallet = request.student_wallet.trim().to_string();

        if !is_valid_address(signer) {
            return Err(CredentialError::Validation(
                "Connected wallet address is invalid".to_string(),
            ));
        }
        if !is_valid_address(&student_wallet) {
            return Err(CredentialError::Validation(
                "Invalid student wallet address".to_string(),
            ));
        }
        if document.bytes.is_empty() {
            return Err(CredentialError::Validation(
                "Please select a credential document to upload".to_string(),
            ));
        }
        validate_subjects(&request.subjects).map_err(CredentialError::Validation)?;

        let institution = self
            .store
            .find_institution(request.institution_id)
            .await?
            .ok_or(CredentialError::InstitutionNotFound)?;

        let registered = institution
            .wallet_address
            .as_deref()
            .ok_or(CredentialError::InstitutionWalletMissing)?;
        if !same_wallet(registered, signer) {
            tracing::warn!(
                registered_wallet = %registered,
                "Signer does not match the institution wallet"
            );
            return Err(CredentialError::InstitutionWalletMismatch {
                expected: registered.to_string(),
            });
        }
        if !institution.verified {
            return Err(CredentialError::InstitutionNotVerified);
        }

        // Role claims are re-read from the chain on every issuance
        if !self.ledger.is_authorized_issuer(signer).await? {
            let owner = self.ledger.owner().await?;
            if !same_wallet(&owner, signer) {
                return Err(CredentialError::NotAuthorizedIssuer(signer.to_string()));
            }
            tracing::debug!("Signer is the contract owner");
        }

        // 1. Document upload
        let upload_start = Instant::now();
        let document_cid = self
            .storage
            .upload_file(&document.file_name, &document.content_type, document.bytes)
            .await?;

        // 2. Metadata
        let metadata = CredentialMetadata::build(
            CredentialData {
                student_name,
                student_wallet: student_wallet.clone(),
                institution_name: institution.name.clone(),
                institution_wallet: signer.to_string(),
                credential_type,
                title,
                field_of_study: request.field_of_study.filter(|f| !f.trim().is_empty()),
                grade: request.grade.filter(|g| !g.trim().is_empty()),
                issue_date: request.issue_date,
                document_uri: ipfs_uri(&document_cid),
                subjects: request.subjects,
            },
            request.description,
        );
        let metadata_json = serde_json::to_value(&metadata)?;

        // 3. Metadata upload
        let metadata_cid = self.storage.upload_json(&metadata_json).await?;
        let metadata_uri = ipfs_uri(&metadata_cid);
        let upload_duration = upload_start.elapsed();

        tracing::info!(
            document_cid = %document_cid,
            metadata_cid = %metadata_cid,
            duration_ms = upload_duration.as_millis(),
            "Uploaded credential to IPFS"
        );

        // 4. Content hash
        let credential_hash = metadata.content_hash()?;
        let credential_hash_hex = format!("0x{}", hex::encode(credential_hash));

        // 5. Intent
        let intent = self
            .store
            .create_intent(CreateIntentData {
                institution_id: institution.id,
                student_wallet_address: student_wallet.clone(),
                issuer_wallet_address: signer.to_string(),
                metadata: metadata_json.clone(),
                metadata_uri: metadata_uri.clone(),
                credential_hash: credential_hash_hex,
            })
            .await?;

        // 6. Mint
        let chain_start = Instant::now();
        let receipt = match self
            .ledger
            .issue_credential(signer, &student_wallet, credential_hash, &metadata_uri)
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::error!(intent_id = %intent.id, error = %e, "Mint failed");
                let tx_hash = e.transaction_hash();
                let marked = if e.may_have_landed() {
                    self.store
                        .mark_intent_needs_review(intent.id, &e.to_string(), tx_hash)
                        .await
                } else {
                    self.store
                        .mark_intent_failed(intent.id, &e.to_string(), tx_hash)
                        .await
                };
                if let Err(db_err) = marked {
                    tracing::warn!(intent_id = %intent.id, error = %db_err, "Failed to update intent");
                }
                return Err(e.into());
            }
        };

        if let Err(e) = self
            .store
            .mark_intent_minted(intent.id, &receipt.token_id, &receipt.transaction_hash)
            .await
        {
            tracing::warn!(intent_id = %intent.id, error = %e, "Failed to mark intent as minted");
        }

        // 7. Registry, best effort
        let registry_transaction = match self
            .ledger
            .register_credential(signer, &receipt.token_id, &student_wallet, credential_hash)
            .await
        {
            Ok(tx_hash) => Some(tx_hash),
            Err(e) => {
                tracing::warn!(
                    token_id = %receipt.token_id,
                    error = %e,
                    "Registry registration failed, continuing"
                );
                None
            }
        };
        let chain_duration = chain_start.elapsed();

        tracing::info!(
            token_id = %receipt.token_id,
            tx_hash = %receipt.transaction_hash,
            duration_ms = chain_duration.as_millis(),
            "Minted credential token"
        );

        // 8. Student lookup
        let student_id = match self.store.find_student_by_wallet(&student_wallet).await {
            Ok(student) => student.map(|s| s.id),
            Err(e) => {
                tracing::warn!(error = %e, "Student lookup failed, storing without student id");
                None
            }
        };

        // 9. Persist
        let credential = match self
            .store
            .insert_credential(CreateCredentialData {
                student_id,
                institution_id: institution.id,
                token_id: receipt.token_id.clone(),
                ipfs_hash: metadata_cid,
                blockchain_hash: receipt.transaction_hash.clone(),
                metadata: metadata_json,
                student_wallet_address: student_wallet,
                issuer_wallet_address: signer.to_string(),
            })
            .await
        {
            Ok(credential) => credential,
            Err(e) => {
                tracing::error!(
                    intent_id = %intent.id,
                    token_id = %receipt.token_id,
                    error = %e,
                    "Credential minted but not stored"
                );
                if let Err(db_err) = self.store.record_intent_error(intent.id, &e.to_string()).await {
                    tracing::warn!(intent_id = %intent.id, error = %db_err, "Failed to record intent error");
                }
                return Err(e.into());
            }
        };

        if let Err(e) = self.store.mark_intent_confirmed(intent.id, credential.id).await {
            tracing::warn!(intent_id = %intent.id, error = %e, "Failed to confirm intent");
        }

        let total_duration = start_time.elapsed();
        tracing::info!(
            credential_id = %credential.id,
            token_id = %credential.token_id,
            upload_ms = upload_duration.as_millis(),
            chain_ms = chain_duration.as_millis(),
            total_ms = total_duration.as_millis(),
            "Credential issued"
        );

        Ok(IssueCredentialResult {
            credential,
            metadata,
            metadata_uri,
            registry_transaction,
        })
    }

    /// Revokes a credential on chain and in the database.
    ///
    /// The signer must match both the stored issuer wallet and the issuer
    /// recorded by the token contract; no transaction is sent otherwise.
    #[tracing::instrument(skip(self), fields(signer = %signer))]
    pub async fn revoke_credential_by_id(
        &self,
        credential_id: Uuid,
        signer: &str,
    ) -> Result<RevokeCredentialResult, CredentialError> {
        let credential = self
            .store
            .find_credential(credential_id)
            .await?
            .ok_or(CredentialError::NotFound)?;

        if credential.revoked {
            return Err(CredentialError::AlreadyRevoked);
        }

        if !same_wallet(signer, &credential.issuer_wallet_address) {
            tracing::warn!(
                issuer_wallet = %credential.issuer_wallet_address,
                "Revocation attempted from a different wallet"
            );
            return Err(CredentialError::WalletMismatch);
        }

        let chain_issuer = self.ledger.credential_issuer(&credential.token_id).await?;
        if !same_wallet(signer, &chain_issuer) {
            tracing::warn!(
                token_id = %credential.token_id,
                chain_issuer = %chain_issuer,
                "Signer is not the on-chain issuer"
            );
            return Err(CredentialError::ChainIssuerMismatch {
                expected: chain_issuer,
            });
        }

        self.store.mark_revocation_requested(credential.id).await?;

        let transaction_hash = match self
            .ledger
            .revoke_credential(signer, &credential.token_id)
            .await
        {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                tracing::error!(token_id = %credential.token_id, error = %e, "Revoke failed");
                // Keep the marker only while the revoke may still land
                if !e.may_have_landed() {
                    if let Err(db_err) = self.store.clear_revocation_requested(credential.id).await {
                        tracing::warn!(
                            credential_id = %credential.id,
                            error = %db_err,
                            "Failed to clear revocation marker"
                        );
                    }
                }
                return Err(e.into());
            }
        };

        tracing::info!(
            token_id = %credential.token_id,
            tx_hash = %transaction_hash,
            "Revoked credential on chain"
        );

        let credential = match self.store.mark_revoked(credential.id, Utc::now()).await? {
            Some(updated) => updated,
            // A concurrent request got there first; return the current row.
            None => self
                .store
                .find_credential(credential.id)
                .await?
                .ok_or(CredentialError::NotFound)?,
        };

        Ok(RevokeCredentialResult {
            credential,
            transaction_hash,
        })
    }

    pub async fn get_institution_credentials(
        &self,
        institution_id: Uuid,
    ) -> Result<Vec<Credential>, CredentialError> {
        Ok(self.store.list_credentials_by_institution(institution_id).await?)
    }

    pub async fn get_credential_by_id(&self, id: Uuid) -> Result<Credential, CredentialError> {
        self.store
            .find_credential(id)
            .await?
            .ok_or(CredentialError::NotFound)
    }

    pub async fn get_student_credentials(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<Credential>, CredentialError> {
        Ok(self.store.list_credentials_by_student(student_id).await?)
    }

    pub async fn get_wallet_credentials(
        &self,
        wallet: &str,
    ) -> Result<Vec<Credential>, CredentialError> {
        if !is_valid_address(wallet) {
            return Err(CredentialError::Validation(
                "Invalid wallet address".to_string(),
            ));
        }
        Ok(self.store.list_credentials_by_wallet(wallet).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_parses_from_form_json() {
        let request: IssueCredentialRequest = serde_json::from_value(serde_json::json!({
            "institutionId": "7f1d5c4e-8f39-4c2a-9a44-0d2f7c1b9e10",
            "studentName": "Ada Lovelace",
            "studentWallet": "0xAbC0000000000000000000000000000000000123",
            "credentialType": "Degree",
            "title": "B.Sc. Computer Science",
            "issueDate": "2024-06-30",
            "subjects": [{"name": "Math", "marks": 85, "maxMarks": 100}]
        }))
        .unwrap();

        assert_eq!(request.subjects.len(), 1);
        assert_eq!(request.subjects[0].max_marks, 100.0);
        assert!(request.description.is_none());
    }

    #[test]
    fn mismatch_messages_name_the_expected_wallet() {
        let e = CredentialError::ChainIssuerMismatch {
            expected: "0x1111111111111111111111111111111111111111".to_string(),
        };
        assert!(e
            .to_string()
            .ends_with("0x1111111111111111111111111111111111111111"));
    }
}
