use chrono::{Duration, Utc};

use crate::db::CredentialStore;
use crate::models::{
    credential::CreateCredentialData,
    issuance_intent::{IntentStatus, IssuanceIntent},
};
use crate::services::contracts::CredentialLedger;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileStats {
    pub intents_recovered: usize,
    pub intents_flagged: usize,
    pub revocations_completed: usize,
    pub revocations_pending: usize,
    pub revocations_abandoned: usize,
    pub nonces_purged: u64,
    pub errors: usize,
}

/// Background job that brings the database back in line with the chain
///
/// 1. `minted` intents older than `grace` get their credential row inserted
///    (or linked, if it exists); failure flags the intent `needs_review`
/// 2. `pending` intents older than `grace` are flagged `needs_review`, since
///    the mint may or may not have landed
/// 3. Credentials with a requested revocation are marked revoked once the
///    chain reports them revoked; requests older than `grace` that the chain
///    still does not show are dropped
/// 4. Expired wallet sign-in nonces are deleted
pub async fn reconcile(
    store: &dyn CredentialStore,
    ledger: &dyn CredentialLedger,
    grace: Duration,
    batch_size: i64,
) -> Result<ReconcileStats, sqlx::Error> {
    let mut stats = ReconcileStats::default();
    let cutoff = Utc::now() - grace;

    // 1. Minted but never stored
    let minted = store
        .list_stale_intents(IntentStatus::Minted, cutoff, batch_size)
        .await?;

    tracing::info!(minted = minted.len(), "Starting reconciliation job");

    for intent in minted {
        match recover_intent(store, &intent).await {
            Ok(()) => stats.intents_recovered += 1,
            Err(e) => {
                tracing::error!(intent_id = %intent.id, error = %e, "Could not recover minted intent");
                match store
                    .mark_intent_needs_review(intent.id, &e.to_string(), None)
                    .await
                {
                    Ok(()) => stats.intents_flagged += 1,
                    Err(e) => {
                        tracing::error!(intent_id = %intent.id, error = %e, "Failed to flag intent");
                        stats.errors += 1;
                    }
                }
            }
        }
    }

    // 2. Outcome unknown
    let pending = store
        .list_stale_intents(IntentStatus::Pending, cutoff, batch_size)
        .await?;

    for intent in pending {
        tracing::warn!(intent_id = %intent.id, "Issuance never completed, flagging for review");
        let reason = intent
            .error
            .clone()
            .unwrap_or_else(|| "Issuance did not complete; mint outcome unknown".to_string());
        match store.mark_intent_needs_review(intent.id, &reason, None).await {
            Ok(()) => stats.intents_flagged += 1,
            Err(e) => {
                tracing::error!(intent_id = %intent.id, error = %e, "Failed to flag intent");
                stats.errors += 1;
            }
        }
    }

    // 3. Revocations sent but not mirrored
    let revocations = store.list_pending_revocations(batch_size).await?;

    for credential in revocations {
        match ledger.is_revoked(&credential.token_id).await {
            Ok(true) => match store.mark_revoked(credential.id, Utc::now()).await {
                Ok(_) => {
                    tracing::info!(
                        credential_id = %credential.id,
                        token_id = %credential.token_id,
                        "Mirrored on-chain revocation"
                    );
                    stats.revocations_completed += 1;
                }
                Err(e) => {
                    tracing::error!(credential_id = %credential.id, error = %e, "Failed to mirror revocation");
                    stats.errors += 1;
                }
            },
            Ok(false) => {
                let abandoned = credential
                    .revocation_requested_at
                    .map(|at| at <= cutoff)
                    .unwrap_or(false);
                if !abandoned {
                    stats.revocations_pending += 1;
                    continue;
                }

                tracing::warn!(
                    credential_id = %credential.id,
                    token_id = %credential.token_id,
                    "Revocation never landed, clearing request"
                );
                match store.clear_revocation_requested(credential.id).await {
                    Ok(()) => stats.revocations_abandoned += 1,
                    Err(e) => {
                        tracing::error!(credential_id = %credential.id, error = %e, "Failed to clear revocation request");
                        stats.errors += 1;
                    }
                }
            }
            Err(e) => {
                tracing::error!(
                    credential_id = %credential.id,
                    error = %e,
                    "Chain error during reconciliation"
                );
                stats.errors += 1;
            }
        }
    }

    // 4. Spent challenges
    match store.purge_expired_wallet_nonces(Utc::now()).await {
        Ok(purged) => stats.nonces_purged = purged,
        Err(e) => {
            tracing::error!(error = %e, "Failed to purge expired wallet nonces");
            stats.errors += 1;
        }
    }

    tracing::info!(?stats, "Reconciliation job completed");

    Ok(stats)
}

#[derive(thiserror::Error, Debug)]
enum RecoveryError {
    #[error("Minted intent has no token id")]
    MissingTokenId,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

async fn recover_intent(
    store: &dyn CredentialStore,
    intent: &IssuanceIntent,
) -> Result<(), RecoveryError> {
    let (token_id, transaction_hash) = match (&intent.token_id, &intent.transaction_hash) {
        (Some(token_id), Some(tx_hash)) => (token_id, tx_hash),
        _ => return Err(RecoveryError::MissingTokenId),
    };

    if let Some(existing) = store.find_credential_by_token_id(token_id).await? {
        store.mark_intent_confirmed(intent.id, existing.id).await?;
        return Ok(());
    }

    let student_id = store
        .find_student_by_wallet(&intent.student_wallet_address)
        .await?
        .map(|s| s.id);

    let credential = store
        .insert_credential(CreateCredentialData {
            student_id,
            institution_id: intent.institution_id,
            token_id: token_id.clone(),
            ipfs_hash: intent.metadata_uri.trim_start_matches("ipfs://").to_string(),
            blockchain_hash: transaction_hash.clone(),
            metadata: intent.metadata.clone(),
            student_wallet_address: intent.student_wallet_address.clone(),
            issuer_wallet_address: intent.issuer_wallet_address.clone(),
        })
        .await?;

    store.mark_intent_confirmed(intent.id, credential.id).await?;

    tracing::info!(
        intent_id = %intent.id,
        credential_id = %credential.id,
        token_id = %token_id,
        "Recovered credential from intent"
    );

    Ok(())
}
