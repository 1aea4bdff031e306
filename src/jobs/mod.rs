// Background jobs

pub mod reconciler;

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::db::CredentialStore;
use crate::services::contracts::CredentialLedger;

/// Intents younger than this are assumed to still be in flight
const RECONCILE_GRACE_MINUTES: i64 = 15;
const RECONCILE_BATCH_SIZE: i64 = 100;

/// Starts the cron scheduler running the reconciler on `cron`.
pub async fn start_scheduler(
    cron: &str,
    store: Arc<dyn CredentialStore>,
    ledger: Arc<dyn CredentialLedger>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(cron, move |_id, _scheduler| {
        let store = store.clone();
        let ledger = ledger.clone();
        Box::pin(async move {
            if let Err(e) = reconciler::reconcile(
                store.as_ref(),
                ledger.as_ref(),
                chrono::Duration::minutes(RECONCILE_GRACE_MINUTES),
                RECONCILE_BATCH_SIZE,
            )
            .await
            {
                tracing::error!(error = %e, "Reconciliation job failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    tracing::info!(schedule = %cron, "Reconciler scheduled");

    Ok(scheduler)
}
