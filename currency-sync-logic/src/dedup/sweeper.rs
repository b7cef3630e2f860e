use tokio_cron_scheduler::{Job, JobSchedulerError};

use super::DedupLedger;

/// Two daily sweeps, run at local midnight: `purgeExpired` removes rows whose
/// `expiresAt` has passed, `purgeOlderThan(15)` hard-purges anything older than the
/// hard limit by creation time regardless of `expiresAt`. Implementations may swap in
/// any scheduler providing cron-like semantics that tolerates missed fires after a
/// restart; this one does.
pub fn build_sweep_jobs(ledger: DedupLedger) -> Result<Vec<Job>, JobSchedulerError> {
    let expired_job = {
        let ledger = ledger.clone();
        Job::new_async("0 0 0 * * *", move |_uuid, _lock| {
            let ledger = ledger.clone();
            Box::pin(async move {
                match ledger.purge_expired().await {
                    Ok(removed) => tracing::info!(removed, "dedup ledger: purged expired rows"),
                    Err(err) => tracing::error!(err = ?err, "dedup ledger: purge_expired failed"),
                }
            })
        })?
    };

    let hard_purge_job = {
        let ledger = ledger.clone();
        Job::new_async("0 0 0 * * *", move |_uuid, _lock| {
            let ledger = ledger.clone();
            Box::pin(async move {
                match ledger.purge_older_than_hard_limit().await {
                    Ok(removed) => tracing::info!(removed, "dedup ledger: hard-purged old rows"),
                    Err(err) => tracing::error!(err = ?err, "dedup ledger: purge_older_than failed"),
                }
            })
        })?
    };

    Ok(vec![expired_job, hard_purge_job])
}
