//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring maintenance jobs.

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Top of every hour.
const SESSION_SWEEP_SCHEDULE: &str = "0 0 * * * *";

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, a
/// job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(pool: PgPool) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_session_sweep_job(&scheduler, pool).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the hourly sweep that deletes expired login sessions.
async fn register_session_sweep_job(
    scheduler: &JobScheduler,
    pool: PgPool,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async(SESSION_SWEEP_SCHEDULE, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);

        Box::pin(async move {
            match lemonade_db::delete_expired_sessions(&pool, Utc::now()).await {
                Ok(0) => tracing::debug!("scheduler: no expired sessions"),
                Ok(deleted) => tracing::info!(deleted, "scheduler: expired sessions removed"),
                Err(e) => tracing::error!(error = %e, "scheduler: session sweep failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
