use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info};

use crate::auth::auth_repository::RefreshTokenRepository;

/// Starts background maintenance. The returned scheduler must be kept alive
/// and shut down with the server.
pub async fn start_maintenance_jobs(
    refresh_tokens: RefreshTokenRepository,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    // Top of every hour
    let job = Job::new_async("0 0 * * * *", move |_uuid, _l| {
        let refresh_tokens = refresh_tokens.clone();

        Box::pin(async move {
            match refresh_tokens.delete_expired().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "purged expired refresh tokens"),
                Err(e) => error!("Error purging refresh tokens: {:?}", e),
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    info!("Maintenance jobs started");
    Ok(scheduler)
}
