//! Periodic rate limiter report using tokio-cron-scheduler.

use std::sync::Arc;

use gatekeeper_infra::CategoryRateLimiter;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Cron job that logs limiter statistics.
pub struct StatsReporter {
    inner: JobScheduler,
}

impl StatsReporter {
    /// Register the report job on `schedule` and start the scheduler.
    pub async fn start(
        schedule: &str,
        limiter: Arc<CategoryRateLimiter>,
    ) -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;

        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let limiter = limiter.clone();
            Box::pin(async move {
                report(&limiter);
            })
        })?;

        let id = inner.add(job).await?;
        inner.start().await?;
        tracing::info!(schedule = %schedule, job_id = %id, "Stats report scheduled");

        Ok(Self { inner })
    }

    /// Stop the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.inner.shutdown().await?;
        tracing::info!("Stats reporter stopped");
        Ok(())
    }
}

/// Log a stats snapshot, plus the full visitor table at debug level.
pub fn report(limiter: &CategoryRateLimiter) {
    let stats = limiter.stats();
    tracing::info!(
        total_visitors = stats.total_visitors,
        max_visitors = stats.max_visitors,
        categories = ?stats.categories,
        "Rate limiter stats"
    );
    tracing::debug!("\n{}", limiter.dump_visitors());
}
