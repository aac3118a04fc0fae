//! Scrape scheduler.
//!
//! A periodic trigger computes the due set (shelters never synced, or
//! synced longer ago than the configured interval) and enqueues one
//! `scrape.run` job per due shelter in a single batch send. The due-set
//! computation is a pure function so it can be tested without a clock.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::envelope::{Envelope, ScrapeRunJob};
use crate::error::{PipelineError, Result};
use crate::model::Shelter;
use crate::queue::{JobQueue, QueuedJob};
use crate::store::ShelterStore;

/// Shelters due for a scrape: active, and `last_sync` is null or older
/// than `interval_minutes`.
pub fn due_shelters(
    shelters: &[Shelter],
    now: DateTime<Utc>,
    interval_minutes: i64,
) -> Vec<&Shelter> {
    let cutoff = now - Duration::minutes(interval_minutes);
    shelters
        .iter()
        .filter(|shelter| shelter.active)
        .filter(|shelter| match shelter.last_sync {
            None => true,
            Some(last_sync) => last_sync < cutoff,
        })
        .collect()
}

/// Compute the due set and enqueue one `scrape.run` job per due shelter.
/// Returns the enqueued count.
pub async fn enqueue_due<S: ShelterStore>(
    store: &S,
    queue: &dyn JobQueue,
    interval_minutes: i64,
) -> Result<usize> {
    let shelters = store.list_shelters().await?;
    let due = due_shelters(&shelters, Utc::now(), interval_minutes);

    if due.is_empty() {
        info!(total = shelters.len(), "no shelters due for scraping");
        return Ok(0);
    }

    let mut jobs = Vec::with_capacity(due.len());
    for shelter in &due {
        let envelope = Envelope::new(
            ScrapeRunJob {
                shelter_id: shelter.id.clone(),
                shelter_slug: shelter.slug.clone(),
                base_url: shelter.url.clone(),
            },
            "scheduler",
        );
        jobs.push(QueuedJob::from_envelope(&envelope)?);
    }

    let enqueued = jobs.len();
    queue.send_batch(jobs).await?;

    info!(
        due = due.len(),
        enqueued = enqueued,
        "enqueued scrape runs for due shelters"
    );

    Ok(enqueued)
}

/// Start the periodic trigger. Runs the due-set check every 10 minutes;
/// the interval itself gates how often any one shelter is re-scraped.
pub async fn start_scheduler<S>(
    store: Arc<S>,
    queue: Arc<dyn JobQueue>,
    interval_minutes: i64,
) -> Result<JobScheduler>
where
    S: ShelterStore + 'static,
{
    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| PipelineError::Scheduler(e.to_string()))?;

    let job = Job::new_async("0 */10 * * * *", move |_uuid, _lock| {
        let store = Arc::clone(&store);
        let queue = Arc::clone(&queue);
        Box::pin(async move {
            if let Err(e) = enqueue_due(store.as_ref(), queue.as_ref(), interval_minutes).await {
                error!(error = %e, "scheduled scrape enqueue failed");
            }
        })
    })
    .map_err(|e| PipelineError::Scheduler(e.to_string()))?;

    scheduler
        .add(job)
        .await
        .map_err(|e| PipelineError::Scheduler(e.to_string()))?;
    scheduler
        .start()
        .await
        .map_err(|e| PipelineError::Scheduler(e.to_string()))?;

    info!(interval_minutes, "scrape scheduler started");
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShelterStatus;

    fn shelter(id: &str, last_sync: Option<DateTime<Utc>>, active: bool) -> Shelter {
        let mut shelter = Shelter::new(id, id, id, format!("https://{}.example.org", id));
        shelter.last_sync = last_sync;
        shelter.active = active;
        shelter
    }

    #[test]
    fn never_synced_shelters_are_due() {
        let now = Utc::now();
        let shelters = vec![shelter("a", None, true)];
        assert_eq!(due_shelters(&shelters, now, 60).len(), 1);
    }

    #[test]
    fn recently_synced_shelters_are_not_due() {
        let now = Utc::now();
        let shelters = vec![
            shelter("fresh", Some(now - Duration::minutes(10)), true),
            shelter("stale", Some(now - Duration::minutes(90)), true),
        ];
        let due = due_shelters(&shelters, now, 60);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "stale");
    }

    #[test]
    fn inactive_shelters_are_never_due() {
        let now = Utc::now();
        let mut inactive = shelter("off", None, false);
        inactive.status = ShelterStatus::Inactive;
        let shelters = vec![inactive];
        assert!(due_shelters(&shelters, now, 60).is_empty());
    }

    #[tokio::test]
    async fn enqueue_due_sends_one_job_per_due_shelter() {
        use crate::store::MemoryStore;
        use crate::testing::MockQueue;

        let now = Utc::now();
        let store = MemoryStore::new().with_shelters(vec![
            shelter("stale", Some(now - Duration::minutes(120)), true),
            shelter("fresh", Some(now - Duration::minutes(1)), true),
            shelter("never", None, true),
        ]);
        let queue = MockQueue::new();

        let enqueued = enqueue_due(&store, &queue, 60).await.unwrap();
        assert_eq!(enqueued, 2);

        let jobs = queue.take_jobs();
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|job| job.job_type == "scrape.run"));
    }
}
