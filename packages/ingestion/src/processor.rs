//! Scrape processor: orchestrates fetch → parse → transform → extract →
//! diff → persist → re-enqueue for one shelter at a time.
//!
//! Failure isolation: a per-dog failure drops that dog and the run
//! continues; a listing-level failure aborts only this shelter's run and is
//! recorded in its sync log. Nothing here shares mutable state across
//! shelters, so runs are safe to repeat under at-least-once delivery.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::adapters::AdapterRegistry;
use crate::ai::extractor::{ExtractionContext, TextExtraction};
use crate::ai::{DescriptionGenerator, Extractor};
use crate::diff::{self, Candidate};
use crate::envelope::{
    Envelope, GeneratePhotosJob, PhotoVariant, ProcessOriginalImagesJob, ReindexOp,
    ScrapeRunJob, SearchReindexJob,
};
use crate::error::{NotFoundError, Result};
use crate::http::HttpFetch;
use crate::model::{CreateDogInput, Dog, Shelter, ShelterStatus, SyncLog};
use crate::queue::{JobQueue, QueuedJob};
use crate::search::build_document;
use crate::store::{DogStore, ShelterStore, SyncLogStore};

/// Job source tag stamped on every envelope this processor emits.
const SOURCE: &str = "scrape-processor";

/// Outcome of a re-enrichment pass over stored dogs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub processed: u32,
    pub updated: u32,
    pub failed: u32,
}

/// Per-shelter pipeline orchestrator.
pub struct ScrapeProcessor<S> {
    store: Arc<S>,
    registry: Arc<AdapterRegistry>,
    http: Arc<dyn HttpFetch>,
    extractor: Extractor,
    generator: DescriptionGenerator,
    queue: Arc<dyn JobQueue>,
    generate_photos: bool,
}

impl<S> ScrapeProcessor<S>
where
    S: ShelterStore + DogStore + SyncLogStore,
{
    pub fn new(
        store: Arc<S>,
        registry: Arc<AdapterRegistry>,
        http: Arc<dyn HttpFetch>,
        extractor: Extractor,
        generator: DescriptionGenerator,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            store,
            registry,
            http,
            extractor,
            generator,
            queue,
            generate_photos: false,
        }
    }

    /// Also enqueue `photos.generate` jobs for every create/update.
    pub fn with_photo_generation(mut self, generate_photos: bool) -> Self {
        self.generate_photos = generate_photos;
        self
    }

    /// Handle a consumed `scrape.run` job, chaining emitted jobs to its
    /// trace.
    pub async fn handle_scrape_job(&self, envelope: &Envelope<ScrapeRunJob>) -> Result<SyncLog> {
        self.run_scrape(&envelope.payload.shelter_id, None, Some(&envelope.trace_id))
            .await
    }

    /// Run one full scrape for a shelter.
    ///
    /// Returns the finalized sync log. A listing-level failure is recorded
    /// in the log (and the shelter's status) rather than returned as an
    /// error; only infrastructure failures (storage, queue) propagate.
    pub async fn run_scrape(
        &self,
        shelter_id: &str,
        limit: Option<usize>,
        parent_trace: Option<&str>,
    ) -> Result<SyncLog> {
        let shelter = self
            .store
            .get_shelter(shelter_id)
            .await?
            .ok_or_else(|| NotFoundError::new("shelter", shelter_id))?;
        let adapter = self
            .registry
            .get(shelter_id)
            .ok_or_else(|| NotFoundError::new("adapter", shelter_id))?;

        let mut log = SyncLog::start(shelter_id);
        self.store.insert_sync_log(&log).await?;

        info!(shelter_id = %shelter_id, "scrape run started");

        // Listing fetch/parse: a failure here aborts this shelter's run only.
        let raws = match adapter.fetch(self.http.as_ref()).await {
            Ok(raw) => match adapter.parse(self.http.as_ref(), &raw).await {
                Ok(raws) => raws,
                Err(e) => {
                    return self.abort_run(log, &shelter, e.to_string()).await;
                }
            },
            Err(e) => {
                return self.abort_run(log, &shelter, e.to_string()).await;
            }
        };

        let raws = match limit {
            Some(limit) => raws.into_iter().take(limit).collect(),
            None => raws,
        };

        let context = ExtractionContext {
            shelter_name: shelter.name.clone(),
            city: shelter.city.clone(),
        };

        // Transform + extract, per-item failures dropped. Extraction runs
        // before fingerprinting so the digest covers post-extraction content.
        let mut candidates = Vec::with_capacity(raws.len());
        for raw in raws {
            let external_id = raw.external_id.clone();
            match self.enrich_input(adapter.transform(raw), &context).await {
                Ok(input) => candidates.push(Candidate::new(input)),
                Err(message) => {
                    warn!(shelter_id = %shelter_id, external_id = %external_id, error = %message, "dropping candidate");
                    log.record_error(format!("{}: {}", external_id, message));
                }
            }
        }

        let stored = self.store.fingerprints_by_shelter(shelter_id).await?;
        let outcome = diff::classify(&stored, candidates);

        info!(
            shelter_id = %shelter_id,
            creates = outcome.creates.len(),
            updates = outcome.updates.len(),
            unchanged = outcome.unchanged.len(),
            removed = outcome.removed.len(),
            "diff classified"
        );

        let mut jobs: Vec<QueuedJob> = Vec::new();

        for candidate in outcome.creates {
            let dog = self.persist_create(candidate.input).await?;
            log.dogs_added += 1;
            self.push_upsert_jobs(&mut jobs, &dog, parent_trace)?;
        }

        for candidate in outcome.updates {
            let external_id = candidate.input.external_id.clone();
            let mut dog = self
                .store
                .find_dog(shelter_id, &external_id)
                .await?
                .ok_or_else(|| NotFoundError::new("dog", external_id))?;
            dog.apply_input(candidate.input);
            self.store.update_dog(&dog).await?;
            log.dogs_updated += 1;
            self.push_upsert_jobs(&mut jobs, &dog, parent_trace)?;
        }

        for external_id in &outcome.removed {
            if let Some(dog_id) = self.store.mark_removed(shelter_id, external_id).await? {
                log.dogs_removed += 1;
                jobs.push(self.reindex_job(
                    SearchReindexJob {
                        op: ReindexOp::Delete,
                        dog_id,
                        description: None,
                        metadata: None,
                    },
                    parent_trace,
                )?);
            }
        }

        if !jobs.is_empty() {
            self.queue.send_batch(jobs).await?;
        }

        log.finish();
        self.store.update_sync_log(&log).await?;
        self.store
            .update_shelter_sync(shelter_id, ShelterStatus::Active, Some(Utc::now()))
            .await?;

        info!(
            shelter_id = %shelter_id,
            added = log.dogs_added,
            updated = log.dogs_updated,
            removed = log.dogs_removed,
            errors = log.errors.len(),
            "scrape run finished"
        );

        Ok(log)
    }

    /// Re-run AI enrichment over a shelter's stored dogs with a bounded
    /// worker pool. Changed dogs are persisted and reindexed.
    pub async fn process_shelter(
        &self,
        shelter_id: &str,
        limit: Option<usize>,
        concurrency: usize,
        generate_photos: bool,
    ) -> Result<ProcessOutcome> {
        let shelter = self
            .store
            .get_shelter(shelter_id)
            .await?
            .ok_or_else(|| NotFoundError::new("shelter", shelter_id))?;

        let mut dogs = self.store.dogs_by_shelter(shelter_id).await?;
        if let Some(limit) = limit {
            dogs.truncate(limit);
        }

        let context = ExtractionContext {
            shelter_name: shelter.name.clone(),
            city: shelter.city.clone(),
        };

        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let enrichments = dogs.into_iter().map(|dog| {
            let semaphore = Arc::clone(&semaphore);
            let context = context.clone();
            async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return (dog, Err("worker pool closed".to_string())),
                };
                let result = self.enrich_dog(&dog, &context).await;
                (dog, result)
            }
        });

        let mut outcome = ProcessOutcome::default();
        let mut jobs: Vec<QueuedJob> = Vec::new();

        for (dog, result) in join_all(enrichments).await {
            outcome.processed += 1;
            match result {
                Ok(Some(updated)) => {
                    self.store.update_dog(&updated).await?;
                    outcome.updated += 1;
                    self.push_upsert_jobs(&mut jobs, &updated, None)?;
                    if generate_photos {
                        jobs.push(self.photos_job(&updated)?);
                    }
                }
                Ok(None) => {
                    if generate_photos {
                        jobs.push(self.photos_job(&dog)?);
                    }
                }
                Err(message) => {
                    warn!(
                        shelter_id = %shelter_id,
                        external_id = %dog.external_id,
                        error = %message,
                        "enrichment failed, skipping dog"
                    );
                    outcome.failed += 1;
                }
            }
        }

        if !jobs.is_empty() {
            self.queue.send_batch(jobs).await?;
        }

        info!(
            shelter_id = %shelter_id,
            processed = outcome.processed,
            updated = outcome.updated,
            failed = outcome.failed,
            "process run finished"
        );

        Ok(outcome)
    }

    /// Fill AI-derived fields on freshly transformed input.
    async fn enrich_input(
        &self,
        transformed: std::result::Result<CreateDogInput, crate::error::ParseError>,
        context: &ExtractionContext,
    ) -> std::result::Result<CreateDogInput, String> {
        let mut input = transformed.map_err(|e| e.to_string())?;

        if input.description.trim().is_empty() {
            // No text to work with; fall back to photo extraction when the
            // page at least had images.
            if !input.photo_urls.is_empty() {
                let extraction = self
                    .extractor
                    .extract_from_photos(&input.photo_urls, context)
                    .await
                    .map_err(|e| e.to_string())?;
                input.breed_estimates = extraction.breed_estimates;
                input.size_estimate = extraction.size_estimate;
            }
            return Ok(input);
        }

        let extraction = self
            .extractor
            .extract_from_text(&input.description, context)
            .await
            .map_err(|e| e.to_string())?;
        merge_into_input(&mut input, extraction);

        Ok(input)
    }

    /// Re-extract and regenerate for a stored dog. Returns the updated
    /// record when its content actually changed.
    async fn enrich_dog(
        &self,
        dog: &Dog,
        context: &ExtractionContext,
    ) -> std::result::Result<Option<Dog>, String> {
        if dog.description.trim().is_empty() {
            return Ok(None);
        }

        let extraction = self
            .extractor
            .extract_from_text(&dog.description, context)
            .await
            .map_err(|e| e.to_string())?;

        let mut updated = dog.clone();
        merge_into_dog(&mut updated, extraction);

        let bio = self
            .generator
            .generate(&updated)
            .await
            .map_err(|e| e.to_string())?;
        updated.bio = Some(bio.bio);
        updated.bio_tone = Some(bio.tone);

        updated.refresh_fingerprint();

        if updated.fingerprint == dog.fingerprint && updated.bio == dog.bio {
            return Ok(None);
        }
        Ok(Some(updated))
    }

    async fn persist_create(&self, input: CreateDogInput) -> Result<Dog> {
        // A soft-removed dog that reappears at the source is resurrected
        // under its original id rather than duplicated.
        match self
            .store
            .find_dog(&input.shelter_id, &input.external_id)
            .await?
        {
            Some(mut existing) => {
                existing.apply_input(input);
                self.store.update_dog(&existing).await?;
                Ok(existing)
            }
            None => {
                let dog = Dog::from_input(input);
                self.store.insert_dog(&dog).await?;
                Ok(dog)
            }
        }
    }

    /// Reindex upsert + image jobs for a created/updated dog.
    fn push_upsert_jobs(
        &self,
        jobs: &mut Vec<QueuedJob>,
        dog: &Dog,
        parent_trace: Option<&str>,
    ) -> Result<()> {
        let document = build_document(dog);
        jobs.push(self.reindex_job(
            SearchReindexJob {
                op: ReindexOp::Upsert,
                dog_id: dog.id,
                description: Some(document.text),
                metadata: Some(document.metadata),
            },
            parent_trace,
        )?);

        if !dog.photo_urls.is_empty() {
            let envelope = match parent_trace {
                Some(parent) => Envelope::with_parent(
                    ProcessOriginalImagesJob {
                        dog_id: dog.id,
                        urls: dog.photo_urls.clone(),
                    },
                    SOURCE,
                    parent,
                ),
                None => Envelope::new(
                    ProcessOriginalImagesJob {
                        dog_id: dog.id,
                        urls: dog.photo_urls.clone(),
                    },
                    SOURCE,
                ),
            };
            jobs.push(QueuedJob::from_envelope(&envelope)?);
        }

        if self.generate_photos {
            jobs.push(self.photos_job(dog)?);
        }

        Ok(())
    }

    fn reindex_job(
        &self,
        job: SearchReindexJob,
        parent_trace: Option<&str>,
    ) -> Result<QueuedJob> {
        let envelope = match parent_trace {
            Some(parent) => Envelope::with_parent(job, SOURCE, parent),
            None => Envelope::new(job, SOURCE),
        };
        Ok(QueuedJob::from_envelope(&envelope)?)
    }

    fn photos_job(&self, dog: &Dog) -> Result<QueuedJob> {
        let envelope = Envelope::new(
            GeneratePhotosJob {
                dog_id: dog.id,
                variant: PhotoVariant::Professional,
                force: None,
            },
            SOURCE,
        );
        Ok(QueuedJob::from_envelope(&envelope)?)
    }

    async fn abort_run(
        &self,
        mut log: SyncLog,
        shelter: &Shelter,
        message: String,
    ) -> Result<SyncLog> {
        warn!(shelter_id = %shelter.id, error = %message, "scrape run aborted");
        log.record_error(message);
        log.finish();
        self.store.update_sync_log(&log).await?;
        self.store
            .update_shelter_sync(&shelter.id, ShelterStatus::Error, None)
            .await?;
        Ok(log)
    }
}

/// Overlay extraction output onto adapter output. Health flags only move
/// from unknown to known; urgency only escalates.
fn merge_into_input(input: &mut CreateDogInput, extraction: TextExtraction) {
    input.breed_estimates = extraction.breed_estimates;
    input.size_estimate = extraction.size_estimate;
    input.age_estimate = extraction.age_estimate;
    input.weight_estimate = extraction.weight_estimate;
    if !extraction.personality.is_empty() {
        input.personality = extraction.personality;
    }
    input.good_with_children = extraction.good_with_children.or(input.good_with_children);
    input.good_with_dogs = extraction.good_with_dogs.or(input.good_with_dogs);
    input.good_with_cats = extraction.good_with_cats.or(input.good_with_cats);
    input.vaccinated = extraction.vaccinated.or(input.vaccinated);
    input.sterilized = extraction.sterilized.or(input.sterilized);
    input.urgent = input.urgent || extraction.urgent;
}

/// Same overlay for a stored dog during re-enrichment.
fn merge_into_dog(dog: &mut Dog, extraction: TextExtraction) {
    dog.breed_estimates = extraction.breed_estimates;
    dog.size_estimate = extraction.size_estimate;
    dog.age_estimate = extraction.age_estimate;
    dog.weight_estimate = extraction.weight_estimate;
    if !extraction.personality.is_empty() {
        dog.personality = extraction.personality;
    }
    dog.good_with_children = extraction.good_with_children.or(dog.good_with_children);
    dog.good_with_dogs = extraction.good_with_dogs.or(dog.good_with_dogs);
    dog.good_with_cats = extraction.good_with_cats.or(dog.good_with_cats);
    dog.vaccinated = extraction.vaccinated.or(dog.vaccinated);
    dog.sterilized = extraction.sterilized.or(dog.sterilized);
    dog.urgent = dog.urgent || extraction.urgent;
}
