//! End-to-end pipeline tests over mocked HTTP, LLM, store and queue.

use std::sync::Arc;

use ingestion::adapters::{AdapterRegistry, PromykAdapter, ShelterConfig};
use ingestion::ai::{DescriptionGenerator, Extractor};
use ingestion::envelope::{Envelope, ScrapeRunJob};
use ingestion::model::DogStatus;
use ingestion::processor::ScrapeProcessor;
use ingestion::store::{MemoryStore, ShelterStore};
use ingestion::testing::{MockHttp, MockLanguageModel, MockQueue};
use ingestion::ShelterStatus;

const BASE: &str = "https://promyk.example.org";

fn listing(entries: &[&str]) -> String {
    let anchors: String = entries
        .iter()
        .map(|slug| format!("<a href=\"/pies/{}\">{}</a>", slug, slug))
        .collect();
    format!("<html><body><div class=\"dogs\">{}</div></body></html>", anchors)
}

fn detail_page(name: &str, description: &str) -> String {
    format!(
        "<html><body><h1>{}</h1><div class=\"entry-content\"><p>{}</p>\
         <img src=\"/foto/{}.jpg\"></div></body></html>",
        name,
        description,
        name.to_lowercase()
    )
}

fn extraction_json() -> String {
    serde_json::json!({
        "breed_estimates": [{"breed": "mieszaniec", "confidence": 0.85}],
        "size_estimate": {"category": "medium", "confidence": 0.7},
        "age_estimate": {"months": 30, "min_months": 24, "max_months": 40, "confidence": 0.6},
        "weight_estimate": null,
        "personality": ["przyjazny"],
        "good_with_children": true,
        "good_with_dogs": null,
        "good_with_cats": null,
        "vaccinated": null,
        "sterilized": null,
        "urgent": false
    })
    .to_string()
}

fn bio_json() -> String {
    serde_json::json!({
        "bio": "Czeka na swój nowy dom i kochającą rodzinę.",
        "tone": "hopeful"
    })
    .to_string()
}

fn test_config() -> ShelterConfig {
    ShelterConfig {
        id: "promyk".into(),
        slug: "schronisko-promyk".into(),
        name: "Schronisko Promyk".into(),
        base_url: BASE.into(),
        city: Some("Warszawa".into()),
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    queue: Arc<MockQueue>,
    llm: Arc<MockLanguageModel>,
}

impl Harness {
    fn new() -> Self {
        let registry = {
            let mut registry = AdapterRegistry::new();
            registry.register(Arc::new(PromykAdapter::new(test_config())));
            registry
        };
        let store = Arc::new(MemoryStore::new().with_shelters(registry.shelters()));
        let queue = Arc::new(MockQueue::new());
        let llm = Arc::new(
            MockLanguageModel::new()
                .with_response("text_extraction", extraction_json())
                .with_response("generated_bio", bio_json()),
        );
        Self { store, queue, llm }
    }

    /// Processor over the shared store/queue, scraping the given pages.
    fn processor(&self, http: MockHttp) -> ScrapeProcessor<MemoryStore> {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(PromykAdapter::new(test_config())));

        let llm: Arc<dyn ingestion::LanguageModel> = self.llm.clone();
        let extractor = Extractor::new(Arc::clone(&llm), "gpt-4o", "gpt-4o");
        let generator = DescriptionGenerator::new(llm, "gpt-4o-mini");
        let queue: Arc<dyn ingestion::JobQueue> = self.queue.clone();

        ScrapeProcessor::new(
            Arc::clone(&self.store),
            Arc::new(registry),
            Arc::new(http),
            extractor,
            generator,
            queue,
        )
    }
}

fn http_with(pages: &[(&str, String)]) -> MockHttp {
    let mut http = MockHttp::new();
    for (path, body) in pages {
        http = http.with_page(format!("{}{}", BASE, path), body.clone());
    }
    http
}

#[tokio::test]
async fn first_run_creates_dogs_and_enqueues_downstream_jobs() {
    let harness = Harness::new();
    let http = http_with(&[
        ("/psy-do-adopcji", listing(&["burek-42", "luna-7"])),
        ("/pies/burek-42", detail_page("Burek", "Wesoły piesek, kocha spacery.")),
        ("/pies/luna-7", detail_page("Luna", "Łagodna suczka.")),
    ]);

    let log = harness
        .processor(http)
        .run_scrape("promyk", None, None)
        .await
        .unwrap();

    assert_eq!(log.dogs_added, 2);
    assert_eq!(log.dogs_updated, 0);
    assert_eq!(log.dogs_removed, 0);
    assert!(log.errors.is_empty());
    assert!(log.finished_at.is_some());

    let dogs = harness.store.all_dogs();
    assert_eq!(dogs.len(), 2);
    for dog in &dogs {
        assert_eq!(dog.breed_estimates[0].breed, "mieszaniec");
        assert_eq!(dog.age_estimate.as_ref().unwrap().months, 30);
        assert_eq!(dog.fingerprint.len(), 64);
        assert_eq!(dog.status, DogStatus::Available);
    }

    let reindexes = harness.queue.jobs_of_type("search.reindex");
    assert_eq!(reindexes.len(), 2);
    for job in &reindexes {
        assert_eq!(job["v"], 1);
        assert_eq!(job["payload"]["op"], "upsert");
        assert!(job["payload"]["description"]
            .as_str()
            .unwrap()
            .starts_with("Ma na imię"));
        assert_eq!(job["payload"]["metadata"]["shelterId"], "promyk");
        // No producer trace supplied, so the key must be absent
        assert!(!job.as_object().unwrap().contains_key("parentTraceId"));
    }

    let images = harness.queue.jobs_of_type("images.processOriginal");
    assert_eq!(images.len(), 2);
    assert!(images[0]["payload"]["urls"][0]
        .as_str()
        .unwrap()
        .contains("/foto/"));

    assert!(harness.queue.jobs_of_type("photos.generate").is_empty());

    let shelter = harness.store.get_shelter("promyk").await.unwrap().unwrap();
    assert_eq!(shelter.status, ShelterStatus::Active);
    assert!(shelter.last_sync.is_some());
}

#[tokio::test]
async fn second_run_skips_unchanged_updates_changed_and_creates_new() {
    let harness = Harness::new();

    let first = http_with(&[
        ("/psy-do-adopcji", listing(&["burek-42", "luna-7"])),
        ("/pies/burek-42", detail_page("Burek", "Wesoły piesek, kocha spacery.")),
        ("/pies/luna-7", detail_page("Luna", "Łagodna suczka.")),
    ]);
    harness
        .processor(first)
        .run_scrape("promyk", None, None)
        .await
        .unwrap();
    harness.queue.take_jobs();

    // Burek unchanged, Luna's description changed, Rex is new.
    let second = http_with(&[
        ("/psy-do-adopcji", listing(&["burek-42", "luna-7", "rex-9"])),
        ("/pies/burek-42", detail_page("Burek", "Wesoły piesek, kocha spacery.")),
        ("/pies/luna-7", detail_page("Luna", "Łagodna suczka, już po sterylizacji.")),
        ("/pies/rex-9", detail_page("Rex", "Młody psiak pełen energii.")),
    ]);
    let log = harness
        .processor(second)
        .run_scrape("promyk", None, None)
        .await
        .unwrap();

    assert_eq!(log.dogs_added, 1);
    assert_eq!(log.dogs_updated, 1);
    assert_eq!(log.dogs_removed, 0);

    let reindexes = harness.queue.jobs_of_type("search.reindex");
    assert_eq!(reindexes.len(), 2);
    let texts: Vec<&str> = reindexes
        .iter()
        .map(|job| job["payload"]["description"].as_str().unwrap())
        .collect();
    assert!(texts.iter().any(|t| t.contains("Rex")));
    assert!(texts.iter().any(|t| t.contains("Luna")));
    assert!(!texts.iter().any(|t| t.contains("Burek")));
}

#[tokio::test]
async fn dogs_missing_from_the_source_are_soft_removed_and_delete_reindexed() {
    let harness = Harness::new();

    let first = http_with(&[
        ("/psy-do-adopcji", listing(&["burek-42", "luna-7"])),
        ("/pies/burek-42", detail_page("Burek", "Wesoły piesek.")),
        ("/pies/luna-7", detail_page("Luna", "Łagodna suczka.")),
    ]);
    harness
        .processor(first)
        .run_scrape("promyk", None, None)
        .await
        .unwrap();
    harness.queue.take_jobs();

    let second = http_with(&[
        ("/psy-do-adopcji", listing(&["burek-42"])),
        ("/pies/burek-42", detail_page("Burek", "Wesoły piesek.")),
    ]);
    let log = harness
        .processor(second)
        .run_scrape("promyk", None, None)
        .await
        .unwrap();

    assert_eq!(log.dogs_added, 0);
    assert_eq!(log.dogs_updated, 0);
    assert_eq!(log.dogs_removed, 1);

    let reindexes = harness.queue.jobs_of_type("search.reindex");
    assert_eq!(reindexes.len(), 1);
    assert_eq!(reindexes[0]["payload"]["op"], "delete");

    let removed: Vec<_> = harness
        .store
        .all_dogs()
        .into_iter()
        .filter(|dog| dog.status == DogStatus::Removed)
        .collect();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].external_id, "luna-7");
}

#[tokio::test]
async fn listing_failure_is_recorded_and_marks_the_shelter_errored() {
    let harness = Harness::new();
    // No pages at all: the listing fetch itself fails.
    let log = harness
        .processor(MockHttp::new())
        .run_scrape("promyk", None, None)
        .await
        .unwrap();

    assert_eq!(log.dogs_added, 0);
    assert_eq!(log.errors.len(), 1);
    assert!(log.finished_at.is_some());

    let shelter = harness.store.get_shelter("promyk").await.unwrap().unwrap();
    assert_eq!(shelter.status, ShelterStatus::Error);
    assert!(shelter.last_sync.is_none());
    assert!(harness.queue.take_jobs().is_empty());
}

#[tokio::test]
async fn consumed_scrape_job_chains_emitted_jobs_to_its_trace() {
    let harness = Harness::new();
    let http = http_with(&[
        ("/psy-do-adopcji", listing(&["burek-42"])),
        ("/pies/burek-42", detail_page("Burek", "Wesoły piesek.")),
    ]);

    let envelope = Envelope::new(
        ScrapeRunJob {
            shelter_id: "promyk".into(),
            shelter_slug: "schronisko-promyk".into(),
            base_url: BASE.into(),
        },
        "scheduler",
    );
    harness
        .processor(http)
        .handle_scrape_job(&envelope)
        .await
        .unwrap();

    let reindexes = harness.queue.jobs_of_type("search.reindex");
    assert_eq!(reindexes.len(), 1);
    assert_eq!(
        reindexes[0]["parentTraceId"].as_str().unwrap(),
        envelope.trace_id
    );
}

#[tokio::test]
async fn run_limit_caps_the_candidate_count() {
    let harness = Harness::new();
    let http = http_with(&[
        ("/psy-do-adopcji", listing(&["burek-42", "luna-7", "rex-9"])),
        ("/pies/burek-42", detail_page("Burek", "Wesoły piesek.")),
        ("/pies/luna-7", detail_page("Luna", "Łagodna suczka.")),
        ("/pies/rex-9", detail_page("Rex", "Młody psiak.")),
    ]);

    let log = harness
        .processor(http)
        .run_scrape("promyk", Some(2), None)
        .await
        .unwrap();

    assert_eq!(log.dogs_added, 2);
}

#[tokio::test]
async fn photo_extraction_backfills_dogs_without_descriptions() {
    let harness = Harness::new();
    // Detail page with a heading and photos but no content area at all.
    let bare_page = "<html><body><h1>Mru</h1>\
                     <img src=\"/foto/mru.jpg\"></body></html>";
    let http = http_with(&[
        ("/psy-do-adopcji", listing(&["mru-1"])),
        ("/pies/mru-1", bare_page.to_string()),
    ]);

    let photo_json = serde_json::json!({
        "breed_estimates": [{"breed": "husky syberyjski", "confidence": 0.55}],
        "size_estimate": {"category": "large", "confidence": 0.6},
        "colors": ["biały", "szary"]
    })
    .to_string();
    let llm = Arc::new(
        MockLanguageModel::new()
            .with_response("text_extraction", extraction_json())
            .with_response("photo_extraction", photo_json),
    );
    let harness = Harness { llm, ..harness };

    let log = harness
        .processor(http)
        .run_scrape("promyk", None, None)
        .await
        .unwrap();

    assert_eq!(log.dogs_added, 1);
    let dogs = harness.store.all_dogs();
    assert_eq!(dogs[0].breed_estimates[0].breed, "husky syberyjski");
    assert!(dogs[0].description.is_empty());
}

#[tokio::test]
async fn process_shelter_enriches_bios_and_reindexes() {
    let harness = Harness::new();
    let http = http_with(&[
        ("/psy-do-adopcji", listing(&["burek-42", "luna-7"])),
        ("/pies/burek-42", detail_page("Burek", "Wesoły piesek.")),
        ("/pies/luna-7", detail_page("Luna", "Łagodna suczka.")),
    ]);
    let processor = harness.processor(http);
    processor.run_scrape("promyk", None, None).await.unwrap();
    harness.queue.take_jobs();

    let outcome = processor
        .process_shelter("promyk", None, 2, true)
        .await
        .unwrap();

    assert_eq!(outcome.processed, 2);
    assert_eq!(outcome.updated, 2);
    assert_eq!(outcome.failed, 0);

    for dog in harness.store.all_dogs() {
        assert!(dog.bio.as_deref().unwrap().contains("dom"));
    }

    let reindexes = harness.queue.jobs_of_type("search.reindex");
    assert_eq!(reindexes.len(), 2);
    // Bio text is appended to the search document verbatim
    assert!(reindexes[0]["payload"]["description"]
        .as_str()
        .unwrap()
        .contains("Czeka na swój nowy dom"));

    let photos = harness.queue.jobs_of_type("photos.generate");
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0]["payload"]["variant"], "professional");
}
