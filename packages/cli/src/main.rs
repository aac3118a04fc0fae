//! Operational CLI for the ingestion pipeline.
//!
//! Thin boundary over the library: `list` registered shelters, `run` one
//! scrape, `process` AI re-enrichment. Any unhandled failure prints its
//! full cause chain and exits non-zero.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ingestion::adapters::AdapterRegistry;
use ingestion::ai::{DescriptionGenerator, Extractor};
use ingestion::processor::ScrapeProcessor;
use ingestion::queue::TracingQueue;
use ingestion::store::MemoryStore;
use ingestion::{Config, ReqwestHttp};
use openai_client::OpenAIClient;

#[derive(Parser)]
#[command(name = "shelterhub", about = "Shelter ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered shelters
    List,

    /// Run one scrape for a shelter
    Run {
        /// Registry id of the shelter
        shelter_id: String,

        /// Cap the number of processed listings
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Re-run AI enrichment over a shelter's stored dogs
    Process {
        /// Registry id of the shelter
        shelter_id: String,

        /// Cap the number of processed dogs
        #[arg(long)]
        limit: Option<usize>,

        /// Concurrent enrichment workers
        #[arg(long, default_value_t = 3)]
        concurrency: usize,

        /// Also enqueue photo generation jobs
        #[arg(long)]
        generate_photos: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let registry = Arc::new(AdapterRegistry::with_defaults());

    match cli.command {
        Command::List => {
            for info in registry.list() {
                println!("{:<12} {}", info.id, info.name);
            }
            Ok(())
        }
        Command::Run { shelter_id, limit } => {
            let processor = build_processor(&config, Arc::clone(&registry))?;
            let log = processor.run_scrape(&shelter_id, limit, None).await?;

            println!(
                "{}: +{} ~{} -{}",
                shelter_id, log.dogs_added, log.dogs_updated, log.dogs_removed
            );
            for error in &log.errors {
                eprintln!("  error: {}", error);
            }
            Ok(())
        }
        Command::Process {
            shelter_id,
            limit,
            concurrency,
            generate_photos,
        } => {
            let processor = build_processor(&config, Arc::clone(&registry))?;
            let outcome = processor
                .process_shelter(&shelter_id, limit, concurrency, generate_photos)
                .await?;

            println!(
                "{}: processed {} updated {} failed {}",
                shelter_id, outcome.processed, outcome.updated, outcome.failed
            );
            Ok(())
        }
    }
}

fn build_processor(
    config: &Config,
    registry: Arc<AdapterRegistry>,
) -> Result<ScrapeProcessor<MemoryStore>> {
    let api_key = config
        .openai_api_key
        .clone()
        .context("OPENAI_API_KEY is required for this command")?;
    let llm: Arc<dyn ingestion::LanguageModel> = Arc::new(OpenAIClient::new(api_key));

    let extractor = Extractor::new(
        Arc::clone(&llm),
        config.text_model.clone(),
        config.photo_model.clone(),
    );
    let generator = DescriptionGenerator::new(llm, config.bio_model.clone());

    let store = Arc::new(MemoryStore::new().with_shelters(registry.shelters()));
    let http = Arc::new(ReqwestHttp::new().context("failed to build HTTP client")?);

    Ok(ScrapeProcessor::new(
        store,
        registry,
        http,
        extractor,
        generator,
        Arc::new(TracingQueue),
    ))
}
