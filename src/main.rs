use clap::{Parser, Subcommand};
use tracing::error;

mod config;
mod constants;
mod crawler;
mod error;
mod extractor;
mod geocoder;
mod listing;
mod logging;
mod pipeline;
mod storage;
mod subtitle;
mod types;

use crate::config::Config;
use crate::geocoder::{Geocode, GoogleGeocoder};
use crate::pipeline::{Pipeline, PipelineResult};
use crate::storage::{InMemoryStore, Store};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "bloco_scraper")]
#[command(about = "Street-carnival bloco listings scraper and geocoding pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover new event pages and extract raw records
    Crawl,
    /// Geocode unfinalized raw records and recompute city aggregates
    Finalize,
    /// Run the full pipeline (crawl + finalize + aggregates)
    Run,
    /// Re-parse stored subtitles and fix drifted neighborhood fields
    Repair,
    /// Print the current listing as JSON
    Listing,
}

fn print_summary(result: &PipelineResult) {
    println!("\n📊 Pipeline results:");
    println!("   Discovered: {}", result.discovered);
    println!("   Extracted: {}", result.extracted);
    println!("   Finalized: {}", result.finalized);
    println!("   Geocode misses: {}", result.geocode_misses);
    println!("   Cities aggregated: {}", result.cities_aggregated);

    if !result.extract_failures.is_empty() {
        println!("\n⚠️  Extraction failures:");
        for failure in &result.extract_failures {
            println!("   - {failure}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let geocoder: Arc<dyn Geocode> = Arc::new(GoogleGeocoder::new(
        reqwest::Client::new(),
        Config::geocoding_api_key()?,
    ));
    let pipeline = Pipeline::new(config, store.clone(), geocoder)?;

    match cli.command {
        Commands::Crawl => {
            println!("🔄 Running crawl stage...");
            match pipeline.crawl().await {
                Ok(result) => print_summary(&result),
                Err(e) => error!("Crawl failed: {}", e),
            }
        }
        Commands::Finalize => {
            println!("🌍 Running geocode+finalize stage...");
            match pipeline.geocode_and_finalize().await {
                Ok((finalized, misses)) => {
                    pipeline.recompute_city_aggregates().await?;
                    println!("✅ Finalized {finalized} records ({misses} geocode misses)");
                }
                Err(e) => error!("Finalize failed: {}", e),
            }
        }
        Commands::Run => {
            println!("🚀 Running full pipeline...");
            match pipeline.run().await {
                Ok(result) => print_summary(&result),
                Err(e) => error!("Pipeline failed: {}", e),
            }
        }
        Commands::Repair => {
            println!("🔧 Running neighborhood repair pass...");
            let updated = pipeline.repair_neighborhoods().await?;
            println!("✅ {updated} records corrected");
        }
        Commands::Listing => {
            let full = listing::full_listing(store.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&full)?);
        }
    }
    Ok(())
}
