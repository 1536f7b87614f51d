use crate::config::Config;
use crate::crawler::Crawler;
use crate::error::Result;
use crate::extractor::Extractor;
use crate::geocoder::Geocode;
use crate::storage::Store;
use crate::subtitle;
use crate::types::FinalRecord;
use futures::{stream, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Summary of a complete pipeline run.
#[derive(Debug, Default, Serialize)]
pub struct PipelineResult {
    pub discovered: usize,
    pub extracted: usize,
    pub extract_failures: Vec<String>,
    pub finalized: usize,
    pub geocode_misses: usize,
    pub cities_aggregated: usize,
}

/// Coordinates the full run: discover new event pages, fan out
/// fetch+extract, sequentially geocode and finalize, then recompute the
/// per-city aggregates. Each stage completes before the next begins.
pub struct Pipeline {
    config: Config,
    store: Arc<dyn Store>,
    geocoder: Arc<dyn Geocode>,
    client: reqwest::Client,
}

impl Pipeline {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        geocoder: Arc<dyn Geocode>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_seconds))
            .build()?;
        Ok(Self {
            config,
            store,
            geocoder,
            client,
        })
    }

    /// Runs all four stages in order.
    pub async fn run(&self) -> Result<PipelineResult> {
        let mut result = self.crawl().await?;
        let (finalized, geocode_misses) = self.geocode_and_finalize().await?;
        result.finalized = finalized;
        result.geocode_misses = geocode_misses;
        result.cities_aggregated = self.recompute_city_aggregates().await?;
        Ok(result)
    }

    /// Stages 1 and 2: discovery plus the bounded fetch+extract fan-out.
    /// Extraction failures are dropped for this run; the URLs stay
    /// undiscovered and are retried on the next run.
    #[instrument(skip(self))]
    pub async fn crawl(&self) -> Result<PipelineResult> {
        info!("🔎 Discovering new event pages...");
        let known = self.store.raw_urls().await?;
        let crawler = Crawler::new(self.client.clone(), self.config.base_url.clone());
        let discovered = crawler.discover_new_urls(&known).await;

        let mut result = PipelineResult {
            discovered: discovered.len(),
            ..Default::default()
        };

        info!("📡 Fetching {} event pages...", discovered.len());
        let extractor = Extractor::new(
            self.client.clone(),
            Duration::from_secs(self.config.fetch_timeout_seconds),
        );
        let extractor = &extractor;

        let mut extractions = stream::iter(discovered)
            .map(|(city, url)| async move {
                let extraction = extractor.extract(&city, &url).await;
                (url, extraction)
            })
            .buffer_unordered(self.config.fetch_concurrency.max(1));

        while let Some((url, extraction)) = extractions.next().await {
            match extraction {
                Ok(record) => {
                    if let Err(e) = self.store.raw_upsert(&record).await {
                        warn!("Failed to persist raw record for {}: {}", url, e);
                        result.extract_failures.push(format!("{url}: persistence"));
                    } else {
                        result.extracted += 1;
                    }
                }
                Err(e) => {
                    warn!("Extraction failed for {}: {}", url, e);
                    result
                        .extract_failures
                        .push(format!("{url}: {}", e.reason_code()));
                }
            }
        }

        info!(
            "✅ Extracted {} records ({} failures)",
            result.extracted,
            result.extract_failures.len()
        );
        Ok(result)
    }

    /// Stage 3: sequentially drain unfinalized raw records through the
    /// geocoder, honoring the inter-call throttle, and persist the
    /// finalized records. Returns (finalized, geocode misses).
    #[instrument(skip(self))]
    pub async fn geocode_and_finalize(&self) -> Result<(usize, usize)> {
        let unfinalized = self.store.raw_unfinalized().await?;
        if unfinalized.is_empty() {
            info!("No unfinalized records to geocode");
            return Ok((0, 0));
        }
        info!("🌍 Geocoding {} records...", unfinalized.len());

        let delay = Duration::from_secs(self.config.geocode_delay_seconds);
        let mut finalized = 0;
        let mut misses = 0;

        for (i, raw) in unfinalized.iter().enumerate() {
            // Throttle strictly between successive calls
            if i > 0 {
                tokio::time::sleep(delay).await;
            }

            let address = format!(
                "{}, {}, {}",
                self.config.country,
                raw.city.replace('-', " "),
                raw.address
            );
            let coords = self.geocoder.geocode(&address).await;
            if coords.is_none() {
                warn!("No coordinates for '{}' ({})", address, raw.event_page_url);
                misses += 1;
            }

            let final_record = FinalRecord::from_raw(raw, coords);

            // Insert before marking: an insert failure leaves the raw
            // record unfinalized so the next run retries it, and the
            // finalized flag can never exist without its FinalRecord.
            if let Err(e) = self.store.final_insert(&final_record).await {
                error!("Failed to persist final record {}: {}", raw.event_page_url, e);
                continue;
            }
            if let Err(e) = self.store.raw_mark_finalized(&raw.event_page_url).await {
                error!("Failed to mark {} finalized: {}", raw.event_page_url, e);
                continue;
            }
            finalized += 1;
        }

        info!("✅ Finalized {} records ({} geocode misses)", finalized, misses);
        Ok((finalized, misses))
    }

    /// Stage 4: full recompute of the per-city bounding-box midpoints.
    /// Cheap and idempotent, so it runs unconditionally every run.
    #[instrument(skip(self))]
    pub async fn recompute_city_aggregates(&self) -> Result<usize> {
        let finals = self.store.final_all().await?;

        // (min_lat, max_lat, min_lon, max_lon) per city
        let mut boxes: HashMap<String, (f64, f64, f64, f64)> = HashMap::new();
        for record in &finals {
            if let Some((lat, lon)) = record.coordinates() {
                boxes
                    .entry(record.city.clone())
                    .and_modify(|(min_lat, max_lat, min_lon, max_lon)| {
                        *min_lat = min_lat.min(lat);
                        *max_lat = max_lat.max(lat);
                        *min_lon = min_lon.min(lon);
                        *max_lon = max_lon.max(lon);
                    })
                    .or_insert((lat, lat, lon, lon));
            }
        }

        for (city, (min_lat, max_lat, min_lon, max_lon)) in &boxes {
            let avg_latitude = (min_lat + max_lat) / 2.0;
            let avg_longitude = (min_lon + max_lon) / 2.0;
            let (_, created) = self
                .store
                .city_aggregate_upsert(city, avg_latitude, avg_longitude)
                .await?;
            if created {
                info!("📍 City added: {} ({}, {})", city, avg_latitude, avg_longitude);
            } else {
                info!("🔄 City updated: {} ({}, {})", city, avg_latitude, avg_longitude);
            }
        }

        Ok(boxes.len())
    }

    /// Idempotent repair pass: re-parse every final record's stored
    /// subtitle with the canonical grammar and rewrite the neighborhood
    /// where it disagrees. Returns the number of records corrected.
    #[instrument(skip(self))]
    pub async fn repair_neighborhoods(&self) -> Result<usize> {
        let finals = self.store.final_all().await?;
        let mut updated = 0;

        for record in &finals {
            if let Some(parsed) = subtitle::parse(&record.subtitle) {
                if parsed.neighborhood != record.neighborhood {
                    self.store
                        .final_update_neighborhood(&record.event_page_url, &parsed.neighborhood)
                        .await?;
                    updated += 1;
                }
            }
        }

        info!("🔧 Repaired {} neighborhood fields", updated);
        Ok(updated)
    }
}
