use crate::error::Result;
use crate::types::{CityAggregate, FinalRecord, RawRecord};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Storage interface the pipeline writes to and the listing layer reads
/// from. The persistence engine behind it is out of scope; records are
/// keyed by their event-page URL throughout.
#[async_trait]
pub trait Store: Send + Sync {
    // Raw record operations
    async fn raw_exists(&self, url: &str) -> Result<bool>;
    async fn raw_upsert(&self, record: &RawRecord) -> Result<()>;
    async fn raw_urls(&self) -> Result<HashSet<String>>;
    async fn raw_unfinalized(&self) -> Result<Vec<RawRecord>>;
    async fn raw_mark_finalized(&self, url: &str) -> Result<()>;

    // Final record operations
    async fn final_insert(&self, record: &FinalRecord) -> Result<()>;
    async fn final_all(&self) -> Result<Vec<FinalRecord>>;
    async fn final_update_neighborhood(&self, url: &str, neighborhood: &str) -> Result<()>;

    // City aggregate operations
    async fn city_aggregate_upsert(
        &self,
        city: &str,
        avg_latitude: f64,
        avg_longitude: f64,
    ) -> Result<(CityAggregate, bool)>;
    async fn city_aggregates(&self) -> Result<Vec<CityAggregate>>;
}

/// In-memory store for development and testing.
pub struct InMemoryStore {
    raw: Arc<Mutex<HashMap<String, RawRecord>>>,
    finals: Arc<Mutex<HashMap<String, FinalRecord>>>,
    aggregates: Arc<Mutex<HashMap<String, CityAggregate>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            raw: Arc::new(Mutex::new(HashMap::new())),
            finals: Arc::new(Mutex::new(HashMap::new())),
            aggregates: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn raw_exists(&self, url: &str) -> Result<bool> {
        let raw = self.raw.lock().unwrap();
        Ok(raw.contains_key(url))
    }

    async fn raw_upsert(&self, record: &RawRecord) -> Result<()> {
        let mut raw = self.raw.lock().unwrap();
        raw.insert(record.event_page_url.clone(), record.clone());
        debug!("Upserted raw record: {}", record.event_page_url);
        Ok(())
    }

    async fn raw_urls(&self) -> Result<HashSet<String>> {
        let raw = self.raw.lock().unwrap();
        Ok(raw.keys().cloned().collect())
    }

    async fn raw_unfinalized(&self) -> Result<Vec<RawRecord>> {
        let raw = self.raw.lock().unwrap();
        let mut unfinalized: Vec<RawRecord> = raw
            .values()
            .filter(|record| !record.finalized)
            .cloned()
            .collect();
        // Drain in scrape order so retries keep a stable sequence
        unfinalized.sort_by(|a, b| a.scraped_at.cmp(&b.scraped_at));
        Ok(unfinalized)
    }

    async fn raw_mark_finalized(&self, url: &str) -> Result<()> {
        let mut raw = self.raw.lock().unwrap();
        if let Some(record) = raw.get_mut(url) {
            record.finalized = true;
            debug!("Marked raw record finalized: {}", url);
        }
        Ok(())
    }

    async fn final_insert(&self, record: &FinalRecord) -> Result<()> {
        let mut finals = self.finals.lock().unwrap();
        finals.insert(record.event_page_url.clone(), record.clone());
        debug!("Inserted final record: {}", record.event_page_url);
        Ok(())
    }

    async fn final_all(&self) -> Result<Vec<FinalRecord>> {
        let finals = self.finals.lock().unwrap();
        Ok(finals.values().cloned().collect())
    }

    async fn final_update_neighborhood(&self, url: &str, neighborhood: &str) -> Result<()> {
        let mut finals = self.finals.lock().unwrap();
        if let Some(record) = finals.get_mut(url) {
            record.neighborhood = neighborhood.to_string();
            debug!("Updated neighborhood for {}", url);
        }
        Ok(())
    }

    async fn city_aggregate_upsert(
        &self,
        city: &str,
        avg_latitude: f64,
        avg_longitude: f64,
    ) -> Result<(CityAggregate, bool)> {
        let mut aggregates = self.aggregates.lock().unwrap();
        let aggregate = CityAggregate {
            city: city.to_string(),
            avg_latitude,
            avg_longitude,
        };
        let created = aggregates
            .insert(city.to_string(), aggregate.clone())
            .is_none();
        Ok((aggregate, created))
    }

    async fn city_aggregates(&self) -> Result<Vec<CityAggregate>> {
        let aggregates = self.aggregates.lock().unwrap();
        let mut rows: Vec<CityAggregate> = aggregates.values().cloned().collect();
        rows.sort_by(|a, b| a.city.cmp(&b.city));
        Ok(rows)
    }
}
