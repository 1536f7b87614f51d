use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// One scraped event, pre-normalization. The event page URL is the
/// natural key; a record is immutable once finalized except for the
/// flag itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub city: String,
    pub name: String,
    /// Raw composite line: `DD/MM/YYYY - <weekday> - HH:MM <neighborhood>`.
    pub subtitle: String,
    pub description: String,
    pub ticket_info: String,
    pub ticket_url: Option<String>,
    pub address: String,
    pub address_source_url: String,
    pub event_page_url: String,
    pub event_date: NaiveDate,
    pub event_day: String,
    pub event_time: NaiveTime,
    pub neighborhood: String,
    pub scraped_at: DateTime<Utc>,
    pub finalized: bool,
}

/// Normalized, geocode-enriched event derived 1:1 from a RawRecord.
/// Coordinates are both present or both absent, never one of the pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalRecord {
    pub city: String,
    pub name: String,
    pub subtitle: String,
    pub description: String,
    pub ticket_info: String,
    pub ticket_url: Option<String>,
    pub address: String,
    pub address_source_url: String,
    /// Back-reference to the RawRecord this was derived from.
    pub event_page_url: String,
    pub event_date: NaiveDate,
    pub event_day: String,
    pub event_time: NaiveTime,
    pub neighborhood: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl FinalRecord {
    /// Builds the normalized record from its raw source, attaching the
    /// geocoded coordinate pair when one was resolved.
    pub fn from_raw(raw: &RawRecord, coords: Option<(f64, f64)>) -> Self {
        let (latitude, longitude) = match coords {
            Some((lat, lon)) => (Some(lat), Some(lon)),
            None => (None, None),
        };
        Self {
            city: raw.city.clone(),
            name: raw.name.clone(),
            subtitle: raw.subtitle.clone(),
            description: raw.description.clone(),
            ticket_info: raw.ticket_info.clone(),
            ticket_url: raw.ticket_url.clone(),
            address: raw.address.clone(),
            address_source_url: raw.address_source_url.clone(),
            event_page_url: raw.event_page_url.clone(),
            event_date: raw.event_date,
            event_day: raw.event_day.clone(),
            event_time: raw.event_time,
            neighborhood: raw.neighborhood.clone(),
            latitude,
            longitude,
            updated_at: Utc::now(),
        }
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Per-city map default center: the bounding-box midpoint `(min+max)/2`
/// of the city's geocoded records. Not a centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityAggregate {
    pub city: String,
    pub avg_latitude: f64,
    pub avg_longitude: f64,
}
