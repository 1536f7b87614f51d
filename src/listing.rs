use crate::error::Result;
use crate::storage::Store;
use crate::types::{CityAggregate, FinalRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

/// Everything the map view needs on first load: all records ordered by
/// event date, the per-city default centers, and the filter facets.
#[derive(Debug, Serialize)]
pub struct FullListing {
    pub records: Vec<FinalRecord>,
    pub city_aggregates: Vec<CityAggregate>,
    pub cities: Vec<String>,
    pub dates: Vec<NaiveDate>,
}

/// Optional equality filters, AND-combined.
#[derive(Debug, Default, Clone)]
pub struct RecordFilter {
    pub city: Option<String>,
    pub date: Option<NaiveDate>,
    pub neighborhood: Option<String>,
}

/// A filtered record set plus the facets still available inside it, for
/// progressive filter narrowing in the UI.
#[derive(Debug, Serialize)]
pub struct FilteredListing {
    pub records: Vec<FinalRecord>,
    pub dates: Vec<NaiveDate>,
    pub neighborhoods: Vec<String>,
}

pub async fn full_listing(store: &dyn Store) -> Result<FullListing> {
    let mut records = store.final_all().await?;
    records.sort_by(|a, b| a.event_date.cmp(&b.event_date).then(a.name.cmp(&b.name)));

    let cities: BTreeSet<String> = records.iter().map(|r| r.city.clone()).collect();
    let dates: BTreeSet<NaiveDate> = records.iter().map(|r| r.event_date).collect();

    Ok(FullListing {
        city_aggregates: store.city_aggregates().await?,
        cities: cities.into_iter().collect(),
        dates: dates.into_iter().collect(),
        records,
    })
}

pub async fn filtered(store: &dyn Store, filter: &RecordFilter) -> Result<FilteredListing> {
    let mut records: Vec<FinalRecord> = store
        .final_all()
        .await?
        .into_iter()
        .filter(|r| filter.city.as_deref().map_or(true, |c| c == r.city))
        .filter(|r| filter.date.map_or(true, |d| d == r.event_date))
        .filter(|r| {
            filter
                .neighborhood
                .as_deref()
                .map_or(true, |n| n == r.neighborhood)
        })
        .collect();
    records.sort_by(|a, b| a.event_date.cmp(&b.event_date).then(a.name.cmp(&b.name)));

    let dates: BTreeSet<NaiveDate> = records.iter().map(|r| r.event_date).collect();
    let neighborhoods: BTreeSet<String> =
        records.iter().map(|r| r.neighborhood.clone()).collect();

    Ok(FilteredListing {
        records,
        dates: dates.into_iter().collect(),
        neighborhoods: neighborhoods.into_iter().collect(),
    })
}
