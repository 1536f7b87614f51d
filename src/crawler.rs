use crate::constants::{
    CITY_SELECT_OPTIONS, DEFAULT_CITY_SLUG, EVENT_CARD_LINKS, LISTING_BUTTON_LINKS,
    PROGRAMME_PATH_MARKER,
};
use crate::error::Result;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Walks the site's city index and per-city paginated listings to find
/// event-page URLs that have not been seen before.
pub struct Crawler {
    client: reqwest::Client,
    base_url: String,
}

impl Crawler {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Discovers event-page URLs across all cities, excluding `known`.
    /// A failure on the root or on one city's listing empties only the
    /// affected scope; discovery itself never fails.
    #[instrument(skip(self, known))]
    pub async fn discover_new_urls(&self, known: &HashSet<String>) -> Vec<(String, String)> {
        let city_urls = match self.city_urls().await {
            Ok(urls) => urls,
            Err(e) => {
                warn!("Failed to fetch city index from {}: {}", self.base_url, e);
                return Vec::new();
            }
        };
        info!("Found {} city listings", city_urls.len());

        let mut discovered = Vec::new();
        for city_url in &city_urls {
            let city = city_slug(city_url, &self.base_url);
            let event_urls = self.city_event_urls(city_url).await;
            let new_urls: Vec<String> = event_urls
                .into_iter()
                .filter(|url| !known.contains(url))
                .collect();
            debug!("{}: {} new event pages", city, new_urls.len());
            discovered.extend(new_urls.into_iter().map(|url| (city.clone(), url)));
        }

        info!("{} new event pages discovered", discovered.len());
        discovered
    }

    /// Per-city base URLs from the root page's city selector, plus the
    /// root itself as the default-city entry.
    async fn city_urls(&self) -> Result<Vec<String>> {
        let body = self.fetch(&self.base_url).await?;
        let mut urls = parse_city_options(&body);
        urls.push(self.base_url.clone());
        Ok(urls)
    }

    /// All event-page URLs for one city, walking its paginated listing.
    async fn city_event_urls(&self, city_url: &str) -> Vec<String> {
        let listing_url = match self.listing_url(city_url).await {
            Some(url) => url,
            None => {
                warn!("No listing page resolved for {}", city_url);
                return Vec::new();
            }
        };

        let mut event_urls = Vec::new();
        let mut page = 1u32;
        loop {
            let page_url = format!("{listing_url}?paged={page}&data=&bairro=");
            let body = match self.fetch(&page_url).await {
                Ok(body) => body,
                Err(e) => {
                    // Indistinguishable from a genuine end-of-list; warn so
                    // under-discovery is visible in logs.
                    warn!("{}: pagination stopped on HTTP error at page {}: {}", city_url, page, e);
                    break;
                }
            };

            let links = parse_event_card_links(&body);
            if links.is_empty() {
                debug!("{}: listing exhausted at page {}", city_url, page);
                break;
            }

            event_urls.extend(links);
            page += 1;
        }

        event_urls
    }

    /// Resolves a city's canonical "view all" listing page.
    async fn listing_url(&self, city_url: &str) -> Option<String> {
        match self.fetch(city_url).await {
            Ok(body) => parse_listing_link(&body, city_url),
            Err(e) => {
                warn!("Failed to fetch city page {}: {}", city_url, e);
                None
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Derives a city slug from a city URL: the path segment before the
/// trailing slash, with the site root mapped to the default city.
pub fn city_slug(city_url: &str, base_url: &str) -> String {
    if city_url == base_url {
        return DEFAULT_CITY_SLUG.to_string();
    }
    let segment = city_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    if segment.is_empty() || segment.contains("www") {
        DEFAULT_CITY_SLUG.to_string()
    } else {
        segment.to_string()
    }
}

fn parse_city_options(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(CITY_SELECT_OPTIONS).unwrap();
    document
        .select(&selector)
        .filter_map(|option| option.value().attr("value"))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_listing_link(html: &str, city_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(LISTING_BUTTON_LINKS).unwrap();
    document
        .select(&selector)
        .filter_map(|link| link.value().attr("href"))
        .find(|href| href.contains(city_url))
        .map(str::to_string)
}

fn parse_event_card_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(EVENT_CARD_LINKS).unwrap();
    document
        .select(&selector)
        .filter_map(|link| link.value().attr("href"))
        .filter(|href| href.contains(PROGRAMME_PATH_MARKER))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.blocosderua.com/";

    #[test]
    fn parses_city_options_skipping_empty_values() {
        let html = r#"
            <select class="dms-select">
                <option value="">Escolha a cidade</option>
                <option value="https://www.blocosderua.com/rio-de-janeiro/">Rio</option>
                <option value="https://www.blocosderua.com/belo-horizonte/">BH</option>
            </select>"#;
        let urls = parse_city_options(html);
        assert_eq!(
            urls,
            vec![
                "https://www.blocosderua.com/rio-de-janeiro/",
                "https://www.blocosderua.com/belo-horizonte/",
            ]
        );
    }

    #[test]
    fn listing_link_must_match_city_url() {
        let html = r#"
            <a class="btn" href="https://www.blocosderua.com/outra/ver-tudo/">outra</a>
            <a class="btn" href="https://www.blocosderua.com/rio-de-janeiro/ver-tudo/">ver tudo</a>"#;
        let link = parse_listing_link(html, "https://www.blocosderua.com/rio-de-janeiro/");
        assert_eq!(
            link.as_deref(),
            Some("https://www.blocosderua.com/rio-de-janeiro/ver-tudo/")
        );
    }

    #[test]
    fn event_cards_filtered_by_programme_marker() {
        let html = r#"
            <a class="card" href="https://www.blocosderua.com/rio-de-janeiro/programacao/bloco-x/">x</a>
            <a class="card" href="https://www.blocosderua.com/sobre/">sobre</a>"#;
        let links = parse_event_card_links(html);
        assert_eq!(
            links,
            vec!["https://www.blocosderua.com/rio-de-janeiro/programacao/bloco-x/"]
        );
    }

    #[test]
    fn city_slug_from_path_segment() {
        assert_eq!(
            city_slug("https://www.blocosderua.com/rio-de-janeiro/", BASE),
            "rio-de-janeiro"
        );
    }

    #[test]
    fn root_url_maps_to_default_city() {
        assert_eq!(city_slug(BASE, BASE), DEFAULT_CITY_SLUG);
    }
}
