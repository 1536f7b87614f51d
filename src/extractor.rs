use crate::constants::{EVENT_HEADLINE, EVENT_SUBTITLE, INFO_BLOCKS};
use crate::subtitle;
use crate::types::RawRecord;
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// Record-scoped extraction failure. A failure always covers the whole
/// record; partial records are never produced.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("missing_headline")]
    MissingHeadline,

    #[error("missing_subtitle")]
    MissingSubtitle,

    #[error("subtitle_grammar: {0:?}")]
    SubtitleGrammar(String),

    #[error("missing_description")]
    MissingDescription,

    #[error("missing_ticket_block")]
    MissingTicketBlock,

    #[error("missing_address_block")]
    MissingAddressBlock,

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),
}

impl ExtractError {
    /// Stable machine-readable reason code for logs and summaries.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::MissingHeadline => "missing_headline",
            Self::MissingSubtitle => "missing_subtitle",
            Self::SubtitleGrammar(_) => "subtitle_grammar",
            Self::MissingDescription => "missing_description",
            Self::MissingTicketBlock => "missing_ticket_block",
            Self::MissingAddressBlock => "missing_address_block",
            Self::Network(_) => "network",
        }
    }
}

/// Fetches one event page and parses it into a RawRecord.
pub struct Extractor {
    client: reqwest::Client,
    fetch_timeout: Duration,
}

impl Extractor {
    pub fn new(client: reqwest::Client, fetch_timeout: Duration) -> Self {
        Self {
            client,
            fetch_timeout,
        }
    }

    #[instrument(skip(self))]
    pub async fn extract(&self, city: &str, url: &str) -> Result<RawRecord, ExtractError> {
        let body = self
            .client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        extract_from_html(city, url, &body)
    }
}

/// Parses one event page's markup into a RawRecord. Pure so tests can
/// drive it with canned HTML.
pub fn extract_from_html(city: &str, url: &str, html: &str) -> Result<RawRecord, ExtractError> {
    let document = Html::parse_document(html);

    let headline_sel = Selector::parse(EVENT_HEADLINE).unwrap();
    let subtitle_sel = Selector::parse(EVENT_SUBTITLE).unwrap();
    let info_sel = Selector::parse(INFO_BLOCKS).unwrap();
    let anchor_sel = Selector::parse("a").unwrap();

    let name = document
        .select(&headline_sel)
        .next()
        .map(element_text)
        .ok_or(ExtractError::MissingHeadline)?;

    let subtitle_el = document
        .select(&subtitle_sel)
        .next()
        .ok_or(ExtractError::MissingSubtitle)?;
    let subtitle_text = element_text(subtitle_el);

    let description =
        following_paragraph(subtitle_el).ok_or(ExtractError::MissingDescription)?;

    let mut info_blocks = document.select(&info_sel);
    let ticket_block = info_blocks.next().ok_or(ExtractError::MissingTicketBlock)?;
    let address_block = info_blocks.next().ok_or(ExtractError::MissingAddressBlock)?;

    let ticket_info = element_text(ticket_block);
    let ticket_url = ticket_block
        .select(&anchor_sel)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string);

    let address = element_text(address_block);
    let address_source_url = address_block
        .select(&anchor_sel)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
        .ok_or(ExtractError::MissingAddressBlock)?;

    let parsed = subtitle::parse(&subtitle_text)
        .ok_or_else(|| ExtractError::SubtitleGrammar(subtitle_text.clone()))?;

    debug!("Extracted '{}' ({})", name, parsed.event_date);

    Ok(RawRecord {
        city: city.to_string(),
        name,
        subtitle: subtitle_text,
        description,
        ticket_info,
        ticket_url,
        address,
        address_source_url,
        event_page_url: url.to_string(),
        event_date: parsed.event_date,
        event_day: parsed.event_day,
        event_time: parsed.event_time,
        neighborhood: parsed.neighborhood,
        scraped_at: Utc::now(),
        finalized: false,
    })
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// First `p` in document order after the given element, searching its
/// following siblings and then the following siblings of each ancestor.
fn following_paragraph(element: ElementRef) -> Option<String> {
    let p_sel = Selector::parse("p").unwrap();
    let mut current = Some(*element);

    while let Some(node) = current {
        for sibling in node.next_siblings() {
            if let Some(sibling_el) = ElementRef::wrap(sibling) {
                if sibling_el.value().name() == "p" {
                    return Some(element_text(sibling_el));
                }
                if let Some(nested) = sibling_el.select(&p_sel).next() {
                    return Some(element_text(nested));
                }
            }
        }
        current = node.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    const URL: &str = "https://www.blocosderua.com/rio-de-janeiro/programacao/bloco-x/";

    fn page(subtitle: &str, info_blocks: &str) -> String {
        format!(
            r#"<html><body>
                <h1 class="text-secondary h2 text-center">Bloco da Esquina</h1>
                <div>
                    <h2 class="card-text text-white h6 text-center text-default">{subtitle}</h2>
                    <p>Concentração na praça, saída às 15h.</p>
                </div>
                {info_blocks}
            </body></html>"#
        )
    }

    const INFO: &str = r#"
        <h6>Gratuito <a href="https://tickets.example/bloco-x">ingressos</a></h6>
        <h6>Rua da Carioca, 10 <a href="https://maps.example/?q=rua+da+carioca+10">mapa</a></h6>"#;

    #[test]
    fn extracts_full_record() {
        let html = page("14/02/2026 - Sábado - 15:00 Copacabana", INFO);
        let record = extract_from_html("rio-de-janeiro", URL, &html).unwrap();

        assert_eq!(record.name, "Bloco da Esquina");
        assert_eq!(record.event_date, NaiveDate::from_ymd_opt(2026, 2, 14).unwrap());
        assert_eq!(record.event_day, "Sábado");
        assert_eq!(record.event_time, NaiveTime::from_hms_opt(15, 0, 0).unwrap());
        assert_eq!(record.neighborhood, "Copacabana");
        assert_eq!(record.description, "Concentração na praça, saída às 15h.");
        assert_eq!(record.ticket_url.as_deref(), Some("https://tickets.example/bloco-x"));
        assert_eq!(record.address, "Rua da Carioca, 10 mapa");
        assert_eq!(
            record.address_source_url,
            "https://maps.example/?q=rua+da+carioca+10"
        );
        assert_eq!(record.event_page_url, URL);
        assert!(!record.finalized);
    }

    #[test]
    fn missing_headline_is_typed() {
        let html = r#"<html><body><p>nada aqui</p></body></html>"#;
        let err = extract_from_html("rio-de-janeiro", URL, html).unwrap_err();
        assert_eq!(err.reason_code(), "missing_headline");
    }

    #[test]
    fn missing_ticket_block_is_typed() {
        let html = page("14/02/2026 - Sábado - 15:00 Copacabana", "");
        let err = extract_from_html("rio-de-janeiro", URL, &html).unwrap_err();
        assert_eq!(err.reason_code(), "missing_ticket_block");
    }

    #[test]
    fn address_block_requires_source_link() {
        let info = r#"
            <h6>Gratuito</h6>
            <h6>Rua da Carioca, 10</h6>"#;
        let html = page("14/02/2026 - Sábado - 15:00 Copacabana", info);
        let err = extract_from_html("rio-de-janeiro", URL, &html).unwrap_err();
        assert_eq!(err.reason_code(), "missing_address_block");
    }

    #[test]
    fn bad_subtitle_grammar_is_typed() {
        let html = page("Programação em breve", INFO);
        let err = extract_from_html("rio-de-janeiro", URL, &html).unwrap_err();
        assert_eq!(err.reason_code(), "subtitle_grammar");
    }

    #[test]
    fn ticket_link_is_optional() {
        let info = r#"
            <h6>Gratuito</h6>
            <h6>Rua da Carioca, 10 <a href="https://maps.example/?q=x">mapa</a></h6>"#;
        let html = page("14/02/2026 - Sábado - 15:00 Copacabana", info);
        let record = extract_from_html("rio-de-janeiro", URL, &html).unwrap();
        assert!(record.ticket_url.is_none());
    }
}
