use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Decomposed subtitle line. The site composes subtitles as
/// `DD/MM/YYYY - <weekday> - HH:MM <neighborhood free text>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Subtitle {
    pub event_date: NaiveDate,
    pub event_day: String,
    pub event_time: NaiveTime,
    pub neighborhood: String,
}

// Anchoring on the HH:MM token keeps the split stable when the
// weekday or neighborhood text itself contains a hyphen.
static GRAMMAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2}/\d{2}/\d{4}) - (.*?) - (\d{2}:\d{2})\s*(.*)$").unwrap());

/// Parses a subtitle line against the three-part grammar. Returns `None`
/// when the line does not match or the date/time tokens are not a real
/// calendar date or clock time.
pub fn parse(subtitle: &str) -> Option<Subtitle> {
    let caps = GRAMMAR.captures(subtitle.trim())?;

    let event_date = NaiveDate::parse_from_str(&caps[1], "%d/%m/%Y").ok()?;
    let event_time = NaiveTime::parse_from_str(&caps[3], "%H:%M").ok()?;

    Some(Subtitle {
        event_date,
        event_day: caps[2].trim().to_string(),
        event_time,
        neighborhood: caps[4].trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_subtitle() {
        let parsed = parse("14/02/2026 - Sábado - 15:00 Copacabana").unwrap();
        assert_eq!(parsed.event_date, NaiveDate::from_ymd_opt(2026, 2, 14).unwrap());
        assert_eq!(parsed.event_day, "Sábado");
        assert_eq!(parsed.event_time, NaiveTime::from_hms_opt(15, 0, 0).unwrap());
        assert_eq!(parsed.neighborhood, "Copacabana");
    }

    #[test]
    fn neighborhood_is_trimmed_remainder() {
        let parsed = parse("01/03/2026 - Domingo - 09:30   Santa Teresa ").unwrap();
        assert_eq!(parsed.neighborhood, "Santa Teresa");
    }

    #[test]
    fn tolerates_hyphen_in_weekday_text() {
        let parsed = parse("21/02/2026 - Sexta-feira - 18:00 Centro").unwrap();
        assert_eq!(parsed.event_day, "Sexta-feira");
        assert_eq!(parsed.neighborhood, "Centro");
    }

    #[test]
    fn tolerates_hyphen_in_neighborhood_text() {
        let parsed = parse("21/02/2026 - Sexta-feira - 18:00 Barra-Funda").unwrap();
        assert_eq!(parsed.neighborhood, "Barra-Funda");
    }

    #[test]
    fn empty_neighborhood_is_allowed() {
        let parsed = parse("21/02/2026 - Sexta - 18:00").unwrap();
        assert_eq!(parsed.neighborhood, "");
    }

    #[test]
    fn rejects_missing_time_token() {
        assert!(parse("14/02/2026 - Sábado - Copacabana").is_none());
    }

    #[test]
    fn rejects_impossible_date() {
        assert!(parse("31/02/2026 - Sábado - 15:00 Copacabana").is_none());
    }

    #[test]
    fn rejects_free_text() {
        assert!(parse("Programação em breve").is_none());
    }
}
