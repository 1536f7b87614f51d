/// Site and selector constants shared across crawler and extractor.
/// Selector strings live here so the fragile coupling to the site's
/// markup is visible in one place.

/// Directory site root. Also serves as the "default city" listing.
pub const DEFAULT_BASE_URL: &str = "https://www.blocosderua.com/";

/// City slug used for event pages reached from the site root.
pub const DEFAULT_CITY_SLUG: &str = "sao-paulo";

/// Path marker that distinguishes event-page links from other cards.
pub const PROGRAMME_PATH_MARKER: &str = "programacao/";

// CSS selectors, taken from the site's markup.
pub const CITY_SELECT_OPTIONS: &str = "select.dms-select option";
pub const LISTING_BUTTON_LINKS: &str = "a.btn";
pub const EVENT_CARD_LINKS: &str = "a.card";
pub const EVENT_HEADLINE: &str = "h1.text-secondary.h2.text-center";
pub const EVENT_SUBTITLE: &str = "h2.card-text.text-white.h6.text-center.text-default";
pub const INFO_BLOCKS: &str = "h6";
