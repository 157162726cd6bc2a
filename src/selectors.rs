// src/selectors.rs
//! CSS selectors for the webscraper.io e-commerce test-site layout.

use scraper::Selector;
use std::sync::LazyLock;

fn css(raw: &str) -> Selector {
    Selector::parse(raw).unwrap_or_else(|e| panic!("invalid selector {raw:?}: {e}"))
}

/// Selectors evaluated against fetched or rendered listing markup.
pub mod listing {
    use super::*;

    /// One catalog entry (product card).
    pub static ENTRY: LazyLock<Selector> = LazyLock::new(|| css(".thumbnail"));

    /// Title link. Full title in its `title` attribute, detail link in `href`.
    pub static TITLE: LazyLock<Selector> = LazyLock::new(|| css(".title"));
    pub const TITLE_ATTR: &str = "title";
    pub const HREF_ATTR: &str = "href";

    pub static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| css(".description"));

    pub static PRICE: LazyLock<Selector> = LazyLock::new(|| css(".price"));

    /// Ratings paragraph carrying an integer `data-rating`.
    pub static RATING_ATTR_NODE: LazyLock<Selector> = LazyLock::new(|| css("p[data-rating]"));
    pub const RATING_ATTR: &str = "data-rating";

    /// Filled star icons, for layouts without `data-rating`.
    pub static RATING_STAR: LazyLock<Selector> = LazyLock::new(|| css(".glyphicon-star"));

    /// "12 reviews".
    pub static REVIEWS: LazyLock<Selector> = LazyLock::new(|| css(".ratings > p.pull-right"));

    pub static PAGINATION: LazyLock<Selector> = LazyLock::new(|| css(".pagination"));
    pub static PAGINATION_ITEM: LazyLock<Selector> = LazyLock::new(|| css("li"));
}

/// Selectors sent to the browser session as plain CSS strings.
pub mod browser {
    pub const ENTRY: &str = ".thumbnail";
    pub const ACCEPT_COOKIES: &str = ".acceptCookies";
    pub const LOAD_MORE: &str = ".ecomerce-items-scroll-more";

    pub const SWATCHES: &str = ".swatches";
    pub const SWATCH_BUTTON: &str = "button";
    pub const SWATCH_VALUE_ATTR: &str = "value";
    pub const SWATCH_ACTIVE_CLASS: &str = "active";
    pub const DETAIL_PRICE: &str = ".price";
}
