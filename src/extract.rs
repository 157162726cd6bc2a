// src/extract.rs
//! Catalog-entry node -> `Product`.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use crate::error::{Result, ScraperError};
use crate::model::{CatalogEntry, Product, RatingStrategy};
use crate::selectors::listing;

pub const MAX_RATING: u8 = 5;

static LEADING_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)").expect("static regex"));

fn select_one<'a>(node: ElementRef<'a>, selector: &scraper::Selector, field: &'static str) -> Result<ElementRef<'a>> {
    node.select(selector)
        .next()
        .ok_or(ScraperError::Extraction { field })
}

fn attr<'a>(node: ElementRef<'a>, name: &str, field: &'static str) -> Result<&'a str> {
    node.value()
        .attr(name)
        .ok_or(ScraperError::Extraction { field })
}

fn text_of(node: ElementRef<'_>) -> String {
    node.text().collect::<String>().trim().to_string()
}

/// Strips a leading currency symbol (and thousands separators) and parses the rest.
pub fn parse_price(raw: &str) -> Result<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '.' && c != '-')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let price: f64 = cleaned
        .trim()
        .parse()
        .map_err(|_| ScraperError::parse("price", raw))?;
    if !price.is_finite() || price < 0.0 {
        return Err(ScraperError::parse("price", raw));
    }
    Ok(price)
}

/// Leading integer token of a fragment such as "12 reviews".
pub fn parse_review_count(raw: &str) -> Result<u32> {
    LEADING_INT
        .captures(raw)
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| ScraperError::parse("num_of_reviews", raw))
}

fn checked_rating(value: usize, raw: &str) -> Result<u8> {
    u8::try_from(value)
        .ok()
        .filter(|r| *r <= MAX_RATING)
        .ok_or_else(|| ScraperError::parse("rating", raw))
}

fn extract_rating(node: ElementRef<'_>, strategy: RatingStrategy) -> Result<u8> {
    match strategy {
        RatingStrategy::DataAttribute => {
            let holder = select_one(node, &listing::RATING_ATTR_NODE, "rating")?;
            let raw = attr(holder, listing::RATING_ATTR, "rating")?;
            let value: usize = raw
                .trim()
                .parse()
                .map_err(|_| ScraperError::parse("rating", raw))?;
            checked_rating(value, raw)
        }
        RatingStrategy::StarCount => {
            let stars = node.select(&listing::RATING_STAR).count();
            checked_rating(stars, &format!("{stars} stars"))
        }
    }
}

/// Maps one catalog-entry node to a product. No partial record on failure.
pub fn parse_product(node: ElementRef<'_>, rating: RatingStrategy) -> Result<Product> {
    let title_node = select_one(node, &listing::TITLE, "title")?;
    let title = attr(title_node, listing::TITLE_ATTR, "title")?.to_string();
    let description = text_of(select_one(node, &listing::DESCRIPTION, "description")?);
    let price = parse_price(&text_of(select_one(node, &listing::PRICE, "price")?))?;
    let rating = extract_rating(node, rating)?;
    let num_of_reviews =
        parse_review_count(&text_of(select_one(node, &listing::REVIEWS, "num_of_reviews")?))?;

    Ok(Product {
        title,
        description,
        price,
        rating,
        num_of_reviews,
        variant_prices: None,
    })
}

pub fn parse_entry(node: ElementRef<'_>, rating: RatingStrategy) -> Result<CatalogEntry> {
    let product = parse_product(node, rating)?;
    let detail_href = node
        .select(&listing::TITLE)
        .next()
        .and_then(|title| title.value().attr(listing::HREF_ATTR))
        .map(str::to_string);
    Ok(CatalogEntry { product, detail_href })
}

/// Every catalog entry of a document, in DOM order. The first bad entry fails the page.
pub fn parse_page(document: &Html, rating: RatingStrategy) -> Result<Vec<CatalogEntry>> {
    document
        .select(&listing::ENTRY)
        .map(|node| parse_entry(node, rating))
        .collect()
}
