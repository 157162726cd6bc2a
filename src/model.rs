// src/model.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Variant label (e.g. an HDD size) to the price shown once it is selected.
pub type VariantPrices = BTreeMap<String, f64>;

pub const PRODUCT_FIELDS: [&str; 5] = ["title", "description", "price", "rating", "num_of_reviews"];
pub const VARIANT_FIELD: &str = "variant_prices";

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub rating: u8,
    pub num_of_reviews: u32,
    pub variant_prices: Option<VariantPrices>,
}

impl Product {
    /// Row in sink column order. The variant cell is only emitted for variant-bearing categories.
    pub fn to_csv_record(&self, with_variants: bool) -> Vec<String> {
        let mut record = vec![
            self.title.clone(),
            self.description.clone(),
            self.price.to_string(),
            self.rating.to_string(),
            self.num_of_reviews.to_string(),
        ];
        if with_variants {
            record.push(
                self.variant_prices
                    .as_ref()
                    .map(|prices| format!("{prices:?}"))
                    .unwrap_or_default(),
            );
        }
        record
    }
}

/// One catalog-entry node after extraction: the record plus the link to its detail view.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub product: Product,
    pub detail_href: Option<String>,
}

/// How a category's listing exposes all of its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingStrategy {
    /// Numbered pages fetched over plain HTTP.
    Paginated,
    /// A single rendered page grown by clicking "load more".
    InfiniteScroll,
    /// Numbered pages whose products also expose a variant picker on their detail page.
    Variants,
}

impl LoadingStrategy {
    pub fn needs_browser(self) -> bool {
        !matches!(self, LoadingStrategy::Paginated)
    }

    pub fn resolves_variants(self) -> bool {
        matches!(self, LoadingStrategy::Variants)
    }
}

/// Where the star rating of an entry comes from. One strategy per site layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingStrategy {
    /// Integer `data-rating` attribute on the ratings paragraph.
    #[default]
    DataAttribute,
    /// Number of filled star icons.
    StarCount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub url: String,
    pub strategy: LoadingStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<RatingStrategy>,
}

impl CategoryConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>, strategy: LoadingStrategy) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            strategy,
            rating: None,
        }
    }

    pub fn with_rating(mut self, rating: RatingStrategy) -> Self {
        self.rating = Some(rating);
        self
    }

    /// The "more" site renders stars without a `data-rating` attribute.
    pub fn rating_strategy(&self) -> RatingStrategy {
        self.rating.unwrap_or(match self.strategy {
            LoadingStrategy::InfiniteScroll => RatingStrategy::StarCount,
            _ => RatingStrategy::DataAttribute,
        })
    }
}

/// A crawled category, ready for the record sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub url: String,
    pub variant_bearing: bool,
    pub products: Vec<Product>,
}

impl Category {
    pub fn header(&self) -> Vec<&'static str> {
        let mut header = PRODUCT_FIELDS.to_vec();
        if self.variant_bearing {
            header.push(VARIANT_FIELD);
        }
        header
    }
}
