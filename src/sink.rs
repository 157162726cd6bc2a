// src/sink.rs
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::{Result, ScraperError};
use crate::extract::MAX_RATING;
use crate::model::{Category, PRODUCT_FIELDS, Product};

/// Persists one crawled category. Called once per category.
pub trait RecordSink {
    fn write(&mut self, category: &Category) -> Result<PathBuf>;
}

/// Writes `<dir>/<name>.csv`, staged through a `.part` file so a failed write leaves nothing behind.
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        let file: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.csv"))
    }
}

impl RecordSink for CsvSink {
    fn write(&mut self, category: &Category) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&category.name);
        let staged = path.with_extension("csv.part");

        if let Err(e) = write_records(&staged, category) {
            let _ = fs::remove_file(&staged);
            return Err(e);
        }
        fs::rename(&staged, &path)?;

        info!(category = %category.name, products = category.products.len(), path = %path.display(), "saved category");
        Ok(path)
    }
}

fn write_records(path: &Path, category: &Category) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(category.header())?;
    for product in &category.products {
        wtr.write_record(product.to_csv_record(category.variant_bearing))?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ProductRow {
    title: String,
    description: String,
    price: f64,
    rating: u8,
    num_of_reviews: u32,
}

/// Reads back the scalar fields of a sink artifact.
///
/// The `variant_prices` column is not parsed; products come back with `variant_prices: None`.
pub fn read_products(path: &Path) -> Result<Vec<Product>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let header = rdr.headers()?.clone();
    if header.iter().take(PRODUCT_FIELDS.len()).ne(PRODUCT_FIELDS) {
        return Err(ScraperError::parse("csv header", header.iter().collect::<Vec<_>>().join(",")));
    }

    rdr.deserialize::<ProductRow>()
        .map(|row| {
            let row = row?;
            if row.rating > MAX_RATING {
                return Err(ScraperError::parse("rating", row.rating.to_string()));
            }
            Ok(Product {
                title: row.title,
                description: row.description,
                price: row.price,
                rating: row.rating,
                num_of_reviews: row.num_of_reviews,
                variant_prices: None,
            })
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VariantPrices;

    fn laptop() -> Product {
        Product {
            title: "Dell Inspiron".into(),
            description: "A laptop".into(),
            price: 399.99,
            rating: 3,
            num_of_reviews: 12,
            variant_prices: None,
        }
    }

    fn category(name: &str, variant_bearing: bool, products: Vec<Product>) -> Category {
        Category {
            name: name.into(),
            url: "https://shop.test".into(),
            variant_bearing,
            products,
        }
    }

    #[test]
    fn round_trip_keeps_scalar_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path());

        let path = sink.write(&category("laptops", false, vec![laptop()])).unwrap();

        assert_eq!(path, dir.path().join("laptops.csv"));
        assert_eq!(read_products(&path).unwrap(), vec![laptop()]);
    }

    #[test]
    fn variant_column_is_written_but_not_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path());
        let mut product = laptop();
        product.variant_prices = Some(VariantPrices::from([("128".to_string(), 1178.99)]));

        let path = sink.write(&category("variants", true, vec![product])).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let mut lines = raw.lines();
        assert_eq!(lines.next(), Some("title,description,price,rating,num_of_reviews,variant_prices"));
        assert_eq!(lines.next(), Some(r#"Dell Inspiron,A laptop,399.99,3,12,"{""128"": 1178.99}""#));
        assert_eq!(read_products(&path).unwrap(), vec![laptop()]);
    }

    #[test]
    fn empty_category_still_gets_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = CsvSink::new(dir.path()).write(&category("empty", true, vec![])).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap().trim_end(),
            "title,description,price,rating,num_of_reviews,variant_prices"
        );
        assert!(read_products(&path).unwrap().is_empty());
    }

    #[test]
    fn no_part_file_is_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        CsvSink::new(dir.path()).write(&category("tablets", false, vec![laptop()])).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, ["tablets.csv"]);
    }

    #[test]
    fn category_names_become_safe_file_names() {
        let sink = CsvSink::new("out");
        assert_eq!(sink.path_for("more/phones touch"), Path::new("out/more_phones_touch.csv"));
    }

    #[test]
    fn foreign_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.csv");
        fs::write(&path, "name,cost\nx,1\n").unwrap();

        assert!(matches!(read_products(&path), Err(ScraperError::Parse { what: "csv header", .. })));
    }
}
