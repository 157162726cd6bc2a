// src/config.rs
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, ScraperError};
use crate::fetch::DEFAULT_USER_AGENT;
use crate::model::{CategoryConfig, LoadingStrategy};
use crate::wait::WaitPolicy;
use crate::webdriver::WebDriverConfig;

const STATIC_HOME: &str = "https://webscraper.io/test-sites/e-commerce/static/";
const MORE_HOME: &str = "https://webscraper.io/test-sites/e-commerce/more/";

/// Iteration caps. `0` disables a cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_pages: u32,
    pub max_scroll_cycles: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_pages: 500,
            max_scroll_cycles: 200,
        }
    }
}

impl LimitsConfig {
    pub fn max_pages(&self) -> Option<u32> {
        (self.max_pages > 0).then_some(self.max_pages)
    }

    pub fn max_scroll_cycles(&self) -> Option<u32> {
        (self.max_scroll_cycles > 0).then_some(self.max_scroll_cycles)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub output_dir: PathBuf,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub webdriver: WebDriverConfig,
    pub limits: LimitsConfig,
    pub wait: WaitPolicy,
    pub categories: Vec<CategoryConfig>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 30,
            webdriver: WebDriverConfig::default(),
            limits: LimitsConfig::default(),
            wait: WaitPolicy::default(),
            categories: default_categories(),
        }
    }
}

/// The webscraper.io e-commerce test sites.
pub fn default_categories() -> Vec<CategoryConfig> {
    let mut categories = Vec::new();
    for (name, path) in [
        ("home", ""),
        ("laptops", "computers/laptops"),
        ("tablets", "computers/tablets"),
        ("phones", "phones/touch"),
    ] {
        categories.push(CategoryConfig::new(name, format!("{STATIC_HOME}{path}"), LoadingStrategy::Paginated));
    }
    for (name, path) in [
        ("more_home", ""),
        ("more_computers", "computers"),
        ("more_phones", "phones"),
        ("more_laptops", "computers/laptops"),
        ("more_tablets", "computers/tablets"),
        ("more_touch", "phones/touch"),
    ] {
        categories.push(CategoryConfig::new(name, format!("{MORE_HOME}{path}"), LoadingStrategy::InfiniteScroll));
    }
    categories.push(CategoryConfig::new(
        "laptop_variants",
        format!("{STATIC_HOME}computers/laptops"),
        LoadingStrategy::Variants,
    ));
    categories
}

impl CrawlConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ScraperError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: CrawlConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(ScraperError::Config("no categories configured".to_string()));
        }
        let mut seen = HashSet::new();
        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(ScraperError::Config(format!("category with url {} has no name", category.url)));
            }
            if !seen.insert(category.name.as_str()) {
                return Err(ScraperError::Config(format!("duplicate category {}", category.name)));
            }
            Url::parse(&category.url)?;
        }
        Url::parse(&self.webdriver.url)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Categories named in `filter`, in configuration order. An empty filter selects all.
    pub fn select(&self, filter: &[String]) -> Result<Vec<CategoryConfig>> {
        if let Some(unknown) = filter
            .iter()
            .find(|name| !self.categories.iter().any(|c| &c.name == *name))
        {
            return Err(ScraperError::Config(format!("unknown category {unknown}")));
        }
        Ok(self
            .categories
            .iter()
            .filter(|c| filter.is_empty() || filter.contains(&c.name))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RatingStrategy;
    use crate::webdriver::BrowserKind;

    #[test]
    fn defaults_cover_every_loading_strategy() {
        let config = CrawlConfig::default();
        config.validate().unwrap();

        let count = |s: LoadingStrategy| config.categories.iter().filter(|c| c.strategy == s).count();
        assert_eq!(count(LoadingStrategy::Paginated), 4);
        assert_eq!(count(LoadingStrategy::InfiniteScroll), 6);
        assert_eq!(count(LoadingStrategy::Variants), 1);

        let touch = config.categories.iter().find(|c| c.name == "more_touch").unwrap();
        assert_eq!(touch.url, "https://webscraper.io/test-sites/e-commerce/more/phones/touch");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: CrawlConfig = toml::from_str(
            r#"
            output_dir = "out"

            [webdriver]
            browser = "firefox"

            [wait]
            timeout_ms = 2500

            [[categories]]
            name = "touch"
            url = "https://shop.test/more/phones/touch"
            strategy = "infinite_scroll"
            rating = "data_attribute"
            "#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.webdriver.browser, BrowserKind::Firefox);
        assert_eq!(config.webdriver.url, "http://localhost:9515");
        assert_eq!(config.wait.timeout, Duration::from_millis(2500));
        assert_eq!(config.wait.retries, WaitPolicy::default().retries);
        assert_eq!(config.limits, LimitsConfig::default());
        assert_eq!(config.categories.len(), 1);
        assert_eq!(config.categories[0].rating_strategy(), RatingStrategy::DataAttribute);
    }

    #[test]
    fn zero_disables_a_cap() {
        let limits = LimitsConfig { max_pages: 0, max_scroll_cycles: 7 };
        assert_eq!(limits.max_pages(), None);
        assert_eq!(limits.max_scroll_cycles(), Some(7));
    }

    #[test]
    fn validation_rejects_bad_categories() {
        let mut config = CrawlConfig::default();
        config.categories.push(config.categories[0].clone());
        assert!(matches!(config.validate(), Err(ScraperError::Config(m)) if m.contains("duplicate")));

        let mut config = CrawlConfig::default();
        config.categories[0].url = "not a url".into();
        assert!(config.validate().is_err());

        let config = CrawlConfig { categories: vec![], ..CrawlConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn select_filters_in_config_order() {
        let config = CrawlConfig::default();

        let picked = config.select(&["phones".into(), "laptops".into()]).unwrap();
        let names: Vec<_> = picked.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["laptops", "phones"]);

        assert_eq!(config.select(&[]).unwrap().len(), config.categories.len());
        assert!(config.select(&["nope".into()]).is_err());
    }

    #[test]
    fn load_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl.toml");
        fs::write(
            &path,
            "[[categories]]\nname = \"laptops\"\nurl = \"https://shop.test/laptops\"\nstrategy = \"paginated\"\n",
        )
        .unwrap();

        let config = CrawlConfig::load(&path).unwrap();
        assert_eq!(config.categories[0].name, "laptops");
        assert!(CrawlConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
