//! Single-page extraction and sequential batch scraping.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{ExtractError, ScrapeError};
use crate::extract::RecipeParser;
use crate::http::HttpClient;
use crate::recipe::{self, Recipe};

/// Delay between successive page fetches. Scraping is deliberately
/// sequential; this pacing is the only load shedding applied to target
/// sites.
pub const SCRAPE_DELAY: Duration = Duration::from_millis(1500);

/// Fetches one URL and normalizes the extracted fields into a [`Recipe`].
pub struct PageExtractor<C, P> {
    client: C,
    parser: P,
}

impl<C: HttpClient, P: RecipeParser> PageExtractor<C, P> {
    pub fn new(client: C, parser: P) -> Self {
        Self { client, parser }
    }

    /// Scrape a single recipe page.
    ///
    /// Title and ingredients are required; every other field degrades to a
    /// default when its accessor fails, so partial structured data still
    /// produces a record.
    pub async fn extract(&self, url: &str) -> Result<Recipe, ScrapeError> {
        let html = self.client.fetch_html(url).await?;
        let document = self.parser.parse(&html, url)?;

        let title = document.title()?;
        if title.trim().is_empty() {
            return Err(ExtractError::MissingField("name".to_string()).into());
        }
        let ingredients = document.ingredients()?;
        if ingredients.is_empty() {
            return Err(ExtractError::MissingField("recipeIngredient".to_string()).into());
        }

        let author = document
            .author()
            .ok()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let total_time = document
            .total_time()
            .map(|t| recipe::format_total_time(&t))
            .unwrap_or_default();
        let instructions =
            recipe::clean_instructions(&document.instructions().unwrap_or_default());
        let calories = document
            .nutrients()
            .ok()
            .and_then(|n| n.get("calories").cloned())
            .map(|c| recipe::clean_calories(&c))
            .unwrap_or_default();
        let dietary_tags = recipe::dietary_tags(&ingredients);

        Ok(Recipe {
            title,
            url: url.to_string(),
            author,
            source_site: source_site(url),
            image_url: document.image().unwrap_or_default(),
            total_time,
            yields: document.yields().unwrap_or_default(),
            cuisine: document.cuisine().unwrap_or_default(),
            category: document.category().unwrap_or_default(),
            calories,
            dietary_tags,
            ingredients,
            instructions,
            scraped_date: recipe::scraped_timestamp(),
        })
    }
}

/// Network authority of `url`, stored as the recipe's source site.
fn source_site(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Drives a [`PageExtractor`] over a URL list, one page at a time.
pub struct BatchScraper<C, P> {
    extractor: PageExtractor<C, P>,
    delay: Duration,
}

impl<C: HttpClient, P: RecipeParser> BatchScraper<C, P> {
    pub fn new(extractor: PageExtractor<C, P>) -> Self {
        Self {
            extractor,
            delay: SCRAPE_DELAY,
        }
    }

    /// Override the inter-request delay (tests use zero).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Scrape every URL in order, skipping failures.
    ///
    /// The fixed delay applies between requests but not after the last one.
    pub async fn scrape_all(&self, urls: &[String]) -> Vec<Recipe> {
        let mut recipes = Vec::new();

        for (i, url) in urls.iter().enumerate() {
            info!(n = i + 1, total = urls.len(), url = url.as_str(), "scraping");
            match self.extractor.extract(url).await {
                Ok(recipe) => {
                    info!(title = recipe.title.as_str(), "scraped");
                    recipes.push(recipe);
                }
                Err(e) => warn!(url = url.as_str(), error = %e, "skipping page"),
            }
            if i + 1 < urls.len() {
                sleep(self.delay).await;
            }
        }

        info!(scraped = recipes.len(), total = urls.len(), "batch finished");
        recipes
    }
}
