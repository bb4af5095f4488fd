//! End-to-end orchestration: search, scrape, persist.

use tracing::info;

use crate::error::StoreError;
use crate::extract::RecipeParser;
use crate::http::HttpClient;
use crate::scrape::BatchScraper;
use crate::search::MultiSiteSearcher;
use crate::store::RecipeSink;

/// Counts from one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Unique recipe URLs the search stage produced.
    pub urls_found: usize,
    /// Pages successfully scraped into records.
    pub scraped: usize,
    /// Rows the sink reported as saved.
    pub saved: u32,
}

/// The full search, scrape, save pipeline for one query.
pub struct Pipeline<C, P> {
    searcher: MultiSiteSearcher,
    scraper: BatchScraper<C, P>,
    sink: Box<dyn RecipeSink>,
}

impl<C: HttpClient, P: RecipeParser> Pipeline<C, P> {
    pub fn new(
        searcher: MultiSiteSearcher,
        scraper: BatchScraper<C, P>,
        sink: Box<dyn RecipeSink>,
    ) -> Self {
        Self {
            searcher,
            scraper,
            sink,
        }
    }

    /// Run the pipeline for one query.
    ///
    /// Zero search results and zero successful scrapes are normal terminal
    /// states: later stages are skipped and the summary carries the counts.
    pub async fn run(&self, query: &str, num_results: usize) -> Result<RunSummary, StoreError> {
        let urls = self.searcher.search_all(query, num_results).await;
        if urls.is_empty() {
            info!("no recipe urls found");
            return Ok(RunSummary::default());
        }

        let recipes = self.scraper.scrape_all(&urls).await;
        if recipes.is_empty() {
            info!("no recipes successfully scraped");
            return Ok(RunSummary {
                urls_found: urls.len(),
                ..Default::default()
            });
        }

        let saved = self.sink.upsert(&recipes, query).await?;
        Ok(RunSummary {
            urls_found: urls.len(),
            scraped: recipes.len(),
            saved,
        })
    }
}
