//! Search cooking websites for recipes, scrape the hits, and store them
//! locally.
//!
//! The pipeline is a straight line: the [`MultiSiteSearcher`] turns a query
//! into candidate recipe URLs, the [`BatchScraper`] turns URLs into
//! [`Recipe`] records, and a [`RecipeSink`] persists them keyed by URL.
//! Everything network-facing is strictly sequential with fixed politeness
//! delays.

pub mod classify;
pub mod error;
pub mod extract;
pub mod http;
pub mod pipeline;
pub mod recipe;
pub mod scrape;
pub mod search;
pub mod sites;
pub mod store;

pub use classify::is_recipe_link;
pub use error::{ExtractError, FetchError, ScrapeError, StoreError};
pub use extract::{JsonLdParser, MockDocument, MockParser, RecipeDocument, RecipeParser};
pub use http::{HttpClient, MockClient, WebClient, WebClientBuilder};
pub use pipeline::{Pipeline, RunSummary};
pub use recipe::{Recipe, TotalTime};
pub use scrape::{BatchScraper, PageExtractor};
pub use search::{DirectSearch, MultiSiteSearcher, ProxySearch, SearchStrategy};
pub use sites::{load_recipe_sites, DEFAULT_RECIPE_SITES, DEFAULT_SITES_FILE};
pub use store::{CsvExport, RecipeSink, SqliteStore, StoredRecipe};
