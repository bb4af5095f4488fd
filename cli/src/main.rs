use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use dialoguer::Input;
use tracing_subscriber::EnvFilter;

use ladle_core::{
    load_recipe_sites, BatchScraper, CsvExport, DirectSearch, JsonLdParser, MultiSiteSearcher,
    PageExtractor, Pipeline, ProxySearch, RecipeSink, SearchStrategy, SqliteStore, WebClient,
};

#[derive(Parser)]
#[command(name = "ladle")]
#[command(
    about = "Search cooking sites for recipes and save them to a local database",
    long_about = None
)]
struct Cli {
    /// Search query; prompted for interactively when omitted.
    query: Vec<String>,

    /// How many recipes to fetch.
    #[arg(long, default_value_t = 15)]
    count: usize,

    /// SQLite database path.
    #[arg(long, default_value = "recipes.db")]
    db: PathBuf,

    /// Site list file, one domain per line.
    #[arg(long, default_value = ladle_core::DEFAULT_SITES_FILE)]
    sites: PathBuf,

    /// How recipe links are discovered.
    #[arg(long, value_enum, default_value_t = Strategy::Direct)]
    strategy: Strategy,

    /// Export to a CSV file instead of the database.
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    /// Query each site's own search page.
    Direct,
    /// Scope queries to each site through a search proxy.
    Proxy,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let query = if cli.query.is_empty() {
        Input::<String>::new()
            .with_prompt("Recipe search query (e.g. 'chocolate chip cookies')")
            .allow_empty(true)
            .interact_text()?
    } else {
        cli.query.join(" ")
    };
    let query = query.trim().to_string();
    if query.is_empty() {
        println!("No query entered.");
        return Ok(());
    }

    // Search pages get a shorter timeout than recipe pages; a slow search
    // endpoint should cost at most one quota slot, not stall the run.
    let search_client = WebClient::builder()
        .timeout(Duration::from_secs(12))
        .build()?;
    let page_client = WebClient::new()?;
    let sites = load_recipe_sites(&cli.sites);

    let strategy: Box<dyn SearchStrategy> = match cli.strategy {
        Strategy::Direct => Box::new(DirectSearch::new(search_client)),
        Strategy::Proxy => Box::new(ProxySearch::new(search_client)),
    };
    let searcher = MultiSiteSearcher::new(strategy, sites);
    let scraper = BatchScraper::new(PageExtractor::new(page_client, JsonLdParser));

    let sink: Box<dyn RecipeSink> = match &cli.csv {
        Some(path) => Box::new(CsvExport::new(path.clone())),
        None => Box::new(SqliteStore::open(&cli.db).await?),
    };

    let pipeline = Pipeline::new(searcher, scraper, sink);
    let summary = pipeline.run(&query, cli.count).await?;

    println!(
        "Done: {} urls found, {} pages scraped, {} recipes saved.",
        summary.urls_found, summary.scraped, summary.saved
    );
    // Partial failure still exits 0; the counts above are the report.
    Ok(())
}
