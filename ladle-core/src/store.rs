//! Recipe persistence: SQLite upsert store and flat CSV export.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::recipe::Recipe;

/// Where scraped recipes end up.
#[async_trait]
pub trait RecipeSink: Send + Sync {
    /// Persist `recipes` for the run that searched `query`, returning how
    /// many rows were actually saved.
    async fn upsert(&self, recipes: &[Recipe], query: &str) -> Result<u32, StoreError>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS recipes (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    title         TEXT    NOT NULL,
    url           TEXT    UNIQUE NOT NULL,
    author        TEXT,
    source_site   TEXT,
    image_url     TEXT,
    total_time    TEXT,
    yields        TEXT,
    cuisine       TEXT,
    category      TEXT,
    calories      TEXT,
    dietary_tags  TEXT,
    ingredients   TEXT,
    instructions  TEXT,
    scraped_date  TEXT
);

CREATE TABLE IF NOT EXISTS search_log (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    query         TEXT    NOT NULL,
    searched_at   TEXT    NOT NULL,
    results_found INTEGER
);
";

const UPSERT_RECIPE: &str = "
INSERT INTO recipes
    (title, url, author, source_site, image_url, total_time,
     yields, cuisine, category, calories, dietary_tags,
     ingredients, instructions, scraped_date)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(url) DO UPDATE SET
    title        = excluded.title,
    author       = excluded.author,
    source_site  = excluded.source_site,
    image_url    = excluded.image_url,
    total_time   = excluded.total_time,
    yields       = excluded.yields,
    cuisine      = excluded.cuisine,
    category     = excluded.category,
    calories     = excluded.calories,
    dietary_tags = excluded.dietary_tags,
    ingredients  = excluded.ingredients,
    instructions = excluded.instructions,
    scraped_date = excluded.scraped_date
";

/// A recipe row as stored, flattened fields included.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredRecipe {
    pub title: String,
    pub url: String,
    pub author: String,
    pub source_site: String,
    pub image_url: String,
    pub total_time: String,
    pub yields: String,
    pub cuisine: String,
    pub category: String,
    pub calories: String,
    pub dietary_tags: String,
    pub ingredients: String,
    pub instructions: String,
    pub scraped_date: String,
}

/// SQLite-backed store keyed by recipe URL.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and ensure the
    /// schema exists.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory database, used by tests.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Number of stored recipes.
    pub async fn recipe_count(&self) -> Result<i64, StoreError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
            .fetch_one(&self.pool)
            .await?)
    }

    /// Fetch one stored recipe by its URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<StoredRecipe>, StoreError> {
        Ok(sqlx::query_as::<_, StoredRecipe>(
            "SELECT title, url, author, source_site, image_url, total_time, yields, cuisine,
                    category, calories, dietary_tags, ingredients, instructions, scraped_date
             FROM recipes WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Search log rows as (query, results_found), oldest first.
    pub async fn search_log(&self) -> Result<Vec<(String, i64)>, StoreError> {
        Ok(
            sqlx::query_as::<_, (String, i64)>(
                "SELECT query, results_found FROM search_log ORDER BY id",
            )
            .fetch_all(&self.pool)
            .await?,
        )
    }
}

#[async_trait]
impl RecipeSink for SqliteStore {
    /// Upsert the whole batch and append one search-log row, atomically.
    ///
    /// A single bad row is logged and skipped without aborting the batch.
    async fn upsert(&self, recipes: &[Recipe], query: &str) -> Result<u32, StoreError> {
        if recipes.is_empty() {
            info!("no recipes to save");
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut saved = 0u32;

        for recipe in recipes {
            let result = sqlx::query(UPSERT_RECIPE)
                .bind(&recipe.title)
                .bind(&recipe.url)
                .bind(&recipe.author)
                .bind(&recipe.source_site)
                .bind(&recipe.image_url)
                .bind(&recipe.total_time)
                .bind(&recipe.yields)
                .bind(&recipe.cuisine)
                .bind(&recipe.category)
                .bind(&recipe.calories)
                .bind(recipe.dietary_tags_joined())
                .bind(recipe.ingredients_joined())
                .bind(&recipe.instructions)
                .bind(&recipe.scraped_date)
                .execute(&mut *tx)
                .await;

            match result {
                Ok(_) => saved += 1,
                Err(e) => warn!(url = recipe.url.as_str(), error = %e, "row not saved"),
            }
        }

        sqlx::query("INSERT INTO search_log (query, searched_at, results_found) VALUES (?, ?, ?)")
            .bind(query)
            .bind(crate::recipe::scraped_timestamp())
            .bind(saved as i64)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(saved, "recipes saved");
        Ok(saved)
    }
}

const CSV_HEADER: &str = "title,url,author,source_site,image_url,total_time,yields,cuisine,\
category,calories,dietary_tags,ingredients,instructions,scraped_date";

/// Flat-file export sink: one CSV with the same columns as the recipes
/// table. Keeps no search log.
pub struct CsvExport {
    path: PathBuf,
}

impl CsvExport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[async_trait]
impl RecipeSink for CsvExport {
    async fn upsert(&self, recipes: &[Recipe], _query: &str) -> Result<u32, StoreError> {
        let mut out = String::with_capacity(recipes.len() * 256 + CSV_HEADER.len());
        out.push_str(CSV_HEADER);
        out.push('\n');

        for recipe in recipes {
            let row = [
                recipe.title.clone(),
                recipe.url.clone(),
                recipe.author.clone(),
                recipe.source_site.clone(),
                recipe.image_url.clone(),
                recipe.total_time.clone(),
                recipe.yields.clone(),
                recipe.cuisine.clone(),
                recipe.category.clone(),
                recipe.calories.clone(),
                recipe.dietary_tags_joined(),
                recipe.ingredients_joined(),
                recipe.instructions.clone(),
                recipe.scraped_date.clone(),
            ];
            let line: Vec<String> = row.iter().map(|field| csv_field(field)).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }

        std::fs::write(&self.path, out)?;
        info!(count = recipes.len(), path = %self.path.display(), "recipes exported");
        Ok(recipes.len() as u32)
    }
}
