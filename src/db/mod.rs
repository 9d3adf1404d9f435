use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Pool, Postgres};
use std::time::Duration;
use tracing::debug;

pub type DbPool = Pool<Postgres>;

/// Statements that bring the schema up from an empty database. Every one is
/// idempotent, so ingestion can run them unconditionally.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS recipes (
        id BIGINT PRIMARY KEY,
        name TEXT NOT NULL,
        cuisine TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS ingredients (
        ingredient TEXT PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS recipe_ingredients (
        recipe_id BIGINT NOT NULL REFERENCES recipes (id),
        ingredient TEXT NOT NULL REFERENCES ingredients (ingredient),
        original_ingredient TEXT NOT NULL
    )",
];

/// Initialize database connection pool
pub async fn init_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPool::connect(database_url).await?;
    Ok(pool)
}

/// Initialize database connection pool with custom configuration
pub async fn init_pool_with_config(config: &DatabaseConfig) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
        .connect(&config.url)
        .await?;

    Ok(pool)
}

/// Create the three tables if they do not exist yet.
pub async fn init_schema(pool: &DbPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    debug!("Schema ready");
    Ok(())
}

/// Build the trigram index used by fuzzy ingredient matching, plus the
/// join index on recipe_id. Called after bulk load so the GIN index is
/// built once over the full table instead of maintained row by row.
pub async fn ensure_trigram_index(pool: &DbPool) -> Result<()> {
    sqlx::query("CREATE EXTENSION IF NOT EXISTS pg_trgm")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS trgm_idx
         ON recipe_ingredients USING GIN (ingredient gin_trgm_ops)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS recipe_ingredients_recipe_id_idx
         ON recipe_ingredients (recipe_id)",
    )
    .execute(pool)
    .await?;
    debug!("Indexes ready");
    Ok(())
}

/// Empty all three tables in one statement. Naming every table in a single
/// TRUNCATE sidesteps foreign key ordering.
pub async fn truncate_all(pool: &DbPool) -> Result<()> {
    sqlx::query("TRUNCATE recipe_ingredients, recipes, ingredients")
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn count_recipes(pool: &DbPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_ingredients(pool: &DbPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingredients")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_links(pool: &DbPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipe_ingredients")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
