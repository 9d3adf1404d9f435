pub mod sources;

use crate::db::{self, DbPool};
use crate::error::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use sources::{Dataset, SourcePaths};
use sqlx::postgres::PgPoolCopyExt;
use std::time::Instant;
use tracing::info;

/// Rows per COPY payload chunk sent to the server.
const COPY_CHUNK_ROWS: usize = 8192;

/// Row counts loaded into each table by one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub recipes: u64,
    pub ingredients: u64,
    pub links: u64,
}

/// Parse the four source files and (re)load the database from them.
/// Safe to run repeatedly: the schema bootstrap is idempotent and the
/// tables are truncated before loading.
pub async fn run(pool: &DbPool, paths: &SourcePaths) -> Result<IngestReport> {
    let started = Instant::now();

    let dataset = sources::read_all(paths)?;
    let report = load(pool, &dataset).await?;

    info!(
        "Ingest finished in {:.1?}: {} recipes, {} ingredients, {} ingredient links",
        started.elapsed(),
        report.recipes,
        report.ingredients,
        report.links
    );

    Ok(report)
}

/// Load a staged dataset. Parents go in before the link table so its
/// foreign keys always resolve.
pub async fn load(pool: &DbPool, dataset: &Dataset) -> Result<IngestReport> {
    db::init_schema(pool).await?;
    db::truncate_all(pool).await?;

    let recipes = copy_rows(
        pool,
        "COPY recipes (id, name, cuisine) FROM STDIN WITH (FORMAT csv)",
        dataset.recipes.values(),
        dataset.recipes.len() as u64,
        "recipes",
        |recipe, writer| {
            let id = recipe.id.to_string();
            writer.write_record([id.as_str(), recipe.name.as_str(), recipe.cuisine.as_str()])
        },
    )
    .await?;

    let ingredients = copy_rows(
        pool,
        "COPY ingredients (ingredient) FROM STDIN WITH (FORMAT csv)",
        dataset.ingredients.iter(),
        dataset.ingredients.len() as u64,
        "ingredients",
        |ingredient, writer| writer.write_record([ingredient.as_str()]),
    )
    .await?;

    let links = copy_rows(
        pool,
        "COPY recipe_ingredients (recipe_id, ingredient, original_ingredient) \
         FROM STDIN WITH (FORMAT csv)",
        dataset.links.iter(),
        dataset.links.len() as u64,
        "ingredient links",
        |link, writer| {
            let id = link.recipe_id.to_string();
            writer.write_record([id.as_str(), link.ingredient.as_str(), link.original.as_str()])
        },
    )
    .await?;

    // Built after the bulk load so the GIN index is constructed in one
    // pass rather than maintained per row.
    db::ensure_trigram_index(pool).await?;

    Ok(IngestReport {
        recipes,
        ingredients,
        links,
    })
}

/// Stream items into one COPY statement, encoding them as CSV in chunks.
async fn copy_rows<T, I, F>(
    pool: &DbPool,
    statement: &str,
    items: I,
    total: u64,
    label: &str,
    encode: F,
) -> Result<u64>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T, &mut csv::Writer<Vec<u8>>) -> csv::Result<()>,
{
    info!("Loading {total} {label}");
    let bar = progress_bar(total, label);

    let mut copy = pool.copy_in_raw(statement).await?;
    let mut writer = csv_chunk();
    let mut pending = 0usize;

    for item in items {
        encode(&item, &mut writer)?;
        pending += 1;
        if pending == COPY_CHUNK_ROWS {
            copy.send(take_chunk(writer)?).await?;
            bar.inc(pending as u64);
            writer = csv_chunk();
            pending = 0;
        }
    }

    let chunk = take_chunk(writer)?;
    if !chunk.is_empty() {
        copy.send(chunk).await?;
    }
    bar.inc(pending as u64);

    let loaded = copy.finish().await?;
    bar.finish_with_message("done");
    Ok(loaded)
}

/// Every field is quoted so an empty string arrives as empty text rather
/// than being read back as NULL by CSV-format COPY.
fn csv_chunk() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::with_capacity(64 * 1024))
}

fn take_chunk(mut writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| Error::Internal(format!("chunk buffer flush failed: {e}")))
}

fn progress_bar(total: u64, label: &str) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap()
        .progress_chars("=> "),
    );
    bar.set_message(label.to_string());
    bar
}
