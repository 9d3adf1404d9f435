use crate::config::MAX_RESULTS_CEILING;
use crate::db::DbPool;
use crate::error::{Error, Result};
use sqlx::FromRow;
use tracing::debug;

/// One ranked search, fully aggregated server-side. The term array is a
/// single TEXT[] bind, so the statement is identical for any number of
/// terms and user input never reaches the SQL text.
///
/// Both array_agg calls share one ORDER BY: position i of `ingredients`
/// and of `original_ingredients` always describe the same link row.
/// GROUP BY r.id is enough because id is the primary key.
const RANKED_SEARCH_SQL: &str = "
    WITH hits AS (
        SELECT DISTINCT recipe_id
        FROM recipe_ingredients
        WHERE ingredient % ANY($1)
    )
    SELECT r.id, r.name, r.cuisine,
           array_agg(ri.ingredient ORDER BY ri.ingredient, ri.original_ingredient)
               AS ingredients,
           array_agg(ri.original_ingredient ORDER BY ri.ingredient, ri.original_ingredient)
               AS original_ingredients,
           count(*) FILTER (WHERE ri.ingredient % ANY($1))
               AS matched_ingredients
    FROM recipes r
    JOIN hits h ON h.recipe_id = r.id
    JOIN recipe_ingredients ri ON ri.recipe_id = r.id
    GROUP BY r.id
    ORDER BY matched_ingredients DESC, r.id
    LIMIT $2
";

/// A recipe with its full ingredient listing and how many of its
/// ingredient rows matched the query.
#[derive(Debug, Clone, FromRow)]
pub struct ScoredRecipe {
    pub id: i64,
    pub name: String,
    pub cuisine: String,
    pub ingredients: Vec<String>,
    pub original_ingredients: Vec<String>,
    pub matched_ingredients: i64,
}

/// Split a raw comma-separated ingredient list into search terms.
///
/// Terms pass through otherwise untouched (no trimming, no case folding);
/// trigram matching is what absorbs small differences. An empty list or a
/// blank term is rejected outright instead of silently matching nothing.
pub fn parse_terms(raw: &str) -> Result<Vec<String>> {
    if raw.is_empty() {
        return Err(Error::InvalidQuery("ingredient list is empty".to_string()));
    }

    let mut terms = Vec::new();
    for part in raw.split(',') {
        if part.trim().is_empty() {
            return Err(Error::InvalidQuery(
                "ingredient list contains an empty term".to_string(),
            ));
        }
        terms.push(part.to_string());
    }

    Ok(terms)
}

/// Rank recipes by how many of their ingredient rows fuzzily match any of
/// the terms. Ties break on recipe id so output order is stable.
pub async fn search_recipes(
    pool: &DbPool,
    terms: &[String],
    limit: i64,
) -> Result<Vec<ScoredRecipe>> {
    if terms.is_empty() {
        return Err(Error::InvalidQuery("ingredient list is empty".to_string()));
    }
    if limit <= 0 {
        return Err(Error::InvalidQuery(
            "result limit must be positive".to_string(),
        ));
    }
    let limit = limit.min(MAX_RESULTS_CEILING as i64);

    debug!("Searching {} terms, limit {}", terms.len(), limit);

    let results = sqlx::query_as::<_, ScoredRecipe>(RANKED_SEARCH_SQL)
        .bind(terms)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(results)
}
