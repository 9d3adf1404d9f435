use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;

use crate::{api::models::*, db, search, Result};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DbPool,
    pub settings: crate::config::Settings,
}

/// GET /api/from_ingredient/:ingredient - Ranked recipe search
///
/// The path parameter is a comma-separated ingredient list; axum hands it
/// over already percent-decoded. Results come back ordered by how many
/// ingredient rows matched, capped by the configured maximum.
pub async fn recipes_by_ingredients(
    State(state): State<AppState>,
    Path(ingredient): Path<String>,
) -> Result<Json<Vec<RecipeResult>>> {
    debug!("Search request: {:?}", ingredient);

    let terms = search::parse_terms(&ingredient)?;
    let limit = state.settings.search.max_results as i64;
    let ranked = search::search_recipes(&state.pool, &terms, limit).await?;

    Ok(Json(ranked.into_iter().map(RecipeResult::from).collect()))
}

/// GET /api/stats - Get table counts
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<Stats>> {
    debug!("Get stats request");

    let recipes = db::count_recipes(&state.pool).await?;
    let ingredients = db::count_ingredients(&state.pool).await?;
    let recipe_ingredients = db::count_links(&state.pool).await?;

    Ok(Json(Stats {
        recipes,
        ingredients,
        recipe_ingredients,
    }))
}

/// GET /health - Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

/// GET /ready - Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> Result<Json<ReadinessResponse>> {
    // Check database connectivity
    let db_healthy = sqlx::query("SELECT 1").fetch_one(&state.pool).await.is_ok();

    Ok(Json(ReadinessResponse {
        ready: db_healthy,
        database: if db_healthy { "ok" } else { "error" }.to_string(),
    }))
}
