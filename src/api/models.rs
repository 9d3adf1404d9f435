use crate::search::ScoredRecipe;
use serde::Serialize;

/// One ranked search hit. `ingredients[i]` and `original_ingredients[i]`
/// describe the same ingredient row of the recipe.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeResult {
    pub id: i64,
    pub name: String,
    pub cuisine: String,
    pub ingredients: Vec<String>,
    pub original_ingredients: Vec<String>,
    pub matched_ingredients: i64,
}

impl From<ScoredRecipe> for RecipeResult {
    fn from(recipe: ScoredRecipe) -> Self {
        RecipeResult {
            id: recipe.id,
            name: recipe.name,
            cuisine: recipe.cuisine,
            ingredients: recipe.ingredients,
            original_ingredients: recipe.original_ingredients,
            matched_ingredients: recipe.matched_ingredients,
        }
    }
}

/// System statistics
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub recipes: i64,
    pub ingredients: i64,
    pub recipe_ingredients: i64,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub database: String,
}
