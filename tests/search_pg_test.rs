// Full ingest + search round trips against a real PostgreSQL.
//
// Ignored by default. Point DATABASE_URL at a scratch database whose role
// may CREATE EXTENSION pg_trgm, then:
//
//     cargo test -- --ignored --test-threads=1
//
// Single-threaded because every test reloads the same three tables.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pantry::api::{handlers::AppState, routes};
use pantry::config::Settings;
use pantry::db::{self, DbPool};
use pantry::ingest::{
    self,
    sources::{Dataset, Link, Recipe, SourcePaths},
};
use pantry::search;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

async fn test_pool() -> DbPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");
    db::init_pool(&url)
        .await
        .expect("Failed to connect to the test database")
}

// Two recipes, each with a single ingredient link.
fn write_scenario(dir: &Path) -> SourcePaths {
    let paths = SourcePaths::from_dir(dir);
    fs::write(&paths.recipes, "1,Soup,unused,Thai\n2,Cake,unused,French\n")
        .expect("Failed to write recipe file");
    fs::write(&paths.ingredients, "chili\nflour\n").expect("Failed to write ingredient file");
    fs::write(&paths.compound_ingredients, "").expect("Failed to write compound file");
    fs::write(&paths.links, "1,chili pepper,chili\n2,flour,flour\n")
        .expect("Failed to write link file");
    paths
}

fn term(s: &str) -> Vec<String> {
    vec![s.to_string()]
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn scenario_single_term_returns_the_matching_recipe() {
    let pool = test_pool().await;
    let dir = tempdir().expect("Failed to create temp dir");

    let report = ingest::run(&pool, &write_scenario(dir.path()))
        .await
        .expect("Ingest failed");
    assert_eq!(report.recipes, 2);
    assert_eq!(report.ingredients, 2);
    assert_eq!(report.links, 2);

    let results = search::search_recipes(&pool, &term("chili"), 20)
        .await
        .expect("Search failed");

    assert_eq!(results.len(), 1);
    let hit = &results[0];
    assert_eq!(hit.id, 1);
    assert_eq!(hit.name, "soup");
    assert_eq!(hit.cuisine, "thai");
    assert_eq!(hit.ingredients, vec!["chili"]);
    assert_eq!(hit.original_ingredients, vec!["chili pepper"]);
    assert_eq!(hit.matched_ingredients, 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn scenario_tied_scores_break_on_ascending_id() {
    let pool = test_pool().await;
    let dir = tempdir().expect("Failed to create temp dir");
    ingest::run(&pool, &write_scenario(dir.path()))
        .await
        .expect("Ingest failed");

    let terms = search::parse_terms("flour,chili").expect("Failed to parse terms");
    let results = search::search_recipes(&pool, &terms, 20)
        .await
        .expect("Search failed");

    let ids: Vec<i64> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(results.iter().all(|r| r.matched_ingredients == 1));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn no_match_is_an_empty_result_not_an_error() {
    let pool = test_pool().await;
    let dir = tempdir().expect("Failed to create temp dir");
    ingest::run(&pool, &write_scenario(dir.path()))
        .await
        .expect("Ingest failed");

    let results = search::search_recipes(&pool, &term("xylophone varnish"), 20)
        .await
        .expect("Search failed");
    assert!(results.is_empty());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn fresh_database_serves_empty_searches_before_first_ingest() {
    let pool = test_pool().await;

    // Roll back to the state of a never-ingested database: empty tables
    // and no trigram extension. Without the extension the % operator in
    // the ranking query does not exist at all.
    db::init_schema(&pool).await.expect("Schema bootstrap failed");
    db::truncate_all(&pool).await.expect("Truncate failed");
    sqlx::query("DROP EXTENSION IF EXISTS pg_trgm CASCADE")
        .execute(&pool)
        .await
        .expect("Failed to drop pg_trgm");

    // What the serve startup path runs: schema plus trigram setup.
    db::init_schema(&pool).await.expect("Schema bootstrap failed");
    db::ensure_trigram_index(&pool)
        .await
        .expect("Trigram setup failed");

    let results = search::search_recipes(&pool, &term("chili"), 20)
        .await
        .expect("Search before the first ingest failed");
    assert!(results.is_empty());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn fifty_matching_recipes_are_capped_at_twenty() {
    let pool = test_pool().await;

    let mut dataset = Dataset::default();
    dataset.ingredients.insert("cumin seeds".to_string());
    for id in 1..=50 {
        dataset.recipes.insert(
            id,
            Recipe {
                id,
                name: format!("recipe {id}"),
                cuisine: "test kitchen".to_string(),
            },
        );
        dataset.links.insert(Link {
            recipe_id: id,
            ingredient: "cumin seeds".to_string(),
            original: format!("cumin seeds, batch {id}"),
        });
    }
    ingest::load(&pool, &dataset).await.expect("Load failed");

    let results = search::search_recipes(&pool, &term("cumin seeds"), 20)
        .await
        .expect("Search failed");
    assert_eq!(results.len(), 20);
    let ids: Vec<i64> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=20).collect::<Vec<i64>>());

    // Asking for more than the ceiling still returns at most 20.
    let results = search::search_recipes(&pool, &term("cumin seeds"), 50)
        .await
        .expect("Search failed");
    assert_eq!(results.len(), 20);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn reingesting_converges_to_the_same_cardinalities() {
    let pool = test_pool().await;
    let dir = tempdir().expect("Failed to create temp dir");
    let paths = SourcePaths::from_dir(dir.path());

    // Recipe 1 and its chili link appear twice, verbatim.
    fs::write(
        &paths.recipes,
        "1,Soup,unused,Thai\n1,Soup,unused,Thai\n2,Cake,unused,French\n",
    )
    .expect("Failed to write recipe file");
    fs::write(&paths.ingredients, "chili\nflour\nchili\n").expect("Failed to write ingredients");
    fs::write(&paths.compound_ingredients, "").expect("Failed to write compound file");
    fs::write(
        &paths.links,
        "1,chili pepper,chili\n1,chili pepper,chili\n2,flour,flour\n",
    )
    .expect("Failed to write link file");

    ingest::run(&pool, &paths).await.expect("First run failed");
    let first = (
        db::count_recipes(&pool).await.expect("count failed"),
        db::count_ingredients(&pool).await.expect("count failed"),
        db::count_links(&pool).await.expect("count failed"),
    );

    ingest::run(&pool, &paths).await.expect("Second run failed");
    let second = (
        db::count_recipes(&pool).await.expect("count failed"),
        db::count_ingredients(&pool).await.expect("count failed"),
        db::count_links(&pool).await.expect("count failed"),
    );

    assert_eq!(first, (2, 2, 2));
    assert_eq!(second, first);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn full_ingredient_list_with_positional_correspondence() {
    let pool = test_pool().await;
    let dir = tempdir().expect("Failed to create temp dir");
    let paths = SourcePaths::from_dir(dir.path());

    // One recipe listing chili pepper twice under different original text.
    fs::write(&paths.recipes, "10,Hotpot,unused,Sichuan\n").expect("Failed to write recipe file");
    fs::write(&paths.ingredients, "").expect("Failed to write ingredient file");
    fs::write(&paths.compound_ingredients, "").expect("Failed to write compound file");
    fs::write(
        &paths.links,
        "10,dried chili peppers,chili pepper\n\
         10,fresh chili pepper,chili pepper\n\
         10,white onion,onion\n",
    )
    .expect("Failed to write link file");

    ingest::run(&pool, &paths).await.expect("Ingest failed");

    let results = search::search_recipes(&pool, &term("chili pepper"), 20)
        .await
        .expect("Search failed");
    assert_eq!(results.len(), 1);

    let hit = &results[0];
    assert_eq!(hit.ingredients.len(), hit.original_ingredients.len());
    // Full listing, not just the matching rows, ordered by
    // (ingredient, original text) in both arrays.
    assert_eq!(hit.ingredients, vec!["chili pepper", "chili pepper", "onion"]);
    assert_eq!(
        hit.original_ingredients,
        vec!["dried chili peppers", "fresh chili pepper", "white onion"]
    );
    assert_eq!(hit.matched_ingredients, 2);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn scores_are_monotonically_decreasing() {
    let pool = test_pool().await;

    let mut dataset = Dataset::default();
    dataset.ingredients.insert("lentils".to_string());
    for (id, rows) in [(21i64, 3), (22, 2), (23, 1)] {
        dataset.recipes.insert(
            id,
            Recipe {
                id,
                name: format!("dal {id}"),
                cuisine: "indian".to_string(),
            },
        );
        for row in 0..rows {
            dataset.links.insert(Link {
                recipe_id: id,
                ingredient: "lentils".to_string(),
                original: format!("red lentils, rinse {row}"),
            });
        }
    }
    ingest::load(&pool, &dataset).await.expect("Load failed");

    let results = search::search_recipes(&pool, &term("lentils"), 20)
        .await
        .expect("Search failed");

    let ids: Vec<i64> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![21, 22, 23]);

    let scores: Vec<i64> = results.iter().map(|r| r.matched_ingredients).collect();
    assert_eq!(scores, vec![3, 2, 1]);
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1]);
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn empty_term_slice_is_rejected_without_querying() {
    let pool = test_pool().await;

    let err = search::search_recipes(&pool, &[], 20).await.unwrap_err();
    assert!(matches!(err, pantry::Error::InvalidQuery(_)));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn the_http_surface_serves_the_scenario() {
    let pool = test_pool().await;
    let dir = tempdir().expect("Failed to create temp dir");
    ingest::run(&pool, &write_scenario(dir.path()))
        .await
        .expect("Ingest failed");

    let settings = Settings::from_env().expect("Failed to load settings");
    let state = AppState {
        pool,
        settings: settings.clone(),
    };
    let app = routes::create_router(state, &settings);

    // Ranked search over HTTP.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/from_ingredient/chili")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let results: serde_json::Value = serde_json::from_slice(&bytes).expect("Body was not JSON");
    assert_eq!(results[0]["id"], 1);
    assert_eq!(results[0]["name"], "soup");
    assert_eq!(results[0]["original_ingredients"][0], "chili pepper");
    assert_eq!(results[0]["matched_ingredients"], 1);

    // Stats reflect the loaded tables.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let stats: serde_json::Value = serde_json::from_slice(&bytes).expect("Body was not JSON");
    assert_eq!(stats["recipes"], 2);
    assert_eq!(stats["ingredients"], 2);
    assert_eq!(stats["recipe_ingredients"], 2);

    // Readiness sees the live database.
    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let ready: serde_json::Value = serde_json::from_slice(&bytes).expect("Body was not JSON");
    assert_eq!(ready["ready"], true);
}
