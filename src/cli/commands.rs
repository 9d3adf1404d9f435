use crate::{Error, Result};
use reqwest::Client;
use serde::Deserialize;

/// Search for recipes on a running server and print the ranked results.
pub async fn search(server_url: &str, ingredients: &str) -> Result<()> {
    let results = fetch_results(server_url, ingredients).await?;
    print_search_results(ingredients, &results);
    Ok(())
}

async fn fetch_results(server_url: &str, ingredients: &str) -> Result<Vec<RecipeRow>> {
    let client = Client::new();

    let url = format!(
        "{}/api/from_ingredient/{}",
        server_url.trim_end_matches('/'),
        urlencoding::encode(ingredients)
    );

    let response = client.get(&url).send().await?;

    let status = response.status();
    if !status.is_success() {
        // The server answers errors with {"error": "..."}; fall back to the
        // bare status line if the body is not in that shape.
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| status.to_string());
        return Err(Error::Internal(format!(
            "server rejected the query: {message}"
        )));
    }

    Ok(response.json().await?)
}

fn print_search_results(query: &str, results: &[RecipeRow]) {
    if results.is_empty() {
        println!("No recipes found");
        return;
    }

    println!("\nFound {} recipes for \"{}\":\n", results.len(), query);
    println!(
        "{:<8} {:<40} {:<15} {:>8}",
        "ID", "Name", "Cuisine", "Matched"
    );
    println!("{}", "-".repeat(74));

    for recipe in results {
        println!(
            "{:<8} {:<40} {:<15} {:>8}",
            recipe.id,
            truncate(&recipe.name, 38),
            truncate(&recipe.cuisine, 13),
            format!(
                "{}/{}",
                recipe.matched_ingredients,
                recipe.ingredients.len()
            )
        );
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

// Response types (matching API models)

#[derive(Debug, Deserialize)]
struct RecipeRow {
    id: i64,
    name: String,
    cuisine: String,
    ingredients: Vec<String>,
    #[serde(rename = "original_ingredients")]
    _original_ingredients: Vec<String>,
    matched_ingredients: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_requests_the_encoded_ingredient_path() {
        let mut server = mockito::Server::new_async().await;

        let body = r#"[{
            "id": 7,
            "name": "spicy chili",
            "cuisine": "mexican",
            "ingredients": ["chili pepper", "flour"],
            "original_ingredients": ["fresh chili peppers", "sifted flour"],
            "matched_ingredients": 2
        }]"#;

        let mock = server
            .mock("GET", "/api/from_ingredient/chili%20pepper%2Cflour")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        search(&server.url(), "chili pepper,flour").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn search_surfaces_the_server_error_message() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/api/from_ingredient/%2C")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "ingredient list contains an empty term"}"#)
            .create_async()
            .await;

        let err = search(&server.url(), ",").await.unwrap_err();
        assert!(err.to_string().contains("empty term"));
        mock.assert_async().await;
    }

    #[test]
    fn truncate_respects_character_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long recipe name", 10), "a very ...");
        assert_eq!(truncate("crème brûlée aux amandes", 10), "crème b...");
    }
}
