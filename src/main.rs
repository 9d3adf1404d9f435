use clap::Parser;
use pantry::{
    api::{handlers::AppState, routes},
    cli::{Cli, Commands},
    config::Settings,
    db,
    ingest::sources::SourcePaths,
    Error, Result,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    // Silently ignore if file doesn't exist
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pantry=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::from_env()?;
    settings.validate()?;

    // Handle commands
    match cli.command {
        Commands::Serve { port, host } => {
            serve(settings, port, host).await?;
        }
        Commands::Ingest { data_dir } => {
            ingest(settings, data_dir).await?;
        }
        Commands::Search {
            ingredients,
            server,
        } => {
            pantry::cli::commands::search(&server, &ingredients).await?;
        }
    }

    Ok(())
}

async fn serve(mut settings: Settings, port: Option<u16>, host: Option<String>) -> Result<()> {
    // Override settings with CLI arguments
    if let Some(port) = port {
        settings.server.port = port;
    }
    if let Some(host) = host {
        settings.server.host = host;
    }

    info!("Starting Pantry server");
    info!("Database: {}", settings.database.url);
    info!("Server: {}:{}", settings.server.host, settings.server.port);

    // Initialize database with connection pooling configuration
    let pool = db::init_pool_with_config(&settings.database).await?;
    info!(
        "Database connection established (max_connections: {}, min_connections: {})",
        settings.database.max_connections, settings.database.min_connections
    );

    // Bring up the schema and trigram setup if this is a fresh database.
    // Serving before any ingest has run is fine, searches just come back
    // empty. The ranking query's % operator needs pg_trgm even when the
    // tables are empty.
    db::init_schema(&pool).await?;
    if let Err(e) = db::ensure_trigram_index(&pool).await {
        warn!("Failed to set up the trigram extension: {}", e);
        warn!("Continuing without it - searches will error until ingest runs");
    }

    // Create application state
    let state = AppState {
        pool,
        settings: settings.clone(),
    };

    // Create router with rate limiting
    let app = routes::create_router(state, &settings);

    // Start server
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    println!("\n========================================");
    println!("Pantry Server");
    println!("========================================");
    println!("Status: Running");
    println!("Address: http://{addr}");
    println!("Database: Connected");
    println!("\nAPI Endpoints:");
    println!("  GET  /api/from_ingredient/:ingredient");
    println!("  GET  /api/stats");
    println!("  GET  /health");
    println!("  GET  /ready");
    println!("\nPress Ctrl+C to stop");
    println!("========================================\n");

    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    info!("Shutting down...");
    Ok(())
}

async fn ingest(settings: Settings, data_dir: Option<PathBuf>) -> Result<()> {
    let data_dir = data_dir.unwrap_or(settings.ingest.data_dir);
    info!("Ingesting dataset from {}", data_dir.display());

    let pool = db::init_pool(&settings.database.url).await?;

    let paths = SourcePaths::from_dir(&data_dir);
    let report = pantry::ingest::run(&pool, &paths).await?;

    println!(
        "\x1b[32m\u{2713}\x1b[0m Ingest complete: {} recipes, {} ingredients, {} ingredient links",
        report.recipes, report.ingredients, report.links
    );

    Ok(())
}
