mod config;
mod db;
mod fuzzy;
mod ident;
mod models;
mod routes;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{AppConfig, AppState};
use routes::{documents_routes, featured_routes, journal_routes, papers_routes, search_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "journal_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    // Database setup
    let pool = db::init_db(&config.database_url).await?;
    tracing::info!("Database initialized");

    // Document store directories
    tokio::fs::create_dir_all(config.papers_dir()).await?;
    tokio::fs::create_dir_all(config.journals_dir()).await?;

    // CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let addr = config.bind_addr.clone();
    let state = AppState {
        pool,
        config: Arc::new(config),
    };

    // Build the app
    let app = Router::new()
        .route("/", get(welcome))
        .merge(papers_routes())
        .merge(search_routes())
        .merge(documents_routes())
        .merge(featured_routes())
        .merge(journal_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Run the server
    tracing::info!("Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn welcome() -> &'static str {
    "Welcome to the journal backend API"
}
