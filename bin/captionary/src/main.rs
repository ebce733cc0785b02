//! # Captionary Binary
//!
//! The entry point that assembles the application based on compile-time
//! features.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use cap_api::handlers::AppState;
use cap_core::traits::{Describer, ImageRepo};
use cap_pipeline::queries::ImageQueries;
use cap_pipeline::ImagePipeline;

// Feature-gated imports: compiled-to-order plugin selection
#[cfg(feature = "db-sqlite")]
use cap_db_sqlite::SqliteImageRepo;

#[cfg(feature = "describer-gemini")]
use cap_describer_gemini::{GeminiConfig, GeminiDescriber};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // All configuration is read once here and handed to constructors;
    // request handling never reads the environment.
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:captionary.db".into());
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into());

    // 1. Initialize the record store implementation
    #[cfg(feature = "db-sqlite")]
    let repo = SqliteImageRepo::new(&database_url)
        .await
        .expect("Failed to init SQLite");

    // 2. Initialize the describer implementation
    #[cfg(feature = "describer-gemini")]
    let describer = {
        let api_key = std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set");
        let mut config = GeminiConfig::new(api_key);
        if let Ok(endpoint) = std::env::var("GEMINI_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            config.model = model;
        }
        GeminiDescriber::new(config).expect("Failed to build describer client")
    };

    // 3. Wrap in AppState (dynamic dispatch keeps the wiring flexible)
    let repo: Arc<dyn ImageRepo> = Arc::new(repo);
    let describer: Arc<dyn Describer> = Arc::new(describer);

    let state = web::Data::new(AppState {
        pipeline: ImagePipeline::new(repo.clone(), describer),
        queries: ImageQueries::new(repo),
    });

    log::info!("🚀 Captionary starting on http://{bind_addr}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cap_api::middleware::cors_policy())
            .wrap(cap_api::middleware::standard_middleware())
            .configure(cap_api::configure_routes)
    })
    .bind(bind_addr.as_str())?
    .run()
    .await
}
