mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use bindery_api::{AppStateInner, router};
use bindery_core::Engine;
use bindery_core::ids::RandomCodes;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bindery=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init the document store
    let db = bindery_db::Database::open(&PathBuf::from(&config.db_path))?;

    // Shared state
    let state = Arc::new(AppStateInner {
        db,
        codes: Box::new(RandomCodes),
        engine: Engine::default(),
    });

    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Bindery server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
