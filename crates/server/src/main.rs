use agora_server::{config::Config, db, routes, AppState};
use agora_shared::constants::APP_NAME;
use axum::http::{HeaderName, HeaderValue, Method};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();

    if config.cipher_secret.is_empty() {
        tracing::warn!("CIPHER_SECRET is not set; message bodies are encoded with an empty key");
    }

    // Initialize database
    let pool = db::init_pool(&config.database_path, config.db_max_connections)
        .await
        .expect("Failed to initialize database");

    let state = Arc::new(AppState::new(pool, config.clone()));

    let origin = match config
        .cors_origin
        .as_deref()
        .and_then(|o| HeaderValue::from_str(o).ok())
    {
        Some(origin) => AllowOrigin::exact(origin),
        None => AllowOrigin::mirror_request(),
    };

    // Build router
    let app = routes::build_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    HeaderName::from_static("content-type"),
                    HeaderName::from_static("cookie"),
                    HeaderName::from_static("authorization"),
                ])
                .allow_credentials(true),
        )
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");

    tracing::info!("{} server running on {}", APP_NAME, addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
