mod error;
mod routes;
mod state;

pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::types::ServerConfig;
use crate::error::{RelayError, Result};

/// Build the application router.
pub fn router(state: AppState, config: &ServerConfig) -> Result<Router> {
    let app = Router::new()
        .route("/api/chat", post(routes::chat_handler))
        .route("/health", get(routes::health_handler))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.allowed_origins)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let cors = CorsLayer::new().allow_methods([Method::GET, Method::POST]);

    if allowed_origins.is_empty() {
        return Ok(cors.allow_origin(Any).allow_headers(Any));
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| RelayError::Config(format!("Invalid CORS origin: {origin}")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(cors
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true))
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| RelayError::Config(format!("Invalid listen address: {e}")))?;
    let app = router(state, config)?;

    info!(%addr, "Binding HTTP server");
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| RelayError::Bind { addr, source })?;
    info!(%addr, "Server ready to accept connections");

    axum::serve(listener, app).await?;
    Ok(())
}
