pub mod api;
pub mod app_state;
pub mod claim;
pub mod config;
pub mod error;
pub mod range;
pub mod resource;
pub mod storage;
pub mod streamer;

use axum::Router;
use axum::extract::Extension;
use axum::http::{HeaderValue, Method, header};
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

//
// Re-export
//
pub use api::{health, log_request_errors, serve_preview, serve_thumbnail, serve_video};
pub use app_state::AppState;
pub use claim::{
    AuthorizationBinder, Caller, ClaimAuthority, ClaimError, ClaimManager, Credentials,
    CredentialVerifier, ResourceClaims, SessionClaims,
};
pub use config::Config;
pub use error::{ErrorResponse, StreamError, StreamResult};
pub use range::{ParsedRange, Resolution, ResolvedRange, parse_range_header, resolve_range};
pub use resource::{ResourceKind, ResourcePath};
pub use storage::{
    ByteStream, ObjectStore, StorageBackend, StorageConfig, StorageError, StorageManager,
};
pub use streamer::{StreamRequest, Streamer};

/// Media routes plus health check
pub fn app(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/video/{*path}", get(serve_video))
        .route("/thumbnail/{*path}", get(serve_thumbnail))
        .route("/preview/{*path}", get(serve_preview))
        .route("/health", get(health))
        .layer(axum::middleware::from_fn(api::log_request_errors))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(Extension(state))
}

/// Any origin when `allowed_origins` is empty; otherwise only the listed
/// origins, with credentials so the session cookie is sent.
pub fn cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    if allowed_origins.is_empty() {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::HEAD])
        .allow_headers([header::RANGE, header::AUTHORIZATION])
        .expose_headers([
            header::CONTENT_RANGE,
            header::CONTENT_LENGTH,
            header::ACCEPT_RANGES,
        ])
        .allow_credentials(true))
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let cors = cors_layer(&config.allowed_origins)?;
    let app = app(state, cors);

    let addr = format!("0.0.0.0:{}", config.listen_on_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(
        %addr,
        max_chunk_size = config.max_chunk_size(),
        backend = %config.storage_backend,
        "Media streamer listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
