//! HTTP surface: router, shared state, bearer authentication and the serve loop.

use anyhow::{Context, Result};
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::youtube::SourceFactory;
use crate::TranscriptService;

pub mod errors;
pub mod handlers;

pub use errors::{classify, handle_transcript_error, ApiError, ErrorClass};

/// Name reported by the health endpoint
pub const SERVICE_NAME: &str = "youtube-transcription-api";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub config: Arc<Config>,
    pub service: TranscriptService,
}

impl AppStateInner {
    pub fn new(config: Arc<Config>, factory: Arc<dyn SourceFactory>) -> AppState {
        let service = TranscriptService::new(factory, config.proxy.clone(), &config.upstream);
        Arc::new(Self { config, service })
    }
}

pub fn create_router(state: AppState) -> Router {
    let transcripts = Router::new()
        .route("/transcript/segmented/{video_id}", get(handlers::segmented))
        .route("/transcript/unsegmented/{video_id}", get(handlers::unsegmented))
        .route("/transcript/available/{video_id}", get(handlers::available))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(transcripts)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Reject requests without the configured bearer token. Without a token everything passes.
async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    let Some(expected) = state.config.auth.api_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token);

    let rejection = match provided {
        None => Some(ApiError::unauthorized("Bearer token required")),
        Some(token) if token != expected => {
            tracing::warn!("Rejected request to {} with invalid token", request.uri().path());
            Some(ApiError::unauthorized("Invalid bearer token"))
        }
        Some(_) => None,
    };

    match rejection {
        Some(err) => Err(err),
        None => Ok(next.run(request).await),
    }
}

/// Token of an `Authorization` header value; the scheme name is case-insensitive
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}

/// Bind the listener and serve until Ctrl-C
pub async fn run(config: Arc<Config>, factory: Arc<dyn SourceFactory>) -> Result<()> {
    let addr = config.bind_addr();
    let state = AppStateInner::new(config.clone(), factory);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on http://{}", addr);
    if config.auth.api_token.is_none() {
        tracing::warn!("API_TOKEN not set; transcript endpoints are unauthenticated");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
