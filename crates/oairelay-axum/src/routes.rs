//! Route definitions and router construction.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::bootstrap::{CorsConfig, ProxyContext};
use crate::handlers;
use crate::state::AppState;

/// Build CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::AllowAll => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsConfig::AllowOrigins(origins) => {
            let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// OpenAI-compatible routes, without the `/v1` prefix.
pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        // Responses API
        .route("/responses", post(handlers::responses::create))
        .route(
            "/responses/{id}",
            get(handlers::responses::retrieve).delete(handlers::responses::delete),
        )
        .route("/responses/{id}/cancel", post(handlers::responses::cancel))
        .route(
            "/responses/{id}/input_items",
            get(handlers::responses::input_items),
        )
        // Files API
        .route("/files", get(handlers::files::list))
        .route(
            "/files/{id}",
            get(handlers::files::retrieve).delete(handlers::files::delete),
        )
        // Videos API
        .route(
            "/videos",
            get(handlers::videos::list).post(handlers::videos::create),
        )
        .route(
            "/videos/{id}",
            get(handlers::videos::retrieve).delete(handlers::videos::delete),
        )
        .route("/videos/{id}/remix", post(handlers::videos::remix))
}

/// Create the application router.
pub fn create_router(ctx: ProxyContext, cors_config: &CorsConfig) -> Router {
    let state: AppState = Arc::new(ctx);
    let cors = build_cors_layer(cors_config);

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/v1", api_routes().with_state(state))
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
