//! HTTP adapter over the library operations.
//!
//! Handlers only forward to the store, ledger and auth bridge and map their
//! errors; no consistency logic lives here.

pub mod admin;
pub mod auth;
pub mod events;
pub mod health;
pub mod session;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::logging::request_logger;
use crate::AppState;

/// The full adapter router.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .merge(health::router(state.clone()))
        .nest("/auth", auth::router(state.clone()))
        .merge(session::router(state.clone()))
        .nest("/admin", admin::router(state.clone()))
        .merge(events::router(state))
        .layer(middleware::from_fn(request_logger))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.trim() == "*" {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
