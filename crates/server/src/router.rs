//! HTTP router construction.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api;
use crate::state::AppState;

/// Build the application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);
    Router::new()
        .route("/health", get(api::health))
        .route("/targets", post(api::register_target))
        .route("/targets/{id}/check", post(api::manual_check))
        .route("/targets/{id}/checks", get(api::target_checks))
        .route("/schedules", post(api::upsert_schedule))
        .route("/schedules/run", post(api::run_schedules))
        .route("/owners/{id}/schedules", get(api::owner_schedules))
        .route("/owners/{id}/notifications", get(api::owner_notifications))
        .layer(cors)
        .with_state(state)
}

/// CORS layer for the configured origin; `"*"` allows any origin.
fn cors_layer(origin: &str) -> CorsLayer {
    match allowed_origin(origin) {
        Some(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    }
}

/// Parse the configured origin. `None` means allow any: either the
/// wildcard was configured or the value is not a valid header value.
fn allowed_origin(origin: &str) -> Option<HeaderValue> {
    if origin == "*" {
        return None;
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(origin, error = %e, "invalid CORS_ORIGIN, allowing any origin");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_origin_allows_any() {
        assert!(allowed_origin("*").is_none());
    }

    #[test]
    fn configured_origin_is_applied() {
        let value = allowed_origin("https://app.example.com").unwrap();
        assert_eq!(value, HeaderValue::from_static("https://app.example.com"));
    }

    #[test]
    fn unparsable_origin_falls_back_to_any() {
        assert!(allowed_origin("https://bad\norigin").is_none());
    }
}
