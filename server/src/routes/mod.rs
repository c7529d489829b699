use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{
    create_registration, delete_registration, export_registrations, health_check,
    list_registrations, not_found,
};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/registrations",
            get(list_registrations).post(create_registration),
        )
        .route("/api/registrations/export", get(export_registrations))
        .route("/api/registrations/:id", delete(delete_registration))
        .fallback(not_found)
        .with_state(state)
        .layer(create_security_headers_layer(config.production))
        .layer(create_cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}
