use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod registrations;

pub use registrations::{
    create_registration, delete_registration, export_registrations, list_registrations,
};

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "registration-api",
    };

    success(payload, "Health check successful").into_response()
}

pub async fn not_found(uri: Uri) -> Response {
    AppError::NotFound(format!("No route for '{}'", uri.path())).into_response()
}
