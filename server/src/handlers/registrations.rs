use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::models::{Attendee, NewAttendee};
use crate::state::AppState;
use crate::store::codec;
use crate::utils::error::AppError;
use crate::utils::response::{created, csv_attachment, empty_success, success};

const EXPORT_HEADER: &str = "Name,Email,Phone,Consent,Registered At";

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

pub async fn create_registration(
    State(state): State<AppState>,
    payload: Result<Json<NewAttendee>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(submission) =
        payload.map_err(|rejection| AppError::ValidationError(rejection.body_text()))?;

    if let Some(field) = submission.missing_field() {
        return Err(AppError::ValidationError(format!("The {field} field is required")));
    }

    let attendee = state.store.append(submission).await?;
    tracing::info!(id = %attendee.id, "Registered attendee");

    Ok(created(attendee, "Registration successful").into_response())
}

pub async fn list_registrations(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, AppError> {
    let mut attendees = state.store.list_all().await?;
    if let Some(term) = params.q.as_deref() {
        attendees.retain(|attendee| attendee.matches(term));
    }

    let message = format!("{} registration(s)", attendees.len());
    Ok(success(attendees, message).into_response())
}

pub async fn export_registrations(State(state): State<AppState>) -> Result<Response, AppError> {
    let attendees = state.store.list_all().await?;
    let filename = format!(
        "{}-{}.csv",
        state.export_file_prefix,
        Utc::now().format("%Y-%m-%d")
    );

    tracing::info!(rows = attendees.len(), %filename, "Exporting registrations");
    Ok(csv_attachment(&filename, render_export(&attendees)))
}

pub async fn delete_registration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let removed = state.store.delete_by_id(&id).await?;

    let message = if removed {
        tracing::info!(%id, "Deleted registration");
        "Registration deleted"
    } else {
        tracing::debug!(%id, "Delete requested for unknown registration");
        "No registration with that id"
    };
    Ok(empty_success(message).into_response())
}

/// Export sheet: no ids, rows joined by newlines without a trailing one.
pub fn render_export(attendees: &[Attendee]) -> String {
    let rows = attendees
        .iter()
        .map(|a| {
            let consent = if a.consent { "true" } else { "false" };
            codec::encode_row([
                a.name.as_str(),
                a.email.as_str(),
                a.phone.as_str(),
                consent,
                a.registered_at.as_str(),
            ])
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("{EXPORT_HEADER}\n{rows}")
}
