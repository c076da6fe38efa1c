use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::courier::AutomationGateway;
use super::domain::{Candidate, EnrollmentId, SequenceDefinition};
use super::library::{SequenceLibrary, EMAIL_TEMPLATES};
use super::repository::{EnrollmentRepository, RepositoryError};
use super::service::{EnrollmentError, EnrollmentService};

#[derive(Debug, Deserialize)]
pub struct EnrollmentRequest {
    pub candidate: Candidate,
    pub sequence: SequenceDefinition,
    pub start_date: NaiveDate,
}

/// Router builder exposing the outreach endpoints the dashboard consumes.
pub fn outreach_router<G, R>(service: Arc<EnrollmentService<G, R>>) -> Router
where
    G: AutomationGateway + 'static,
    R: EnrollmentRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/enrollments",
            post(enroll_handler::<G, R>).get(list_handler::<G, R>),
        )
        .route(
            "/api/v1/enrollments/:enrollment_id",
            get(get_handler::<G, R>),
        )
        .route(
            "/api/v1/enrollments/:enrollment_id/cancel",
            post(cancel_handler::<G, R>),
        )
        .route(
            "/api/v1/enrollments/:enrollment_id/refresh",
            post(refresh_handler::<G, R>),
        )
        .route("/api/v1/sequences/templates", get(templates_handler))
        .with_state(service)
}

pub(crate) async fn enroll_handler<G, R>(
    State(service): State<Arc<EnrollmentService<G, R>>>,
    axum::Json(request): axum::Json<EnrollmentRequest>,
) -> Response
where
    G: AutomationGateway + 'static,
    R: EnrollmentRepository + 'static,
{
    match service
        .enroll(&request.candidate, &request.sequence, request.start_date)
        .await
    {
        Ok(enrollment) => {
            (StatusCode::CREATED, axum::Json(enrollment.status_view())).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<G, R>(
    State(service): State<Arc<EnrollmentService<G, R>>>,
) -> Response
where
    G: AutomationGateway + 'static,
    R: EnrollmentRepository + 'static,
{
    match service.enrollments() {
        Ok(enrollments) => {
            let views: Vec<_> = enrollments
                .iter()
                .map(|enrollment| enrollment.status_view())
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_handler<G, R>(
    State(service): State<Arc<EnrollmentService<G, R>>>,
    Path(enrollment_id): Path<String>,
) -> Response
where
    G: AutomationGateway + 'static,
    R: EnrollmentRepository + 'static,
{
    match service.get(&EnrollmentId(enrollment_id)) {
        Ok(enrollment) => (StatusCode::OK, axum::Json(enrollment.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_handler<G, R>(
    State(service): State<Arc<EnrollmentService<G, R>>>,
    Path(enrollment_id): Path<String>,
) -> Response
where
    G: AutomationGateway + 'static,
    R: EnrollmentRepository + 'static,
{
    match service.cancel(&EnrollmentId(enrollment_id)).await {
        Ok(enrollment) => (StatusCode::OK, axum::Json(enrollment.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn refresh_handler<G, R>(
    State(service): State<Arc<EnrollmentService<G, R>>>,
    Path(enrollment_id): Path<String>,
) -> Response
where
    G: AutomationGateway + 'static,
    R: EnrollmentRepository + 'static,
{
    match service.refresh_status(&EnrollmentId(enrollment_id)).await {
        Ok(enrollment) => (StatusCode::OK, axum::Json(enrollment.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn templates_handler() -> Response {
    let library = SequenceLibrary::standard();
    let payload = json!({
        "templates": library.templates(),
        "email_templates": EMAIL_TEMPLATES,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

fn error_response(error: EnrollmentError) -> Response {
    let status = match &error {
        EnrollmentError::Validation(_) | EnrollmentError::StartDateInPast { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EnrollmentError::InvalidState { .. } => StatusCode::CONFLICT,
        EnrollmentError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        EnrollmentError::Transport(_) => StatusCode::BAD_GATEWAY,
        EnrollmentError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = match &error {
        EnrollmentError::Validation(validation) => json!({
            "error": error.to_string(),
            "issues": validation
                .issues()
                .iter()
                .map(|issue| issue.to_string())
                .collect::<Vec<_>>(),
        }),
        _ => json!({ "error": error.to_string() }),
    };

    (status, axum::Json(payload)).into_response()
}
