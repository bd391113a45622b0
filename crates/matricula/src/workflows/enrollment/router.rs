use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{SectionId, StudentId};
use super::service::{EnrollmentError, EnrollmentService};
use super::store::{EnrollmentStore, PromotionNotifier, StoreError};

/// Router builder exposing the registration endpoints.
pub fn enrollment_router<S, N>(service: Arc<EnrollmentService<S, N>>) -> Router
where
    S: EnrollmentStore + 'static,
    N: PromotionNotifier + 'static,
{
    Router::new()
        .route("/api/v1/sections", post(open_section_handler::<S, N>))
        .route(
            "/api/v1/sections/:section_id/seats",
            put(resize_handler::<S, N>),
        )
        .route(
            "/api/v1/sections/:section_id/roster",
            get(roster_handler::<S, N>),
        )
        .route(
            "/api/v1/sections/:section_id/enrollments",
            post(enroll_handler::<S, N>),
        )
        .route(
            "/api/v1/sections/:section_id/enrollments/:student_id",
            get(status_handler::<S, N>).delete(cancel_handler::<S, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenSectionRequest {
    pub(crate) section_id: String,
    pub(crate) seats: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollRequest {
    pub(crate) student_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResizeRequest {
    pub(crate) seats: u32,
}

pub(crate) async fn open_section_handler<S, N>(
    State(service): State<Arc<EnrollmentService<S, N>>>,
    axum::Json(request): axum::Json<OpenSectionRequest>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: PromotionNotifier + 'static,
{
    match service.open_section(SectionId(request.section_id), request.seats) {
        Ok(section) => (StatusCode::CREATED, axum::Json(section)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn enroll_handler<S, N>(
    State(service): State<Arc<EnrollmentService<S, N>>>,
    Path(section_id): Path<String>,
    axum::Json(request): axum::Json<EnrollRequest>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: PromotionNotifier + 'static,
{
    match service.enroll(StudentId(request.student_id), SectionId(section_id)) {
        Ok(enrollment) => {
            (StatusCode::CREATED, axum::Json(enrollment.status_view())).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn cancel_handler<S, N>(
    State(service): State<Arc<EnrollmentService<S, N>>>,
    Path((section_id, student_id)): Path<(String, String)>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: PromotionNotifier + 'static,
{
    match service.cancel(&StudentId(student_id), &SectionId(section_id)) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn resize_handler<S, N>(
    State(service): State<Arc<EnrollmentService<S, N>>>,
    Path(section_id): Path<String>,
    axum::Json(request): axum::Json<ResizeRequest>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: PromotionNotifier + 'static,
{
    match service.resize_section(&SectionId(section_id), request.seats) {
        Ok(change) => (StatusCode::OK, axum::Json(change.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn roster_handler<S, N>(
    State(service): State<Arc<EnrollmentService<S, N>>>,
    Path(section_id): Path<String>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: PromotionNotifier + 'static,
{
    match service.roster(&SectionId(section_id)) {
        Ok(roster) => (StatusCode::OK, axum::Json(roster)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<S, N>(
    State(service): State<Arc<EnrollmentService<S, N>>>,
    Path((section_id, student_id)): Path<(String, String)>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: PromotionNotifier + 'static,
{
    match service.status(&StudentId(student_id), &SectionId(section_id)) {
        Ok(enrollment) => (StatusCode::OK, axum::Json(enrollment.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

/// Maps service errors onto HTTP statuses. Internal invariant violations are
/// logged with full context but surface to callers as a generic server
/// error.
fn error_response(error: EnrollmentError) -> Response {
    let status = match &error {
        EnrollmentError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EnrollmentError::DuplicateEnrollment { .. } | EnrollmentError::Store(StoreError::Conflict) => {
            StatusCode::CONFLICT
        }
        EnrollmentError::NotFound { .. } | EnrollmentError::UnknownSection(_) => {
            StatusCode::NOT_FOUND
        }
        EnrollmentError::CapacityViolation { .. } | EnrollmentError::Transition(_) => {
            tracing::error!(%error, "registration invariant violated");
            let payload = json!({ "error": "internal registration error" });
            return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response();
        }
        EnrollmentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
