//! HTTP handlers for the learner-facing progression API.
//!
//! Responses use the `{"success": true, "data": ...}` envelope; failures are
//! rendered by [`LearnError`]. The acting learner comes from the `X-User-Id`
//! header.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::client::USER_HEADER;
use super::engine::LearnerContext;
use super::error::LearnError;
use super::events::{InteractionRequest, LearnerEvent};
use super::types::{QuizSubmission, SurveySubmission};
use crate::shared::state::AppState;

/// Learner identity taken from the `X-User-Id` header.
#[derive(Debug, Clone, Copy)]
pub struct LearnerId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for LearnerId
where
    S: Send + Sync,
{
    type Rejection = LearnError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_HEADER)
            .ok_or_else(|| LearnError::Unauthorized(format!("missing {} header", USER_HEADER)))?;
        let raw = value
            .to_str()
            .map_err(|_| LearnError::Unauthorized(format!("malformed {} header", USER_HEADER)))?;
        Uuid::parse_str(raw.trim())
            .map(LearnerId)
            .map_err(|_| LearnError::Unauthorized(format!("{} is not a valid id", USER_HEADER)))
    }
}

fn success<T: Serialize>(data: T) -> Response {
    Json(serde_json::json!({
        "success": true,
        "data": data
    }))
    .into_response()
}

/// Get course structure
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
) -> Result<Response, LearnError> {
    let course = state.engine.load_course(course_id).await?;
    Ok(success(course.as_ref()))
}

/// Drop the cached structure and reload it from the collaborator
pub async fn refresh_course(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
) -> Result<Response, LearnError> {
    state.engine.invalidate_course(course_id).await;
    let course = state.engine.load_course(course_id).await?;
    Ok(success(course.as_ref()))
}

/// Get derived course progress
pub async fn get_course_progress(
    State(state): State<Arc<AppState>>,
    LearnerId(user_id): LearnerId,
    Path(course_id): Path<Uuid>,
) -> Result<Response, LearnError> {
    let progress = state.engine.course_progress(user_id, course_id).await?;
    Ok(success(progress))
}

/// Hydrate progress from the collaborator
pub async fn sync_course_progress(
    State(state): State<Arc<AppState>>,
    LearnerId(user_id): LearnerId,
    Path(course_id): Path<Uuid>,
) -> Result<Response, LearnError> {
    let progress = state.engine.sync_progress(user_id, course_id).await?;
    Ok(success(progress))
}

pub async fn list_module_statuses(
    State(state): State<Arc<AppState>>,
    LearnerId(user_id): LearnerId,
    Path(course_id): Path<Uuid>,
) -> Result<Response, LearnError> {
    let statuses = state.engine.module_statuses(user_id, course_id).await?;
    Ok(success(statuses))
}

pub async fn get_module_completion(
    State(state): State<Arc<AppState>>,
    LearnerId(user_id): LearnerId,
    Path((course_id, module_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, LearnError> {
    let status = state
        .engine
        .module_status(user_id, course_id, module_id)
        .await?;
    Ok(success(status))
}

/// Re-check whether the module survey has been answered
pub async fn get_survey_status(
    State(state): State<Arc<AppState>>,
    LearnerId(user_id): LearnerId,
    Path((course_id, module_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, LearnError> {
    let satisfied = state
        .engine
        .refresh_survey_state(user_id, course_id, module_id)
        .await?;
    Ok(success(serde_json::json!({
        "module_id": module_id,
        "survey_satisfied": satisfied
    })))
}

pub async fn submit_survey(
    State(state): State<Arc<AppState>>,
    LearnerId(user_id): LearnerId,
    Path((course_id, module_id)): Path<(Uuid, Uuid)>,
    Json(submission): Json<SurveySubmission>,
) -> Result<Response, LearnError> {
    let ctx = LearnerContext::new(user_id);
    let cascade = state
        .engine
        .submit_survey_response(&ctx, course_id, module_id, submission)
        .await?;
    Ok(success(cascade))
}

/// Apply an interaction and wait for the outcome
pub async fn record_interaction(
    State(state): State<Arc<AppState>>,
    LearnerId(user_id): LearnerId,
    Path((course_id, lesson_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<InteractionRequest>,
) -> Result<Response, LearnError> {
    let ctx = LearnerContext::new(user_id);
    let outcome = state
        .engine
        .record_interaction(&ctx, course_id, lesson_id, req.signal.into())
        .await?;
    Ok(success(outcome))
}

/// Queue an interaction for the background consumer
pub async fn enqueue_interaction(
    State(state): State<Arc<AppState>>,
    LearnerId(user_id): LearnerId,
    Path((course_id, lesson_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<InteractionRequest>,
) -> Result<Response, LearnError> {
    state.events.publish(LearnerEvent {
        ctx: LearnerContext::new(user_id),
        course_id,
        lesson_id,
        signal: req.signal,
    })?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "success": true,
            "data": { "queued": true }
        })),
    )
        .into_response())
}

pub async fn get_lesson_completion(
    State(state): State<Arc<AppState>>,
    LearnerId(user_id): LearnerId,
    Path((_course_id, lesson_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, LearnError> {
    let is_completed = state.engine.is_completed(user_id, lesson_id).await;
    Ok(success(serde_json::json!({
        "lesson_id": lesson_id,
        "is_completed": is_completed
    })))
}

/// Submit quiz answers
pub async fn submit_quiz(
    State(state): State<Arc<AppState>>,
    LearnerId(user_id): LearnerId,
    Path((course_id, lesson_id)): Path<(Uuid, Uuid)>,
    Json(submission): Json<QuizSubmission>,
) -> Result<Response, LearnError> {
    let ctx = LearnerContext::new(user_id);
    let outcome = state
        .engine
        .submit_quiz(&ctx, course_id, lesson_id, &submission)
        .await?;
    Ok(success(outcome))
}

pub async fn issue_certificate(
    State(state): State<Arc<AppState>>,
    LearnerId(user_id): LearnerId,
    Path(course_id): Path<Uuid>,
) -> Result<Response, LearnError> {
    let certificate = state.engine.ensure_certificate(user_id, course_id).await?;
    Ok(success(certificate))
}

pub async fn download_certificate(
    State(state): State<Arc<AppState>>,
    LearnerId(user_id): LearnerId,
    Path(certificate_id): Path<Uuid>,
) -> Result<Response, LearnError> {
    let pdf = state
        .engine
        .download_certificate(user_id, certificate_id)
        .await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"certificate-{}.pdf\"", certificate_id),
            ),
        ],
        pdf,
    )
        .into_response())
}

/// Verify certificate
pub async fn verify_certificate(
    State(state): State<Arc<AppState>>,
    Path(number): Path<String>,
) -> Result<Response, LearnError> {
    let verification = state.engine.verify_certificate(&number).await?;
    Ok(success(verification))
}

/// Configure all Learn module routes
pub fn configure_learn_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Course routes
        .route("/api/learn/courses/:course_id", get(get_course))
        .route("/api/learn/courses/:course_id/refresh", post(refresh_course))
        .route("/api/learn/courses/:course_id/progress", get(get_course_progress))
        .route("/api/learn/courses/:course_id/sync", post(sync_course_progress))
        // Module routes
        .route("/api/learn/courses/:course_id/modules", get(list_module_statuses))
        .route(
            "/api/learn/courses/:course_id/modules/:module_id/completion",
            get(get_module_completion),
        )
        .route(
            "/api/learn/courses/:course_id/modules/:module_id/survey",
            get(get_survey_status).post(submit_survey),
        )
        // Lesson routes
        .route(
            "/api/learn/courses/:course_id/lessons/:lesson_id/interactions",
            post(record_interaction),
        )
        .route(
            "/api/learn/courses/:course_id/lessons/:lesson_id/events",
            post(enqueue_interaction),
        )
        .route(
            "/api/learn/courses/:course_id/lessons/:lesson_id/completion",
            get(get_lesson_completion),
        )
        .route(
            "/api/learn/courses/:course_id/lessons/:lesson_id/quiz",
            post(submit_quiz),
        )
        // Certificate routes
        .route(
            "/api/learn/courses/:course_id/certificate",
            post(issue_certificate),
        )
        .route(
            "/api/learn/certificates/:id/download",
            get(download_certificate),
        )
        .route(
            "/api/learn/certificates/:id/verify",
            get(verify_certificate),
        )
}
