use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dto::attempt_dto::{AttemptListQuery, GameResultsRequest, SubmitAnswerRequest},
    error::Result,
    middleware::auth::CurrentUser,
    services::page_bounds,
    AppState,
};

#[axum::debug_handler]
pub async fn start_attempt(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let started = state.attempt_service.start_attempt(user.id, quiz_id).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

#[axum::debug_handler]
pub async fn list_attempts(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<AttemptListQuery>,
) -> Result<impl IntoResponse> {
    let window = page_bounds(query.page, query.per_page);
    let result = state
        .attempt_service
        .list_user_attempts(user.id, query.filter(), window)
        .await?;
    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn attempt_statistics(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    let stats = state.attempt_service.user_statistics(user.id).await?;
    Ok(Json(stats))
}

#[axum::debug_handler]
pub async fn get_attempt(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let details = state.attempt_service.attempt_details(user.id, id).await?;
    Ok(Json(details))
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, question_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse> {
    let recorded = state
        .attempt_service
        .record_answer(user.id, id, question_id, payload.answer)
        .await?;
    Ok(Json(recorded))
}

#[axum::debug_handler]
pub async fn submit_game_results(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GameResultsRequest>,
) -> Result<impl IntoResponse> {
    let attempt = state
        .attempt_service
        .submit_game_results(user.id, id, payload.results)
        .await?;
    Ok(Json(attempt))
}

#[axum::debug_handler]
pub async fn complete_attempt(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let summary = state.attempt_service.complete_attempt(user.id, id).await?;
    Ok(Json(json!({
        "attempt_id": id,
        "status": "completed",
        "summary": summary,
    })))
}

#[axum::debug_handler]
pub async fn abandon_attempt(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let attempt = state.attempt_service.abandon_attempt(user.id, id).await?;
    Ok(Json(attempt))
}
