use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::quiz_dto::{CreateQuizRequest, QuizListQuery},
    error::Result,
    middleware::auth::CurrentUser,
    services::page_bounds,
    AppState,
};

#[axum::debug_handler]
pub async fn create_quiz(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse> {
    user.ensure_admin()?;
    payload.validate()?;
    let quiz = state
        .quiz_service
        .create(payload.into_new_quiz(Some(user.id))?)
        .await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

#[axum::debug_handler]
pub async fn list_quizzes(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<QuizListQuery>,
) -> Result<impl IntoResponse> {
    let window = page_bounds(query.page, query.per_page);
    // Inactive quizzes are visible to admins only.
    let active_only = !(user.is_admin && query.include_inactive.unwrap_or(false));
    let result = state.quiz_service.list(active_only, window).await?;
    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let quiz = state.quiz_service.get(id).await?;
    Ok(Json(quiz))
}

#[axum::debug_handler]
pub async fn delete_quiz(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    user.ensure_admin()?;
    state.quiz_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
