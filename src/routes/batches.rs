use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        batch_dto::{CreateBatchQuizRequest, CreateBatchRequest},
        PageQuery,
    },
    error::Result,
    middleware::auth::CurrentUser,
    services::page_bounds,
    AppState,
};

#[axum::debug_handler]
pub async fn create_batch(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateBatchRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let batch = state
        .batch_service
        .create(payload.into_new_batch(Some(user.id)))
        .await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

#[axum::debug_handler]
pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let window = page_bounds(query.page, query.per_page);
    let result = state.batch_service.list(window).await?;
    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let overview = state.batch_service.overview(id).await?;
    Ok(Json(overview))
}

#[axum::debug_handler]
pub async fn add_user(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    state.batch_service.add_user(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn remove_user(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    state.batch_service.remove_user(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn add_question(
    State(state): State<AppState>,
    Path((id, question_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    state.batch_service.add_question(id, question_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn remove_question(
    State(state): State<AppState>,
    Path((id, question_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    state.batch_service.remove_question(id, question_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn create_batch_quiz(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateBatchQuizRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let quiz = state
        .batch_service
        .create_batch_quiz(id, payload.into_options(Some(user.id)))
        .await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}
