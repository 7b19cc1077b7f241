use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::question_dto::{
        CreateQuestionRequest, PreviewRequest, QuestionListQuery, UpdateQuestionRequest,
    },
    error::Result,
    middleware::auth::CurrentUser,
    services::{import_service::GeneratedContent, page_bounds},
    AppState,
};

const DEFAULT_PREVIEW_SIZE: usize = 5;

#[axum::debug_handler]
pub async fn create_question(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let question = state
        .question_bank
        .create(payload.into_new_question(Some(user.id)))
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

#[axum::debug_handler]
pub async fn list_questions(
    State(state): State<AppState>,
    Query(query): Query<QuestionListQuery>,
) -> Result<impl IntoResponse> {
    let filter = query.filter()?;
    let window = page_bounds(query.page, query.per_page);
    let result = state.question_bank.list(filter, window).await?;
    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let question = state.question_bank.get(id).await?;
    Ok(Json(question))
}

#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let question = state.question_bank.update(id, payload.into()).await?;
    Ok(Json(question))
}

#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.question_bank.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn criteria_stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stats = state.selector.criteria_stats().await?;
    Ok(Json(stats))
}

#[axum::debug_handler]
pub async fn preview_selection(
    State(state): State<AppState>,
    Json(payload): Json<PreviewRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state.selector.check_count(payload.criteria.count)?;
    let preview = state
        .selector
        .preview(
            &payload.criteria,
            payload.limit.unwrap_or(DEFAULT_PREVIEW_SIZE),
        )
        .await?;
    Ok(Json(preview))
}

#[axum::debug_handler]
pub async fn import_questions(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(content): Json<GeneratedContent>,
) -> Result<impl IntoResponse> {
    let report = state.import_service.import(content, Some(user.id)).await?;
    Ok((StatusCode::CREATED, Json(report)))
}
